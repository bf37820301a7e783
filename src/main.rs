use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod listener;
mod notifications;
mod routes;
mod services;
mod store;
#[cfg(test)]
mod testing;

use config::Config;
use listener::NotificationListener;
use notifications::DispatchContext;
use services::dm_task::DmNotificationTask;
use services::email::EmailAggregationJob;
use services::flags::{HttpRemoteFlags, RemoteFlags, StaticFlags};
use services::init;
use services::mailer::HttpEmailRelay;
use services::processor::BatchProcessor;
use services::push::HttpPushRelay;
use store::{PgCursorStore, PgDiscoveryStore, PgIdentityStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notification_fanout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting notification fan-out service");

    // Store connections
    let discovery_pool = init::init_pool(
        &config.database.discovery_url,
        config.database.max_connections,
    )
    .await?;
    let identity_pool = init::init_pool(
        &config.database.identity_url,
        config.database.max_connections,
    )
    .await?;

    // Change listener + insert trigger on the notification table
    let notification_listener = Arc::new(NotificationListener::new(
        discovery_pool.clone(),
        config.listener.channel.clone(),
    ));
    notification_listener.install_trigger().await?;

    // Collaborator wiring
    let flags: Arc<dyn RemoteFlags> = match HttpRemoteFlags::from_config(&config.remote_config) {
        Some(remote) => Arc::new(remote),
        None => {
            tracing::info!("No remote config service configured; all notification kinds enabled");
            Arc::new(StaticFlags)
        }
    };
    let ctx = DispatchContext {
        discovery: Arc::new(PgDiscoveryStore::new(discovery_pool.clone())),
        identity: Arc::new(PgIdentityStore::new(identity_pool.clone())),
        push: Arc::new(HttpPushRelay::new(&config.push)),
        email: Arc::new(HttpEmailRelay::new(&config.email)),
        flags,
    };
    let cursors = Arc::new(PgCursorStore::new(identity_pool.clone()));

    // Pipeline workers
    let processor = BatchProcessor::new(
        notification_listener.pending(),
        ctx.clone(),
        Duration::from_millis(config.listener.poll_interval_ms),
    );
    let dm_task = DmNotificationTask::new(
        ctx.clone(),
        cursors,
        Duration::from_millis(config.dm.poll_interval_ms),
        Duration::from_millis(config.dm.notification_delay_ms),
    );
    let email_job = Arc::new(EmailAggregationJob::new(ctx.clone(), config.digest.clone()));

    // Shutdown notifier for background workers; fatal channel for conditions
    // that must take the process down (listener connection loss).
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    let (fatal_tx, mut fatal_rx) = tokio::sync::mpsc::channel::<String>(1);

    let bg_handles = init::spawn_background_workers(
        notification_listener,
        processor,
        dm_task,
        email_job,
        shutdown_tx.clone(),
        fatal_tx,
    );

    // Health check router
    let app = Router::new()
        .route("/health_check", get(routes::health::health_check))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(tcp_listener, app);

    let shutdown_tx_clone = shutdown_tx.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to bind SIGTERM");
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to bind Ctrl+C");
        }

        tracing::info!("Shutdown signal received, notifying background workers");
        let _ = shutdown_tx_clone.send(());
    };

    let mut fatal: Option<String> = None;
    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server stopped accepting connections");
        }
        reason = fatal_rx.recv() => {
            if let Some(reason) = reason {
                tracing::error!("Fatal worker failure: {}", reason);
                fatal = Some(reason);
            }
            let _ = shutdown_tx.send(());
        }
    }

    // Give background workers some time to finish the in-flight batch.
    let wait = init::shutdown_wait();
    tracing::info!("Waiting up to {}s for background workers to exit", wait.as_secs());
    let bg_wait = async {
        for handle in bg_handles {
            let _ = handle.await;
        }
    };
    let _ = tokio::time::timeout(wait, bg_wait).await;

    if let Some(reason) = fatal {
        anyhow::bail!("{}", reason);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
