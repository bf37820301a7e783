pub mod cursors;
pub mod dm;
pub mod notifications;
pub mod playlists;
pub mod settings;
pub mod tracks;
pub mod users;

pub use cursors::CursorRepository;
pub use dm::DmRepository;
pub use notifications::NotificationRepository;
pub use playlists::PlaylistRepository;
pub use settings::SettingsRepository;
pub use tracks::TrackRepository;
pub use users::UserRepository;
