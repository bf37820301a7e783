use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub user_id: i32,
    pub handle: String,
    pub name: Option<String>,
    pub is_deactivated: bool,
}

impl User {
    /// Display name preferred for message copy; falls back to the handle.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.is_empty() => n,
            _ => &self.handle,
        }
    }
}
