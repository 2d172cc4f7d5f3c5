use sqlx::SqlitePool;
use std::sync::Arc;

use crate::guard::AdminGuard;
use crate::models::invite::InvitePolicy;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub notifier: Notifier,
    pub invite_policy: InvitePolicy,
    pub admin_guard: AdminGuard,
    pub invite_base_url: Arc<str>,
}

impl AppState {
    pub fn invite_link(&self, code: &str) -> String {
        format!("{}/{code}", self.invite_base_url)
    }
}
