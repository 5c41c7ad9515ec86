use crate::config::Config;
use crate::utils::blacklist::TokenBlacklist;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub blacklist: TokenBlacklist,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for TokenBlacklist {
    fn from_ref(state: &AppState) -> Self {
        state.blacklist.clone()
    }
}
