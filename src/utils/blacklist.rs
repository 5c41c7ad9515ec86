// src/utils/blacklist.rs

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process revocation list for tokens invalidated before their natural
/// expiry (logout).
///
/// Each entry carries the token's own expiry timestamp, so the map stays
/// bounded: expired entries are pruned on every write and ignored on read.
/// This only covers a single server instance; a multi-instance deployment
/// needs a shared expiring store instead (see DESIGN.md).
#[derive(Clone, Default)]
pub struct TokenBlacklist {
    inner: Arc<RwLock<HashMap<String, i64>>>,
}

impl TokenBlacklist {
    /// Revokes a token until `expires_at` (Unix seconds).
    pub async fn revoke(&self, token: &str, expires_at: i64) {
        let now = Utc::now().timestamp();
        let mut map = self.inner.write().await;
        map.retain(|_, exp| *exp > now);
        map.insert(token.to_owned(), expires_at);
    }

    pub async fn contains(&self, token: &str) -> bool {
        let now = Utc::now().timestamp();
        self.inner
            .read()
            .await
            .get(token)
            .is_some_and(|exp| *exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_token_is_blocked_until_expiry() {
        let blacklist = TokenBlacklist::default();
        let exp = Utc::now().timestamp() + 60;

        assert!(!blacklist.contains("tok").await);
        blacklist.revoke("tok", exp).await;
        assert!(blacklist.contains("tok").await);
        assert!(!blacklist.contains("other").await);
    }

    #[tokio::test]
    async fn expired_entries_are_ignored_and_pruned() {
        let blacklist = TokenBlacklist::default();
        let past = Utc::now().timestamp() - 1;

        blacklist.revoke("stale", past).await;
        assert!(!blacklist.contains("stale").await);

        // A later revocation sweeps the stale entry out entirely.
        blacklist.revoke("fresh", Utc::now().timestamp() + 60).await;
        assert_eq!(blacklist.inner.read().await.len(), 1);
    }
}
