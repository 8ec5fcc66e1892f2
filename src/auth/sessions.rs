use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

const TOKEN_LEN: usize = 32;

/// The authenticated admin a session token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "userId")]
    pub id: i64,
    pub username: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub login_time: OffsetDateTime,
}

impl Identity {
    /// Fixed identity injected in mock-auth mode.
    pub fn mock() -> Self {
        Self {
            id: 1,
            username: "admin".into(),
            role: "administrator".into(),
            login_time: OffsetDateTime::now_utc(),
        }
    }
}

/// Key/value storage for sessions. Implementations must treat entries older
/// than their TTL as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, token: &str, identity: Identity, ttl: Duration) -> anyhow::Result<()>;
    async fn get(&self, token: &str) -> anyhow::Result<Option<Identity>>;
    async fn delete(&self, token: &str) -> anyhow::Result<bool>;
    /// Drops expired entries, returning how many went away.
    async fn purge_expired(&self) -> anyhow::Result<usize> {
        Ok(0)
    }
}

struct Entry {
    identity: Identity,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local session store. Sessions do not survive a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, token: &str, identity: Identity, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Instant::now() + ttl;
        self.entries.write().await.insert(
            token.to_string(),
            Entry {
                identity,
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> anyhow::Result<Option<Identity>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(token) {
                None => return Ok(None),
                Some(e) if e.is_live(now) => return Ok(Some(e.identity.clone())),
                Some(_) => {}
            }
        }
        // expired: evict under the write lock unless it was refreshed meanwhile
        let mut entries = self.entries.write().await;
        if entries.get(token).is_some_and(|e| !e.is_live(now)) {
            entries.remove(token);
            debug!("session expired");
        }
        Ok(None)
    }

    async fn delete(&self, token: &str) -> anyhow::Result<bool> {
        Ok(self.entries.write().await.remove(token).is_some())
    }

    async fn purge_expired(&self) -> anyhow::Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }
}

/// Issues, resolves and revokes session tokens on top of a [`SessionStore`].
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemorySessionStore::new()), ttl)
    }

    pub async fn create(&self, identity: Identity) -> anyhow::Result<String> {
        let token = generate_token();
        self.store.set(&token, identity, self.ttl).await?;
        Ok(token)
    }

    pub async fn lookup(&self, token: &str) -> anyhow::Result<Option<Identity>> {
        self.store.get(token).await
    }

    pub async fn revoke(&self, token: &str) -> anyhow::Result<bool> {
        self.store.delete(token).await
    }

    pub async fn purge_expired(&self) -> anyhow::Result<usize> {
        self.store.purge_expired().await
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Identity {
        Identity {
            id: 1,
            username: name.into(),
            role: "administrator".into(),
            login_time: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn create_lookup_revoke() {
        let sessions = SessionService::in_memory(Duration::from_secs(60));
        let token = sessions.create(identity("admin")).await.unwrap();

        let found = sessions.lookup(&token).await.unwrap().unwrap();
        assert_eq!(found.username, "admin");

        assert!(sessions.revoke(&token).await.unwrap());
        assert!(sessions.lookup(&token).await.unwrap().is_none());
        assert!(!sessions.revoke(&token).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_token_is_absent() {
        let sessions = SessionService::in_memory(Duration::from_secs(60));
        assert!(sessions.lookup("nope").await.unwrap().is_none());
    }

    #[test]
    fn identity_serializes_user_id() {
        let json = serde_json::to_value(identity("admin")).unwrap();
        assert_eq!(json["userId"], 1);
        assert!(json.get("id").is_none());
        assert!(json["loginTime"].is_string());
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .set("stale", identity("a"), Duration::ZERO)
            .await
            .unwrap();
        store
            .set("fresh", identity("b"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.get("stale").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        store
            .set("stale2", identity("c"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("fresh").await.unwrap().is_some());
    }
}
