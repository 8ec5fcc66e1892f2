use async_trait::async_trait;

use super::repo_types::{UserFields, UserRecord};

/// Whether writes accepted by a store survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Durable,
    /// Changes are held in memory only.
    Ephemeral,
}

/// Storage contract shared by the file and database backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records, ordered by id.
    async fn list(&self) -> anyhow::Result<Vec<UserRecord>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<UserRecord>>;
    /// Assigns a fresh id and both timestamps.
    async fn create(&self, fields: UserFields) -> anyhow::Result<UserRecord>;
    /// `None` when no record has this id.
    async fn update(&self, id: i64, fields: UserFields) -> anyhow::Result<Option<UserRecord>>;
    /// `false` when no record has this id.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    fn persistence(&self) -> Persistence;
}
