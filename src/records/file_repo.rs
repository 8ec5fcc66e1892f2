use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::repo::{Persistence, RecordStore};
use super::repo_types::{UserFields, UserRecord};

/// On-disk layout: `{ users, nextId, lastUpdated }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataFile {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default = "first_id")]
    next_id: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_updated: Option<OffsetDateTime>,
}

fn first_id() -> i64 {
    1
}

impl Default for DataFile {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            next_id: first_id(),
            last_updated: None,
        }
    }
}

/// JSON-file record store. The whole document is held in memory and rewritten
/// after every mutation; in ephemeral mode the rewrite is skipped.
pub struct FileRecordStore {
    path: PathBuf,
    persistence: Persistence,
    data: Mutex<DataFile>,
}

impl FileRecordStore {
    pub async fn open(path: impl Into<PathBuf>, persistence: Persistence) -> anyhow::Result<Self> {
        let path = path.into();
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))?;

        let data = if exists {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            let mut data: DataFile = serde_json::from_str(&raw)
                .with_context(|| format!("parse {}", path.display()))?;
            // never hand out an id that is already taken
            let max_id = data.users.iter().map(|u| u.id).max().unwrap_or(0);
            data.next_id = data.next_id.max(max_id + 1);
            info!(path = %path.display(), users = data.users.len(), "loaded user records");
            data
        } else {
            DataFile::default()
        };

        let store = Self {
            path,
            persistence,
            data: Mutex::new(data),
        };
        if !exists {
            let mut data = store.data.lock().await;
            store.persist(&mut data).await?;
            info!(path = %store.path.display(), "created empty user record file");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &mut DataFile) -> anyhow::Result<()> {
        data.last_updated = Some(OffsetDateTime::now_utc());
        if self.persistence == Persistence::Ephemeral {
            debug!(path = %self.path.display(), "ephemeral storage, skipping write");
            return Ok(());
        }
        write_atomic(&self.path, &*data).await
    }
}

pub(crate) async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(value).context("serialize json document")?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn list(&self) -> anyhow::Result<Vec<UserRecord>> {
        let mut users = self.data.lock().await.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<UserRecord>> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, fields: UserFields) -> anyhow::Result<UserRecord> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let record = UserRecord::new(next.next_id, fields, OffsetDateTime::now_utc());
        next.next_id += 1;
        next.users.push(record.clone());
        self.persist(&mut next).await?;
        *data = next;
        Ok(record)
    }

    async fn update(&self, id: i64, fields: UserFields) -> anyhow::Result<Option<UserRecord>> {
        let mut data = self.data.lock().await;
        let Some(idx) = data.users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        let mut next = data.clone();
        next.users[idx].apply(fields, OffsetDateTime::now_utc());
        let record = next.users[idx].clone();
        self.persist(&mut next).await?;
        *data = next;
        Ok(Some(record))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut data = self.data.lock().await;
        let Some(idx) = data.users.iter().position(|u| u.id == id) else {
            return Ok(false);
        };
        let mut next = data.clone();
        next.users.remove(idx);
        self.persist(&mut next).await?;
        *data = next;
        Ok(true)
    }

    fn persistence(&self) -> Persistence {
        self.persistence
    }
}
