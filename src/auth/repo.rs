use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::repo_types::{AdminRecord, NewAdmin};
use crate::records::{file_repo::write_atomic, repo::Persistence};

/// Credentials of the operators allowed to sign in.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find an admin by exact username.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<AdminRecord>>;
    /// Stamp a successful sign-in.
    async fn record_login(&self, id: i64, at: OffsetDateTime) -> anyhow::Result<()>;
    /// Drop every admin and insert `admins` in order.
    async fn replace_all(&self, admins: Vec<NewAdmin>) -> anyhow::Result<Vec<AdminRecord>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AdminFile {
    #[serde(default)]
    admins: Vec<AdminRecord>,
}

/// `{ "admins": [...] }` JSON file, read once at startup.
pub struct FileAdminDirectory {
    path: PathBuf,
    persistence: Persistence,
    data: Mutex<AdminFile>,
}

impl FileAdminDirectory {
    pub async fn open(path: impl Into<PathBuf>, persistence: Persistence) -> anyhow::Result<Self> {
        let path = path.into();
        let data = if tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))?
        {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            let data: AdminFile = serde_json::from_str(&raw)
                .with_context(|| format!("parse {}", path.display()))?;
            info!(path = %path.display(), admins = data.admins.len(), "loaded admin directory");
            let unhashed = data.admins.iter().filter(|a| !a.has_password_hash()).count();
            if unhashed > 0 {
                warn!(
                    path = %path.display(),
                    unhashed,
                    "admins without a password hash cannot sign in; run seed-admins"
                );
            }
            data
        } else {
            warn!(path = %path.display(), "admin file missing; nobody can sign in until admins are seeded");
            AdminFile::default()
        };
        Ok(Self {
            path,
            persistence,
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &AdminFile) -> anyhow::Result<()> {
        if self.persistence == Persistence::Ephemeral {
            debug!(path = %self.path.display(), "ephemeral storage, skipping write");
            return Ok(());
        }
        write_atomic(&self.path, data).await
    }
}

#[async_trait]
impl AdminDirectory for FileAdminDirectory {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<AdminRecord>> {
        let data = self.data.lock().await;
        Ok(data.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn record_login(&self, id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        let mut data = self.data.lock().await;
        let Some(admin) = data.admins.iter_mut().find(|a| a.id == id) else {
            anyhow::bail!("admin {id} not found");
        };
        admin.last_login = Some(at);
        self.persist(&data).await
    }

    async fn replace_all(&self, admins: Vec<NewAdmin>) -> anyhow::Result<Vec<AdminRecord>> {
        let next = AdminFile {
            admins: admins
                .into_iter()
                .zip(1..)
                .map(|(a, id)| AdminRecord {
                    id,
                    username: a.username,
                    password_hash: a.password_hash,
                    role: a.role,
                    last_login: None,
                })
                .collect(),
        };
        let mut data = self.data.lock().await;
        self.persist(&next).await?;
        *data = next;
        Ok(data.admins.clone())
    }
}

/// Admin directory backed by the `admins` table.
#[derive(Clone)]
pub struct PgAdminDirectory {
    db: PgPool,
}

impl PgAdminDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminDirectory for PgAdminDirectory {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<AdminRecord>> {
        let admin = sqlx::query_as::<_, AdminRecord>(
            r#"
            SELECT id, username, password_hash, role, last_login
            FROM admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find admin by username")?;
        Ok(admin)
    }

    async fn record_login(&self, id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query("UPDATE admins SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await
            .context("update admin last_login")?;
        Ok(())
    }

    async fn replace_all(&self, admins: Vec<NewAdmin>) -> anyhow::Result<Vec<AdminRecord>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("DELETE FROM admins")
            .execute(&mut *tx)
            .await
            .context("clear admins")?;
        let mut created = Vec::with_capacity(admins.len());
        for a in admins {
            let row = sqlx::query_as::<_, AdminRecord>(
                r#"
                INSERT INTO admins (username, password_hash, role)
                VALUES ($1, $2, $3)
                RETURNING id, username, password_hash, role, last_login
                "#,
            )
            .bind(a.username)
            .bind(a.password_hash)
            .bind(a.role)
            .fetch_one(&mut *tx)
            .await
            .context("insert admin")?;
            created.push(row);
        }
        tx.commit().await.context("commit tx")?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn new_admin(name: &str) -> NewAdmin {
        NewAdmin {
            username: name.into(),
            password_hash: format!("hash-of-{name}"),
            role: "manager".into(),
        }
    }

    #[tokio::test]
    async fn missing_file_means_no_admins() {
        let dir = tempfile::tempdir().unwrap();
        let admins = FileAdminDirectory::open(dir.path().join("admin.json"), Persistence::Durable)
            .await
            .unwrap();
        assert!(admins.find_by_username("admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_admins_are_persisted_and_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");
        let admins = FileAdminDirectory::open(&path, Persistence::Durable)
            .await
            .unwrap();
        let created = admins
            .replace_all(vec![new_admin("admin"), new_admin("harsh")])
            .await
            .unwrap();
        assert_eq!(created.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);

        let at = datetime!(2024-03-01 12:00 UTC);
        admins.record_login(2, at).await.unwrap();

        let reopened = FileAdminDirectory::open(&path, Persistence::Durable)
            .await
            .unwrap();
        let harsh = reopened.find_by_username("harsh").await.unwrap().unwrap();
        assert_eq!(harsh.last_login, Some(at));
        assert!(reopened.find_by_username("Harsh").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn legacy_plaintext_file_loads_and_can_be_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");
        std::fs::write(
            &path,
            r#"{"admins":[{"id":1,"username":"admin","password":"admin123","role":"administrator"}]}"#,
        )
        .unwrap();

        let admins = FileAdminDirectory::open(&path, Persistence::Durable)
            .await
            .unwrap();
        let legacy = admins.find_by_username("admin").await.unwrap().unwrap();
        assert!(!legacy.has_password_hash());

        admins.replace_all(vec![new_admin("admin")]).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("admin123"));
        let reopened = FileAdminDirectory::open(&path, Persistence::Durable)
            .await
            .unwrap();
        let admin = reopened.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.password_hash, "hash-of-admin");
    }

    #[tokio::test]
    async fn record_login_for_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let admins = FileAdminDirectory::open(dir.path().join("admin.json"), Persistence::Durable)
            .await
            .unwrap();
        assert!(admins
            .record_login(9, OffsetDateTime::now_utc())
            .await
            .is_err());
    }
}
