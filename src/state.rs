use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::auth::repo::{AdminDirectory, FileAdminDirectory, PgAdminDirectory};
use crate::auth::sessions::SessionService;
use crate::config::{AppConfig, StorageBackend};
use crate::records::{file_repo::FileRecordStore, pg_repo::PgRecordStore, repo::RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub admins: Arc<dyn AdminDirectory>,
    pub sessions: Arc<SessionService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let persistence = config.persistence();

        let (records, admins): (Arc<dyn RecordStore>, Arc<dyn AdminDirectory>) =
            match &config.storage {
                StorageBackend::File {
                    data_file,
                    admin_file,
                } => {
                    let records = FileRecordStore::open(data_file, persistence).await?;
                    info!(path = %records.path().display(), ?persistence, "file record store ready");
                    let admins = FileAdminDirectory::open(admin_file, persistence).await?;
                    (Arc::new(records), Arc::new(admins))
                }
                StorageBackend::Postgres { database_url } => {
                    if config.ephemeral_storage {
                        warn!("EPHEMERAL_STORAGE has no effect with the postgres backend");
                    }
                    let db = connect_postgres(database_url).await?;
                    (
                        Arc::new(PgRecordStore::new(db.clone())),
                        Arc::new(PgAdminDirectory::new(db)),
                    )
                }
            };

        let sessions = Arc::new(SessionService::in_memory(config.session_ttl()?));

        Ok(Self::from_parts(records, admins, sessions, Arc::new(config)))
    }

    pub fn from_parts(
        records: Arc<dyn RecordStore>,
        admins: Arc<dyn AdminDirectory>,
        sessions: Arc<SessionService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            records,
            admins,
            sessions,
            config,
        }
    }
}

async fn connect_postgres(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database connected and migrated");
    Ok(db)
}
