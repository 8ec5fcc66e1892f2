use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context};

use crate::records::repo::Persistence;

/// One year.
const MAX_SESSION_TTL_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    File {
        data_file: PathBuf,
        admin_file: PathBuf,
    },
    Postgres {
        database_url: String,
    },
}

/// How protected routes resolve the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Tokens are looked up in the session store.
    Session,
    /// Any present token resolves to a fixed administrator. Test deployments only.
    Mock,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// Set when the process runs on a read-only filesystem.
    pub ephemeral_storage: bool,
    pub auth_mode: AuthMode,
    pub session_ttl_minutes: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT").or_else(|| lookup("PORT")) {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid port {v:?}"))?,
            None => 3001,
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("file") {
            "file" => StorageBackend::File {
                data_file: lookup("DATA_FILE")
                    .unwrap_or_else(|| "data.json".into())
                    .into(),
                admin_file: lookup("ADMIN_FILE")
                    .unwrap_or_else(|| "admin.json".into())
                    .into(),
            },
            "postgres" => StorageBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .context("DATABASE_URL is required when STORAGE_BACKEND=postgres")?,
            },
            other => bail!("unknown STORAGE_BACKEND {other:?}, expected \"file\" or \"postgres\""),
        };

        let session_ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|m| (1..=MAX_SESSION_TTL_MINUTES).contains(m))
                .with_context(|| {
                    format!("invalid SESSION_TTL_MINUTES {v:?}, expected 1..={MAX_SESSION_TTL_MINUTES}")
                })?,
            None => 8 * 60,
        };

        let auth_mode = match lookup("AUTH_MODE").as_deref().unwrap_or("session") {
            "session" => AuthMode::Session,
            "mock" => AuthMode::Mock,
            other => bail!("unknown AUTH_MODE {other:?}, expected \"session\" or \"mock\""),
        };

        Ok(Self {
            host,
            port,
            storage,
            ephemeral_storage: lookup("EPHEMERAL_STORAGE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            auth_mode,
            session_ttl_minutes,
        })
    }

    pub fn session_ttl(&self) -> anyhow::Result<Duration> {
        self.session_ttl_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .context("session TTL overflows")
    }

    pub fn persistence(&self) -> Persistence {
        if self.ephemeral_storage {
            Persistence::Ephemeral
        } else {
            Persistence::Durable
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_to_file_backend_and_session_auth() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.auth_mode, AuthMode::Session);
        assert!(!cfg.ephemeral_storage);
        assert_eq!(cfg.session_ttl_minutes, 480);
        assert_eq!(
            cfg.storage,
            StorageBackend::File {
                data_file: "data.json".into(),
                admin_file: "admin.json".into(),
            }
        );
    }

    #[test]
    fn port_falls_back_to_platform_variable() {
        let cfg = config_from(&[("PORT", "8081")]).unwrap();
        assert_eq!(cfg.port, 8081);
        let cfg = config_from(&[("PORT", "8081"), ("APP_PORT", "9000")]).unwrap();
        assert_eq!(cfg.port, 9000);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert!(config_from(&[("STORAGE_BACKEND", "postgres")]).is_err());
        let cfg = config_from(&[
            ("STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/admin"),
        ])
        .unwrap();
        assert!(matches!(cfg.storage, StorageBackend::Postgres { .. }));
    }

    #[test]
    fn ephemeral_flag_and_mock_auth_are_explicit() {
        let cfg = config_from(&[("EPHEMERAL_STORAGE", "true"), ("AUTH_MODE", "mock")]).unwrap();
        assert_eq!(cfg.persistence(), Persistence::Ephemeral);
        assert_eq!(cfg.auth_mode, AuthMode::Mock);
        assert!(config_from(&[("AUTH_MODE", "platform")]).is_err());
    }

    #[test]
    fn session_ttl_must_be_a_positive_minute_count() {
        let cfg = config_from(&[("SESSION_TTL_MINUTES", "30")]).unwrap();
        assert_eq!(cfg.session_ttl().unwrap(), Duration::from_secs(30 * 60));

        for bad in ["0", "-5", "soon", "", "99999999999999999999"] {
            assert!(
                config_from(&[("SESSION_TTL_MINUTES", bad)]).is_err(),
                "{bad:?} accepted"
            );
        }
        assert!(config_from(&[("SESSION_TTL_MINUTES", "525601")]).is_err());
    }

    #[test]
    fn oversized_ttl_is_reported_not_wrapped() {
        let mut cfg = config_from(&[]).unwrap();
        cfg.session_ttl_minutes = u64::MAX;
        assert!(cfg.session_ttl().is_err());
    }
}
