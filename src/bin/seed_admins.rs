//! Replaces the admin directory with a fixed set of accounts.
//!
//! `SEED_ADMINS="name:password:role,..."` overrides the defaults.

use anyhow::{bail, Context};
use occasion_admin::{
    auth::{password::hash_password, repo_types::NewAdmin},
    config::AppConfig,
    state::AppState,
};

const DEFAULT_ADMINS: &str = "admin:admin123:administrator,harsh:harsh123:manager";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "occasion_admin=info,seed_admins=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.ephemeral_storage {
        bail!("refusing to seed admins while EPHEMERAL_STORAGE is set; nothing would be written");
    }

    let seed_list = std::env::var("SEED_ADMINS").unwrap_or_else(|_| DEFAULT_ADMINS.into());
    let admins = parse_seed(&seed_list)?
        .into_iter()
        .map(|(username, password, role)| -> anyhow::Result<NewAdmin> {
            Ok(NewAdmin {
                password_hash: hash_password(&password)
                    .with_context(|| format!("hash password for {username}"))?,
                username,
                role,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let state = AppState::init(config).await?;
    let created = state.admins.replace_all(admins).await?;
    for a in &created {
        tracing::info!(id = a.id, username = %a.username, role = %a.role, "admin seeded");
    }
    tracing::info!(count = created.len(), "admin data seeded");
    Ok(())
}

fn parse_seed(seed_list: &str) -> anyhow::Result<Vec<(String, String, String)>> {
    let mut out = Vec::new();
    for entry in seed_list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(pass), Some(role))
                if !user.is_empty() && !pass.is_empty() && !role.is_empty() =>
            {
                out.push((user.to_string(), pass.to_string(), role.to_string()))
            }
            _ => bail!("malformed SEED_ADMINS entry {entry:?}, expected name:password:role"),
        }
    }
    if out.is_empty() {
        bail!("SEED_ADMINS lists no admins");
    }
    Ok(out)
}
