use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Secrets shipped in sample env files. Starting with one of these would make
/// every token forgeable.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "change-me",
    "changeme",
    "secret",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("PLACEMENTLOG_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("PLACEMENTLOG_JWT_SECRET must be set");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PLACEMENTLOG_JWT_SECRET is still a placeholder value");
        }

        let db_path = lookup("PLACEMENTLOG_DB_PATH").unwrap_or_else(|| "placementlog.db".into());
        let host = lookup("PLACEMENTLOG_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("PLACEMENTLOG_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("PLACEMENTLOG_PORT must be a port number")?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let bootstrap_admin = match (
            lookup("PLACEMENTLOG_ADMIN_USERNAME"),
            lookup("PLACEMENTLOG_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin { username, password })
            }
            (None, None) => None,
            _ => bail!(
                "PLACEMENTLOG_ADMIN_USERNAME and PLACEMENTLOG_ADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            addr,
            bootstrap_admin,
        })
    }
}
