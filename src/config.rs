use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials of the admin account seeded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin_secret: Option<String>,
    pub assets_root: PathBuf,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "smartpantry".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "smartpantry-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let admin_secret = non_empty_var("ADMIN_SECRET_KEY");
        if admin_secret.is_none() {
            tracing::warn!("ADMIN_SECRET_KEY not set; admin registration disabled");
        }

        let assets_root = std::env::var("ASSETS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./assets"));

        let bootstrap_admin = match (
            non_empty_var("BOOTSTRAP_ADMIN_EMAIL"),
            non_empty_var("BOOTSTRAP_ADMIN_NAME"),
            non_empty_var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(name), Some(password)) => Some(BootstrapAdmin {
                email,
                name,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt,
            admin_secret,
            assets_root,
            bootstrap_admin,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
