use std::path::PathBuf;

use anyhow::bail;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Connection parts of the external PostgreSQL database behind `/api/ejemplo`.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

/// First administrator, created when `usuarios` has none.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub rut: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub admin: Option<AdminBootstrap>,
    /// Root of the key-value collections.
    pub data_dir: PathBuf,
    pub payroll_db_url: String,
    pub public_dir: PathBuf,
    pub session_guard_disabled: bool,
    pub host: String,
    pub port: u16,
}

const REQUIRED: [&str; 5] = ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME", "JWT_SECRET"];

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Every missing required key is reported at once.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED.into_iter().filter(|k| get(*k).is_none()).collect();
        if !missing.is_empty() {
            bail!("missing required environment variables: {}", missing.join(", "));
        }
        let required = |key: &str| get(key).unwrap_or_default();
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str, default: i64| -> anyhow::Result<i64> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{key} must be a number, got {v:?}")),
                None => Ok(default),
            }
        };

        let db = DbConfig {
            host: required("DB_HOST"),
            port: u16::try_from(parsed("DB_PORT", 5432)?)?,
            user: required("DB_USER"),
            password: required("DB_PASSWORD"),
            name: required("DB_NAME"),
        };
        let jwt = JwtConfig {
            secret: required("JWT_SECRET"),
            issuer: or("JWT_ISSUER", "remuneraciones"),
            audience: or("JWT_AUDIENCE", "remuneraciones-admin"),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60)?,
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email: email.trim().to_string(),
                password,
                rut: or("ADMIN_RUT", "11.111.111-1"),
            }),
            (None, None) => None,
            _ => bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            db,
            jwt,
            admin,
            data_dir: PathBuf::from(or("DATA_DIR", "./data")),
            payroll_db_url: or("PAYROLL_DB_URL", "sqlite://data/remuneraciones.db"),
            public_dir: PathBuf::from(or("PUBLIC_DIR", "./public")),
            session_guard_disabled: get("SESSION_GUARD_DISABLED")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            host: or("APP_HOST", "0.0.0.0"),
            port: u16::try_from(parsed("APP_PORT", 8080)?)?,
        })
    }
}
