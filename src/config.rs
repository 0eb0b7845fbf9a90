use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. "0.0.0.0:5003")
    pub bind_address: String,

    /// Postgres connection URL
    pub database_url: String,

    /// Schema every production table lives in
    pub db_schema: String,

    pub max_connections: u32,

    /// Directory served under /static
    pub static_dir: String,

    pub scope: ReportScope,
}

/// Cut-offs applied by every phase query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportScope {
    /// Lots that started before this year are ignored.
    pub min_lot_year: i32,
    /// Inventory movements older than this date are ignored.
    pub movements_since: NaiveDate,
}

impl Default for ReportScope {
    fn default() -> Self {
        Self {
            min_lot_year: 2025,
            movements_since: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                let user = lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
                let password = lookup("DB_PASSWORD").unwrap_or_default();
                let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".into());
                let port = lookup("DB_PORT").unwrap_or_else(|| "5432".into());
                let name = lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    urlencoding::encode(&user),
                    urlencoding::encode(&password),
                    host,
                    port,
                    name
                )
            }
        };

        let db_schema = lookup("DB_SCHEMA")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "public".into());
        if !IDENTIFIER.is_match(&db_schema) {
            return Err(ConfigError::Invalid {
                key: "DB_SCHEMA",
                value: db_schema,
            });
        }

        let bind_address = match lookup("BIND_ADDRESS") {
            Some(addr) => addr,
            None => format!("0.0.0.0:{}", lookup("PORT").unwrap_or_else(|| "5003".into())),
        };

        let max_connections = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 5)?;

        let defaults = ReportScope::default();
        let min_lot_year = parse_or("MIN_LOT_YEAR", lookup("MIN_LOT_YEAR"), defaults.min_lot_year)?;
        let movements_since = match lookup("MOVEMENTS_SINCE") {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::Invalid {
                    key: "MOVEMENTS_SINCE",
                    value: raw,
                }
            })?,
            None => defaults.movements_since,
        };

        Ok(Self {
            bind_address,
            database_url,
            db_schema,
            max_connections,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".into()),
            scope: ReportScope {
                min_lot_year,
                movements_since,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
