use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use strum_macros::{Display as StrumDisplay, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    #[strum(serialize = "mysql")]
    MySql,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PhotoBackend {
    Cloudinary,
    Memory,
}

#[derive(Debug, Clone, Default)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub upload_preset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    pub photo_backend: PhotoBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_query_per_min: u32,

    pub api_prefix: String,

    pub employee_cache_ttl_secs: u64,
    pub employee_cache_capacity: u64,

    /// Served by `GET /employee` when no id is given
    pub demo_employee_id: Option<String>,

    pub cloudinary: CloudinaryConfig,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

/// Reads `key`, falling back to `default` when unset or blank.
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080".to_string())?,
            storage_backend: var_or("STORAGE_BACKEND", StorageBackend::MySql)?,
            photo_backend: var_or("PHOTO_BACKEND", PhotoBackend::Cloudinary)?,
            database_url: optional_var("DATABASE_URL"),
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,

            rate_attendance_per_min: var_or("RATE_ATTENDANCE_PER_MIN", 60)?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_query_per_min: var_or("RATE_QUERY_PER_MIN", 1000)?,

            api_prefix: var_or("API_PREFIX", "/api".to_string())?,

            employee_cache_ttl_secs: var_or("EMPLOYEE_CACHE_TTL_SECS", 300)?,
            employee_cache_capacity: var_or("EMPLOYEE_CACHE_CAPACITY", 10_000)?,

            demo_employee_id: optional_var("DEMO_EMPLOYEE_ID"),

            cloudinary: CloudinaryConfig {
                cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
                api_key: optional_var("CLOUDINARY_API_KEY"),
                api_secret: optional_var("CLOUDINARY_API_SECRET"),
                upload_preset: optional_var("CLOUDINARY_UPLOAD_PRESET"),
            },

            log_dir: var_or("LOG_DIR", "logs".to_string())?,
            log_level: var_or("LOG_LEVEL", tracing::Level::DEBUG)?,
        };

        if config.storage_backend == StorageBackend::MySql {
            config
                .database_url
                .as_ref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=mysql")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
impl Config {
    /// Everything in memory, limits high enough not to interfere.
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            storage_backend: StorageBackend::Memory,
            photo_backend: PhotoBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            rate_attendance_per_min: 10_000,
            rate_register_per_min: 10_000,
            rate_query_per_min: 10_000,
            api_prefix: "/api".into(),
            employee_cache_ttl_secs: 60,
            employee_cache_capacity: 100,
            demo_employee_id: None,
            cloudinary: CloudinaryConfig::default(),
            log_dir: "logs".into(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_parse_case_insensitively() {
        assert_eq!("mysql".parse::<StorageBackend>().unwrap(), StorageBackend::MySql);
        assert_eq!("MySQL".parse::<StorageBackend>().unwrap(), StorageBackend::MySql);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("Cloudinary".parse::<PhotoBackend>().unwrap(), PhotoBackend::Cloudinary);
        assert!("postgres".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::MySql.to_string(), "mysql");
    }
}
