use serde::Deserialize;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub addr: SocketAddr,
    pub max_file_size: usize,
    /// Only sheets whose name starts with this are treated as reports.
    pub sheet_prefix: String,
    pub workbook_cache_capacity: u64,
    /// Days selected when a request gives no range.
    pub default_day_span: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: default_addr(),
            max_file_size: default_max_file_size(),
            sheet_prefix: "Отчет".to_string(),
            workbook_cache_capacity: 16,
            default_day_span: 5,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>()
            .with_context(|| format!("Failed to parse {}={}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            addr: env_or("DASHBOARD_ADDR", defaults.addr)?,
            max_file_size: env_or("MAX_FILE_SIZE", defaults.max_file_size)?,
            sheet_prefix: env_or("SHEET_PREFIX", defaults.sheet_prefix)?,
            workbook_cache_capacity: env_or("WORKBOOK_CACHE_CAPACITY", defaults.workbook_cache_capacity)?,
            default_day_span: env_or("DEFAULT_DAY_SPAN", defaults.default_day_span)?,
        })
    }
}

pub fn load_config() -> Result<Config> {
    // Load .env file first
    dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_and_parses() {
        assert_eq!(env_or("CALLCENTER_TEST_UNSET_VAR", 7usize).unwrap(), 7);

        std::env::set_var("CALLCENTER_TEST_SPAN", " 3 ");
        assert_eq!(env_or("CALLCENTER_TEST_SPAN", 5usize).unwrap(), 3);

        std::env::set_var("CALLCENTER_TEST_BAD_SPAN", "many");
        assert!(env_or("CALLCENTER_TEST_BAD_SPAN", 5usize).is_err());
    }

    #[test]
    fn defaults_match_report_layout() {
        let config = Config::default();
        assert_eq!(config.sheet_prefix, "Отчет");
        assert_eq!(config.default_day_span, 5);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }
}
