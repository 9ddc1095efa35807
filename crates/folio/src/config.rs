//! Application configuration.

use folio_core::{FolioError, PeriodView, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Financial Modeling Prep API key.
pub const ENV_API_KEY: &str = "FMP_API_KEY";
/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "FOLIO_DB_PATH";
/// Environment variable overriding the default period view.
pub const ENV_PERIOD: &str = "FOLIO_PERIOD";
/// Environment variable overriding the default number of years.
pub const ENV_YEARS: &str = "FOLIO_YEARS";
/// Environment variable setting the record staleness TTL in seconds.
pub const ENV_CACHE_TTL: &str = "FOLIO_CACHE_TTL_SECS";

const DB_FILE: &str = "folio.db";

/// Runtime configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Financial Modeling Prep API key.
    pub fmp_api_key: String,
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Period view used until the user picks one.
    #[serde(default)]
    pub period: PeriodView,
    /// Years shown until the user picks a value.
    #[serde(default = "default_years")]
    pub years: u32,
    /// Records older than this are dropped when the store opens.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl std::fmt::Debug for FolioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolioConfig")
            .field("fmp_api_key", &"[REDACTED]")
            .field("db_path", &self.db_path)
            .field("period", &self.period)
            .field("years", &self.years)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("folio")
        .join(DB_FILE)
}

const fn default_years() -> u32 {
    folio_charts::store::DEFAULT_YEARS
}

impl FolioConfig {
    /// Creates a configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(fmp_api_key: impl Into<String>) -> Self {
        Self {
            fmp_api_key: fmp_api_key.into(),
            db_path: default_db_path(),
            period: PeriodView::default(),
            years: default_years(),
            cache_ttl_secs: None,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`FolioError::InvalidParameter`] if the API key is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let key = var(ENV_API_KEY)
            .ok_or_else(|| FolioError::InvalidParameter(format!("{ENV_API_KEY} is not set")))?;
        let mut config = Self::new(key.trim());

        if let Some(path) = var(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(period) = var(ENV_PERIOD) {
            config.period = period.parse()?;
        }
        if let Some(years) = var(ENV_YEARS) {
            config.years = parse_number(ENV_YEARS, &years)?;
        }
        if let Some(ttl) = var(ENV_CACHE_TTL) {
            config.cache_ttl_secs = Some(parse_number(ENV_CACHE_TTL, &ttl)?);
        }
        Ok(config)
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Sets the default period view.
    #[must_use]
    pub const fn with_period(mut self, period: PeriodView) -> Self {
        self.period = period;
        self
    }

    /// Sets the default number of years.
    #[must_use]
    pub const fn with_years(mut self, years: u32) -> Self {
        self.years = years;
        self
    }

    /// Sets the staleness TTL.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = Some(ttl.as_secs());
        self
    }

    /// The staleness TTL, if any.
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| FolioError::InvalidParameter(format!("{name} must be a number, got {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_invalid_parameter() {
        let err = FolioConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, FolioError::InvalidParameter(_)));
        let blank = FolioConfig::from_lookup(lookup(&[(ENV_API_KEY, "  ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = FolioConfig::from_lookup(lookup(&[(ENV_API_KEY, "k")])).unwrap();
        assert_eq!(config.period, PeriodView::Annual);
        assert_eq!(config.years, 10);
        assert_eq!(config.cache_ttl(), None);
        assert!(config.db_path.ends_with("folio/folio.db"));
    }

    #[test]
    fn test_overrides() {
        let config = FolioConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "k"),
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_PERIOD, "ttm"),
            (ENV_YEARS, "3"),
            (ENV_CACHE_TTL, "60"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.period, PeriodView::Ttm);
        assert_eq!(config.years, 3);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(60)));

        let bad = FolioConfig::from_lookup(lookup(&[(ENV_API_KEY, "k"), (ENV_YEARS, "ten")]));
        assert!(matches!(bad, Err(FolioError::InvalidParameter(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = FolioConfig::new("secret").with_years(5);
        assert!(!format!("{config:?}").contains("secret"));
        assert_eq!(config.years, 5);
    }
}
