//! Runtime configuration for sessions and materialization.

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

/// Level at which executed SQL is logged. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SqlLogLevel {
    Trace,
    #[default]
    Debug,
    Info,
}

impl SqlLogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            SqlLogLevel::Trace => tracing::Level::TRACE,
            SqlLogLevel::Debug => tracing::Level::DEBUG,
            SqlLogLevel::Info => tracing::Level::INFO,
        }
    }

    fn parse(s: &str) -> OrmResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(SqlLogLevel::Trace),
            "debug" => Ok(SqlLogLevel::Debug),
            "info" => Ok(SqlLogLevel::Info),
            other => Err(OrmError::configuration(format!(
                "unknown sql log level '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for SqlLogLevel {
    type Error = OrmError;

    fn try_from(s: String) -> OrmResult<Self> {
        SqlLogLevel::parse(&s)
    }
}

/// Configuration shared by a [`crate::Session`] and the materializer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasieConfig {
    /// How many relationship levels a single materialization may descend.
    pub max_relation_depth: usize,
    /// Whether sessions log each statement.
    pub log_sql: bool,
    pub sql_log_level: SqlLogLevel,
    /// Truncate logged SQL (in bytes). `None` logs it whole.
    pub max_sql_length: Option<usize>,
    /// Statements slower than this are logged at `warn`.
    pub slow_query_ms: Option<u64>,
}

impl Default for BasieConfig {
    fn default() -> Self {
        Self {
            max_relation_depth: 32,
            log_sql: true,
            sql_log_level: SqlLogLevel::Debug,
            max_sql_length: Some(200),
            slow_query_ms: None,
        }
    }
}

impl BasieConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide defaults, used by executors that carry no configuration.
    pub fn shared_default() -> &'static BasieConfig {
        static DEFAULT: OnceLock<BasieConfig> = OnceLock::new();
        DEFAULT.get_or_init(BasieConfig::default)
    }

    pub fn max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn sql_log_level(mut self, level: SqlLogLevel) -> Self {
        self.sql_log_level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_ms = Some(threshold.as_millis() as u64);
        self
    }

    pub fn slow_query(&self) -> Option<Duration> {
        self.slow_query_ms.map(Duration::from_millis)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    ///
    /// ```toml
    /// max_relation_depth = 8
    /// sql_log_level = "info"
    /// slow_query_ms = 250
    /// ```
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        toml::from_str(s).map_err(|e| OrmError::configuration(format!("invalid config: {e}")))
    }

    /// Read `BASIE_*` environment variables over the defaults.
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`BasieConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> OrmResult<T> {
            raw.trim()
                .parse()
                .map_err(|_| OrmError::configuration(format!("{key}: invalid value '{raw}'")))
        }

        let mut config = Self::default();
        if let Some(v) = lookup("BASIE_MAX_RELATION_DEPTH") {
            config.max_relation_depth = parse("BASIE_MAX_RELATION_DEPTH", &v)?;
        }
        if let Some(v) = lookup("BASIE_LOG_SQL") {
            config.log_sql = parse("BASIE_LOG_SQL", &v)?;
        }
        if let Some(v) = lookup("BASIE_SQL_LOG_LEVEL") {
            config.sql_log_level = SqlLogLevel::parse(&v)?;
        }
        if let Some(v) = lookup("BASIE_MAX_SQL_LENGTH") {
            config.max_sql_length = Some(parse("BASIE_MAX_SQL_LENGTH", &v)?);
        }
        if let Some(v) = lookup("BASIE_SLOW_QUERY_MS") {
            config.slow_query_ms = Some(parse("BASIE_SLOW_QUERY_MS", &v)?);
        }
        Ok(config)
    }
}
