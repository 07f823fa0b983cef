//! Configuration module
//!
//! Loads configuration from environment variables. Every value has a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::OrchestratorSettings;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Upper bound on the fraud risk-validation call
    pub fraud_check_timeout: Duration,

    pub batch_max_size: usize,

    pub batch_concurrency: usize,

    pub schedule_horizon_months: u32,

    /// Recipient of operational alerts
    pub operations_alert_email: String,

    /// How often the scheduled transfer runner polls
    pub scheduler_interval: Duration,

    /// Seed a few demo accounts into the in-memory store
    pub seed_demo_accounts: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 3000)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_format = parse_var("LOG_FORMAT", LogFormat::Text)?;

        let fraud_check_timeout_ms: u64 = parse_var("FRAUD_CHECK_TIMEOUT_MS", 5000)?;
        if fraud_check_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("FRAUD_CHECK_TIMEOUT_MS"));
        }

        let batch_max_size: usize = parse_var("BATCH_MAX_SIZE", 100)?;
        if batch_max_size == 0 {
            return Err(ConfigError::InvalidValue("BATCH_MAX_SIZE"));
        }

        let batch_concurrency: usize = parse_var("BATCH_CONCURRENCY", 1)?;
        if batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue("BATCH_CONCURRENCY"));
        }

        let schedule_horizon_months = parse_var("SCHEDULE_HORIZON_MONTHS", 6)?;
        let operations_alert_email = env::var("OPERATIONS_ALERT_EMAIL")
            .unwrap_or_else(|_| "operations@bank.com".to_string());

        let scheduler_interval_secs: u64 = parse_var("SCHEDULER_INTERVAL_SECS", 30)?;
        if scheduler_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("SCHEDULER_INTERVAL_SECS"));
        }

        let seed_demo_accounts = parse_var("SEED_DEMO_ACCOUNTS", environment != "production")?;

        Ok(Self {
            host,
            port,
            environment,
            log_format,
            fraud_check_timeout: Duration::from_millis(fraud_check_timeout_ms),
            batch_max_size,
            batch_concurrency,
            schedule_horizon_months,
            operations_alert_email,
            scheduler_interval: Duration::from_secs(scheduler_interval_secs),
            seed_demo_accounts,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Settings for the transfer orchestrator
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            fraud_check_timeout: self.fraud_check_timeout,
            batch_max_size: self.batch_max_size,
            batch_concurrency: self.batch_concurrency,
            schedule_horizon_months: self.schedule_horizon_months,
            operations_alert_email: self.operations_alert_email.clone(),
        }
    }
}

/// Read `name`, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Text ".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_var_default_and_invalid() {
        // Variable names unique to this test so parallel tests do not interfere
        assert_eq!(parse_var("TRANSFER_SAGA_TEST_UNSET", 42u32).unwrap(), 42);

        env::set_var("TRANSFER_SAGA_TEST_BAD", "not-a-number");
        match parse_var::<u32>("TRANSFER_SAGA_TEST_BAD", 1) {
            Err(ConfigError::InvalidValue(name)) => assert_eq!(name, "TRANSFER_SAGA_TEST_BAD"),
            other => panic!("Expected invalid value, got {:?}", other),
        }
        env::remove_var("TRANSFER_SAGA_TEST_BAD");
    }

    #[test]
    fn test_orchestrator_settings_from_config() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "test".to_string(),
            log_format: LogFormat::Text,
            fraud_check_timeout: Duration::from_millis(250),
            batch_max_size: 10,
            batch_concurrency: 4,
            schedule_horizon_months: 3,
            operations_alert_email: "ops@example.com".to_string(),
            scheduler_interval: Duration::from_secs(5),
            seed_demo_accounts: false,
        };

        let settings = config.orchestrator_settings();
        assert_eq!(settings.fraud_check_timeout, Duration::from_millis(250));
        assert_eq!(settings.batch_concurrency, 4);
        assert_eq!(settings.operations_alert_email, "ops@example.com");
        assert!(!config.is_production());
    }
}
