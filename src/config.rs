use crate::domain::Amount;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Company reporting currency; all ledger amounts are denominated in it.
    pub reporting_currency: String,
    /// Internal-seller percentage ceiling above which recomputation
    /// requires an approved authorization.
    pub seller_percent_ceiling: Amount,
    /// Host product used on settlement vendor bills. Billing fails while
    /// unset.
    pub commission_product_id: Option<i64>,
    /// Host journal for settlement vendor bills. Billing fails while unset.
    pub commission_journal_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let reporting_currency = env_map
            .get("REPORTING_CURRENCY")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("REPORTING_CURRENCY".to_string()))?;
        if reporting_currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "REPORTING_CURRENCY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let seller_percent_ceiling = env_map
            .get("SELLER_PERCENT_CEILING")
            .map(|s| s.as_str())
            .unwrap_or("2.5");
        let seller_percent_ceiling = Amount::parse(seller_percent_ceiling).map_err(|_| {
            ConfigError::InvalidValue(
                "SELLER_PERCENT_CEILING".to_string(),
                "must be a valid decimal".to_string(),
            )
        })?;

        let commission_product_id = parse_optional_i64(&env_map, "COMMISSION_PRODUCT_ID")?;
        let commission_journal_id = parse_optional_i64(&env_map, "COMMISSION_JOURNAL_ID")?;

        Ok(Config {
            port,
            database_path,
            reporting_currency,
            seller_percent_ceiling,
            commission_product_id,
            commission_journal_id,
        })
    }
}

fn parse_optional_i64(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<i64>, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid i64".to_string())
        }),
        None => Ok(None),
    }
}
