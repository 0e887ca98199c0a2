//! Settings read from the environment (a `.env` file is loaded first).

use crate::api::{OddsFormat, OddsQuery};
use crate::error::ConfigError;
use crate::models::MarketKind;

const DEFAULT_SPORT: &str = "soccer_epl";
const DEFAULT_REGIONS: &str = "eu";
const DEFAULT_STAKE: f64 = 1000.0;
const DEFAULT_BET_LOG_PATH: &str = "data/spelloggen_bets_v1.json";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Without a key the airbitrage page only shows the featured pairs
    pub odds_api_key: Option<String>,
    pub odds_query: OddsQuery,
    pub default_stake: f64,
    pub bet_log_path: String,
    pub cache_dir: String,
    pub use_cache: bool,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let markets = match get("ODDS_MARKETS") {
            Some(raw) => parse_markets(&raw)?,
            None => vec![MarketKind::H2h],
        };

        let odds_format = match get("ODDS_FORMAT") {
            Some(raw) => OddsFormat::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: "ODDS_FORMAT",
                value: raw,
            })?,
            None => OddsFormat::Decimal,
        };

        let default_stake = match get("DEFAULT_STAKE") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or(ConfigError::InvalidValue {
                    key: "DEFAULT_STAKE",
                    value: raw,
                })?,
            None => DEFAULT_STAKE,
        };

        Ok(Self {
            odds_api_key: get("ODDS_API_KEY"),
            odds_query: OddsQuery {
                sport: get("ODDS_SPORT").unwrap_or_else(|| DEFAULT_SPORT.to_string()),
                regions: get("ODDS_REGIONS").unwrap_or_else(|| DEFAULT_REGIONS.to_string()),
                markets,
                odds_format,
            },
            default_stake,
            bet_log_path: get("BET_LOG_PATH").unwrap_or_else(|| DEFAULT_BET_LOG_PATH.to_string()),
            cache_dir: get("CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()),
            use_cache: get("USE_CACHE").as_deref() == Some("1"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

/// Parse a comma-separated list of odds API market keys
pub fn parse_markets(raw: &str) -> Result<Vec<MarketKind>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            MarketKind::from_api_key(key).ok_or(ConfigError::InvalidValue {
                key: "ODDS_MARKETS",
                value: key.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.odds_api_key.is_none());
        assert_eq!(config.odds_query.sport, "soccer_epl");
        assert_eq!(config.odds_query.markets, vec![MarketKind::H2h]);
        assert_eq!(config.odds_query.odds_format, OddsFormat::Decimal);
        assert_eq!(config.default_stake, 1000.0);
        assert_eq!(config.bet_log_path, "data/spelloggen_bets_v1.json");
        assert!(!config.use_cache);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ODDS_API_KEY", "abc123"),
            ("ODDS_SPORT", "icehockey_nhl"),
            ("ODDS_MARKETS", "h2h, totals,spreads"),
            ("ODDS_FORMAT", "American"),
            ("DEFAULT_STAKE", "250"),
            ("USE_CACHE", "1"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ])
        .unwrap();
        assert_eq!(config.odds_api_key.as_deref(), Some("abc123"));
        assert_eq!(config.odds_query.sport, "icehockey_nhl");
        assert_eq!(
            config.odds_query.markets,
            vec![MarketKind::H2h, MarketKind::Totals, MarketKind::Spreads]
        );
        assert_eq!(config.odds_query.odds_format, OddsFormat::American);
        assert_eq!(config.default_stake, 250.0);
        assert!(config.use_cache);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("DEFAULT_STAKE", "lots")]).is_err());
        assert!(config_from(&[("DEFAULT_STAKE", "-5")]).is_err());
        assert!(config_from(&[("ODDS_MARKETS", "h2h,outrights")]).is_err());
        assert!(config_from(&[("ODDS_FORMAT", "fractional")]).is_err());
        // Blank values fall back to defaults
        assert!(config_from(&[("ODDS_API_KEY", "  ")]).unwrap().odds_api_key.is_none());
    }
}
