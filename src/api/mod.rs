pub mod odds_api;

use crate::models::MarketKind;
use serde::{Deserialize, Serialize};

/// Sports offered in the airbitrage filter, as (odds API key, title)
pub const SPORTS: &[(&str, &str)] = &[
    ("soccer_epl", "Premier League"),
    ("soccer_sweden_allsvenskan", "Allsvenskan"),
    ("soccer_uefa_champs_league", "UEFA Champions League"),
    ("soccer_spain_la_liga", "La Liga"),
    ("soccer_germany_bundesliga", "Bundesliga"),
    ("icehockey_sweden_hockey_league", "SHL"),
    ("icehockey_nhl", "NHL"),
    ("basketball_nba", "NBA"),
];

pub fn sport_title(key: &str) -> &str {
    SPORTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, title)| *title)
        .unwrap_or(key)
}

/// Price format requested from the odds API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    #[default]
    Decimal,
    American,
}

impl OddsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OddsFormat::Decimal => "decimal",
            OddsFormat::American => "american",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "decimal" => Some(OddsFormat::Decimal),
            "american" => Some(OddsFormat::American),
            _ => None,
        }
    }
}

/// What to ask the odds API for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuery {
    pub sport: String,
    pub regions: String,
    pub markets: Vec<MarketKind>,
    pub odds_format: OddsFormat,
}

impl OddsQuery {
    pub fn markets_param(&self) -> String {
        self.markets
            .iter()
            .map(|m| m.api_key())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Cache file name for this query inside `cache_dir`
    pub fn cache_file(&self, cache_dir: &str) -> String {
        format!(
            "{}/odds_{}_{}_{}.json",
            cache_dir.trim_end_matches('/'),
            self.sport,
            self.regions.replace(',', "-"),
            self.markets_param().replace(',', "-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let query = OddsQuery {
            sport: "soccer_epl".to_string(),
            regions: "eu,uk".to_string(),
            markets: vec![MarketKind::H2h, MarketKind::Totals],
            odds_format: OddsFormat::Decimal,
        };
        assert_eq!(query.markets_param(), "h2h,totals");
        assert_eq!(
            query.cache_file("cache/"),
            "cache/odds_soccer_epl_eu-uk_h2h-totals.json"
        );
    }

    #[test]
    fn test_sport_title() {
        assert_eq!(sport_title("soccer_sweden_allsvenskan"), "Allsvenskan");
        assert_eq!(sport_title("cricket_ipl"), "cricket_ipl");
    }
}
