pub mod site;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents a sporting event that bookmakers price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub sport_title: String,
}

/// Market types the airbitrage tool understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    /// Moneyline, two- or three-way (home/away/draw)
    H2h,
    Totals,
    Spreads,
    /// Both teams to score
    Btts,
}

impl MarketKind {
    /// Key used by The Odds API
    pub fn api_key(&self) -> &'static str {
        match self {
            MarketKind::H2h => "h2h",
            MarketKind::Totals => "totals",
            MarketKind::Spreads => "spreads",
            MarketKind::Btts => "btts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketKind::H2h => "Moneyline",
            MarketKind::Totals => "Över/Under",
            MarketKind::Spreads => "Handikapp",
            MarketKind::Btts => "Båda lagen gör mål",
        }
    }

    pub fn from_api_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(MarketKind::H2h),
            "totals" => Some(MarketKind::Totals),
            "spreads" => Some(MarketKind::Spreads),
            "btts" => Some(MarketKind::Btts),
            _ => None,
        }
    }
}

/// Decimal price for one outcome of a market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomePrice {
    pub name: String,
    /// Line for totals and spreads (e.g. 2.5, -3.5)
    pub point: Option<f64>,
    pub price: f64,
    pub link: Option<String>,
}

/// One market as offered by one bookmaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOdds {
    pub kind: MarketKind,
    pub outcomes: Vec<OutcomePrice>,
    pub link: Option<String>,
}

/// Betting odds from a sportsbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub game_id: String,
    pub bookmaker: String,
    pub last_update: DateTime<Utc>,
    pub link: Option<String>,
    pub markets: Vec<MarketOdds>,
}

/// Settlement state of a logged bet. Any state can move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    #[default]
    Pending,
    Won,
    Lost,
    Void,
}

impl BetResult {
    pub const ALL: [BetResult; 4] = [
        BetResult::Pending,
        BetResult::Won,
        BetResult::Lost,
        BetResult::Void,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Won => "won",
            BetResult::Lost => "lost",
            BetResult::Void => "void",
        }
    }

    /// Swedish label shown in the bet log
    pub fn label(&self) -> &'static str {
        match self {
            BetResult::Pending => "Ej rättad",
            BetResult::Won => "Vinst",
            BetResult::Lost => "Förlust",
            BetResult::Void => "Void",
        }
    }

    /// Won, lost and void bets have their stake counted as settled
    pub fn is_settled(&self) -> bool {
        !matches!(self, BetResult::Pending)
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BetResult::Pending),
            "won" => Ok(BetResult::Won),
            "lost" => Ok(BetResult::Lost),
            "void" => Ok(BetResult::Void),
            other => Err(format!("Unknown bet result: {}", other)),
        }
    }
}

/// A wager recorded in the bet log (Spelloggen)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub bet_type: String,
    pub odds: f64,
    pub stake: f64,
    #[serde(default)]
    pub bookmaker: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: BetResult,
    /// Signed settlement for void bets (partial refunds, Asian handicap pushes)
    #[serde(default)]
    pub void_amount: Option<f64>,
}

impl BetEntry {
    /// Net profit contribution of this bet
    pub fn profit(&self) -> f64 {
        match self.result {
            BetResult::Won => self.stake * (self.odds - 1.0),
            BetResult::Lost => -self.stake,
            BetResult::Void => self.void_amount.unwrap_or(0.0),
            BetResult::Pending => 0.0,
        }
    }

    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    pub fn format(&self) -> String {
        format!(
            "{} | {} {} ({}) | {} @ {:.2} | Stake: {:.2} kr | {} | {} | P/L: {:+.2} kr",
            self.id,
            self.date,
            self.matchup(),
            if self.league.is_empty() { "-" } else { self.league.as_str() },
            if self.bet_type.is_empty() { "-" } else { self.bet_type.as_str() },
            self.odds,
            self.stake,
            if self.bookmaker.is_empty() { "-" } else { self.bookmaker.as_str() },
            self.result.label(),
            self.profit()
        )
    }
}

/// Raw bet-log form input, as submitted from the web form or the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub bet_type: String,
    #[serde(default)]
    pub odds: String,
    #[serde(default)]
    pub stake: String,
    #[serde(default)]
    pub bookmaker: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub void_amount: String,
}

impl BetForm {
    /// Pre-fill the edit form from an existing entry
    pub fn from_entry(entry: &BetEntry) -> Self {
        Self {
            date: entry.date.format("%Y-%m-%d").to_string(),
            home_team: entry.home_team.clone(),
            away_team: entry.away_team.clone(),
            league: entry.league.clone(),
            bet_type: entry.bet_type.clone(),
            odds: entry.odds.to_string(),
            stake: entry.stake.to_string(),
            bookmaker: entry.bookmaker.clone(),
            link: entry.link.clone().unwrap_or_default(),
            comment: entry.comment.clone().unwrap_or_default(),
            result: entry.result.as_str().to_string(),
            void_amount: entry.void_amount.map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}
