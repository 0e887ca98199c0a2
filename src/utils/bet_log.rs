//! Spelloggen: the personal bet log and the statistics derived from it.
//!
//! `BetLog` owns the full list of entries in insertion order. Every
//! statistic is computed on demand from a (possibly filtered) view of that
//! list, so adding, editing or deleting a bet can never leave stale numbers
//! behind.

use crate::error::{BetLogError, ValidationError};
use crate::models::{BetEntry, BetForm, BetResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Restricts which entries the statistics are computed over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetFilter {
    /// Inclusive
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the league
    pub league: Option<String>,
    /// Exact bookmaker; None means all bookmakers
    pub bookmaker: Option<String>,
}

impl BetFilter {
    /// Build a filter from raw form values. Empty values mean "no
    /// restriction", as does the bookmaker choice "all"/"alla".
    pub fn from_query(
        from: Option<&str>,
        to: Option<&str>,
        league: Option<&str>,
        bookmaker: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let parse_date = |value: Option<&str>| -> Result<Option<NaiveDate>, ValidationError> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|_| ValidationError::InvalidDate(v.to_string())),
                None => Ok(None),
            }
        };

        let league = league
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let bookmaker = bookmaker
            .map(str::trim)
            .filter(|v| {
                !v.is_empty() && !v.eq_ignore_ascii_case("all") && !v.eq_ignore_ascii_case("alla")
            })
            .map(str::to_string);

        Ok(Self {
            from: parse_date(from)?,
            to: parse_date(to)?,
            league,
            bookmaker,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &BetFilter::default()
    }

    pub fn matches(&self, entry: &BetEntry) -> bool {
        if let Some(from) = self.from {
            if entry.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.date > to {
                return false;
            }
        }
        if let Some(league) = &self.league {
            if !entry.league.to_lowercase().contains(&league.to_lowercase()) {
                return false;
            }
        }
        if let Some(bookmaker) = &self.bookmaker {
            if entry.bookmaker.trim() != bookmaker.as_str() {
                return false;
            }
        }
        true
    }
}

/// Aggregate performance over a set of bets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BetStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub voids: usize,
    pub pending: usize,
    /// Stake of won, lost and void bets
    pub total_staked: f64,
    pub profit: f64,
    /// Percent; 0 when nothing has been staked
    pub roi: f64,
    /// Percent of decided bets (won + lost); 0 when none are decided
    pub win_rate: f64,
}

impl BetStats {
    pub fn compute<'a>(entries: impl IntoIterator<Item = &'a BetEntry>) -> Self {
        let mut stats = BetStats::default();

        for entry in entries {
            stats.total += 1;
            match entry.result {
                BetResult::Won => stats.won += 1,
                BetResult::Lost => stats.lost += 1,
                BetResult::Void => stats.voids += 1,
                BetResult::Pending => stats.pending += 1,
            }
            if entry.result.is_settled() {
                stats.total_staked += entry.stake;
            }
            stats.profit += entry.profit();
        }

        stats.roi = if stats.total_staked > 0.0 {
            stats.profit / stats.total_staked * 100.0
        } else {
            0.0
        };

        let decided = stats.won + stats.lost;
        stats.win_rate = if decided > 0 {
            stats.won as f64 / decided as f64 * 100.0
        } else {
            0.0
        };

        stats
    }
}

/// One point of the running-balance chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub label: String,
    pub balance: f64,
}

/// Cumulative profit in list order, one point per entry
pub fn running_balance<'a>(entries: impl IntoIterator<Item = &'a BetEntry>) -> Vec<BalancePoint> {
    let mut running = 0.0;
    entries
        .into_iter()
        .map(|entry| {
            running += entry.profit();
            BalancePoint {
                label: entry.date.format("%Y-%m-%d").to_string(),
                balance: running,
            }
        })
        .collect()
}

/// Number of bets per result, in display order
pub fn result_distribution(stats: &BetStats) -> Vec<(BetResult, usize)> {
    vec![
        (BetResult::Won, stats.won),
        (BetResult::Lost, stats.lost),
        (BetResult::Void, stats.voids),
        (BetResult::Pending, stats.pending),
    ]
}

fn required(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn optional(value: &str) -> Option<String> {
    required(value).map(str::to_string)
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let normalized = value.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            field,
            value: value.trim().to_string(),
        })
}

/// Parse an optional signed amount such as a void settlement ("-25", "12,50")
pub fn parse_amount(value: &str) -> Result<Option<f64>, ValidationError> {
    match required(value) {
        Some(v) => parse_number("void_amount", v).map(Some),
        None => Ok(None),
    }
}

/// Validated contents of a bet form, without identity
struct ValidBet {
    date: NaiveDate,
    home_team: String,
    away_team: String,
    league: String,
    bet_type: String,
    odds: f64,
    stake: f64,
    bookmaker: String,
    link: Option<String>,
    comment: Option<String>,
    result: BetResult,
    void_amount: Option<f64>,
}

fn validate(form: &BetForm) -> Result<ValidBet, ValidationError> {
    let mut missing = Vec::new();
    let date = required(&form.date);
    let home_team = required(&form.home_team);
    let away_team = required(&form.away_team);
    let odds = required(&form.odds);
    let stake = required(&form.stake);

    if date.is_none() {
        missing.push("date");
    }
    if home_team.is_none() {
        missing.push("home_team");
    }
    if away_team.is_none() {
        missing.push("away_team");
    }
    if odds.is_none() {
        missing.push("odds");
    }
    if stake.is_none() {
        missing.push("stake");
    }

    let (Some(date), Some(home_team), Some(away_team), Some(odds), Some(stake)) =
        (date, home_team, away_team, odds, stake)
    else {
        return Err(ValidationError::MissingFields(missing));
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;

    let odds = parse_number("odds", odds)?;
    if odds <= 1.0 {
        return Err(ValidationError::OddsTooLow(odds));
    }

    let stake = parse_number("stake", stake)?;
    if stake <= 0.0 {
        return Err(ValidationError::StakeNotPositive(stake));
    }

    let result = match required(&form.result) {
        Some(r) => r
            .parse::<BetResult>()
            .map_err(|_| ValidationError::InvalidResult(r.to_string()))?,
        None => BetResult::Pending,
    };

    let void_amount = parse_amount(&form.void_amount)?;

    Ok(ValidBet {
        date,
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        league: form.league.trim().to_string(),
        bet_type: form.bet_type.trim().to_string(),
        odds,
        stake,
        bookmaker: form.bookmaker.trim().to_string(),
        link: optional(&form.link),
        comment: optional(&form.comment),
        result,
        void_amount,
    })
}

/// The full list of logged bets, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetLog {
    entries: Vec<BetEntry>,
}

impl BetLog {
    pub fn new(entries: Vec<BetEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&BetEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Validate the form and append a new pending (or pre-settled) bet
    pub fn add(&mut self, form: &BetForm) -> Result<&BetEntry, ValidationError> {
        let bet = validate(form)?;
        let entry = BetEntry {
            id: Uuid::new_v4(),
            date: bet.date,
            home_team: bet.home_team,
            away_team: bet.away_team,
            league: bet.league,
            bet_type: bet.bet_type,
            odds: bet.odds,
            stake: bet.stake,
            bookmaker: bet.bookmaker,
            link: bet.link,
            comment: bet.comment,
            result: bet.result,
            void_amount: match bet.result {
                BetResult::Void => bet.void_amount,
                _ => None,
            },
        };
        info!(id = %entry.id, matchup = %entry.matchup(), stake = entry.stake, "Bet added");
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Set the result of a bet. `void_amount` is only kept for void bets.
    pub fn update_result(
        &mut self,
        id: Uuid,
        result: BetResult,
        void_amount: Option<f64>,
    ) -> Result<&BetEntry, BetLogError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(BetLogError::NotFound(id))?;

        entry.result = result;
        entry.void_amount = match result {
            BetResult::Void => void_amount,
            _ => None,
        };
        info!(id = %id, result = %result, "Bet result updated");
        Ok(&*entry)
    }

    /// Replace every editable field of a bet, keeping its id and position
    pub fn update(&mut self, id: Uuid, form: &BetForm) -> Result<&BetEntry, BetLogError> {
        let bet = validate(form)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(BetLogError::NotFound(id))?;

        entry.date = bet.date;
        entry.home_team = bet.home_team;
        entry.away_team = bet.away_team;
        entry.league = bet.league;
        entry.bet_type = bet.bet_type;
        entry.odds = bet.odds;
        entry.stake = bet.stake;
        entry.bookmaker = bet.bookmaker;
        entry.link = bet.link;
        entry.comment = bet.comment;
        entry.result = bet.result;
        entry.void_amount = match bet.result {
            BetResult::Void => bet.void_amount,
            _ => None,
        };
        info!(id = %id, "Bet edited");
        Ok(&*entry)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<BetEntry, BetLogError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(BetLogError::NotFound(id))?;
        let removed = self.entries.remove(index);
        info!(id = %id, "Bet deleted");
        Ok(removed)
    }

    /// Entries matching the filter, in insertion order
    pub fn filtered(&self, filter: &BetFilter) -> Vec<&BetEntry> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .collect()
    }

    pub fn stats(&self, filter: &BetFilter) -> BetStats {
        BetStats::compute(self.filtered(filter))
    }

    pub fn running_balance(&self, filter: &BetFilter) -> Vec<BalancePoint> {
        running_balance(self.filtered(filter))
    }

    /// Distinct bookmaker names, trimmed, in first-seen order
    pub fn bookmaker_options(&self) -> Vec<String> {
        let mut options: Vec<String> = Vec::new();
        for entry in &self.entries {
            let name = entry.bookmaker.trim();
            if !name.is_empty() && !options.iter().any(|o| o == name) {
                options.push(name.to_string());
            }
        }
        options
    }
}
