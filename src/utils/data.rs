use crate::models::BetEntry;
use crate::utils::arbitrage::ArbitrageOpportunity;
use crate::utils::bet_log::BetLog;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Save data to a JSON cache file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: &str) -> Result<()> {
    ensure_parent_dir(Path::new(cache_file))?;
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    std::fs::write(cache_file, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load data from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: &str) -> Result<T> {
    let json = std::fs::read_to_string(cache_file).context("Failed to read cache file")?;
    let data: T = serde_json::from_str(&json).context("Failed to deserialize cache data")?;
    Ok(data)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// The bet log's storage slot: one JSON file holding the whole list
#[derive(Debug, Clone)]
pub struct BetLogStore {
    path: PathBuf,
}

impl BetLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored list. A missing or unreadable file yields an empty log.
    pub fn load(&self) -> BetLog {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No saved bet log found, starting empty");
                return BetLog::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Could not read bet log: {}", e);
                return BetLog::default();
            }
        };

        match serde_json::from_str::<Vec<BetEntry>>(&json) {
            Ok(entries) => {
                info!(path = %self.path.display(), bets = entries.len(), "Bet log loaded");
                BetLog::new(entries)
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Could not parse bet log, starting empty: {}", e);
                BetLog::default()
            }
        }
    }

    /// Rewrite the whole list
    pub fn save(&self, log: &BetLog) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let json =
            serde_json::to_string_pretty(log.entries()).context("Failed to serialize bet log")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write bet log to {}", self.path.display()))?;
        debug!(path = %self.path.display(), bets = log.len(), "Bet log saved");
        Ok(())
    }
}

#[derive(Serialize)]
struct BetCsvRow<'a> {
    id: String,
    date: String,
    home_team: &'a str,
    away_team: &'a str,
    league: &'a str,
    bet_type: &'a str,
    odds: f64,
    stake: f64,
    bookmaker: &'a str,
    result: &'static str,
    void_amount: Option<f64>,
    profit: String,
    link: &'a str,
    comment: &'a str,
}

/// Write bets as CSV, one row per entry
pub fn write_bets_csv<'a, W: Write>(
    entries: impl IntoIterator<Item = &'a BetEntry>,
    writer: W,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        csv_writer
            .serialize(BetCsvRow {
                id: entry.id.to_string(),
                date: entry.date.format("%Y-%m-%d").to_string(),
                home_team: &entry.home_team,
                away_team: &entry.away_team,
                league: &entry.league,
                bet_type: &entry.bet_type,
                odds: entry.odds,
                stake: entry.stake,
                bookmaker: &entry.bookmaker,
                result: entry.result.as_str(),
                void_amount: entry.void_amount,
                profit: format!("{:.2}", entry.profit()),
                link: entry.link.as_deref().unwrap_or(""),
                comment: entry.comment.as_deref().unwrap_or(""),
            })
            .context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

/// Save bets to a CSV file
pub fn save_bets_to_csv<'a>(
    entries: impl IntoIterator<Item = &'a BetEntry>,
    filename: &str,
) -> Result<()> {
    ensure_parent_dir(Path::new(filename))?;
    let file = std::fs::File::create(filename).context("Failed to create CSV file")?;
    write_bets_csv(entries, file)
}

/// Save arbitrage opportunities to CSV, one row per leg
pub fn save_arbitrage_to_csv(arbs: &[ArbitrageOpportunity], filename: &str) -> Result<()> {
    ensure_parent_dir(Path::new(filename))?;
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    writer.write_record([
        "Home Team",
        "Away Team",
        "League",
        "Kickoff",
        "Market",
        "Outcome",
        "Bookmaker",
        "Odds",
        "Stake",
        "Guaranteed Return",
        "Profit (%)",
    ])?;

    for arb in arbs {
        for leg in &arb.allocation.legs {
            writer.write_record([
                arb.home_team.clone(),
                arb.away_team.clone(),
                arb.sport_title.clone(),
                arb.commence_time.format("%Y-%m-%d %H:%M").to_string(),
                arb.market_label(),
                leg.label.clone(),
                leg.bookmaker.clone().unwrap_or_default(),
                format!("{:.2}", leg.odds),
                format!("{:.2}", leg.stake),
                format!("{:.2}", arb.allocation.guaranteed_return),
                format!("{:.2}", arb.profit_percentage()),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetForm, BetResult};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("betting_paradise_{}_{}", uuid::Uuid::new_v4(), name))
    }

    fn bet_form() -> BetForm {
        BetForm {
            date: "2025-06-01".to_string(),
            home_team: "Sweden".to_string(),
            away_team: "Norway".to_string(),
            league: "Nations League".to_string(),
            odds: "1.90".to_string(),
            stake: "250".to_string(),
            bookmaker: "Betsson".to_string(),
            comment: "Hemmaplan, \"viktig\" match".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_store_round_trip() {
        let store = BetLogStore::new(temp_path("log.json"));
        let mut log = BetLog::default();
        let id = log.add(&bet_form()).unwrap().id;
        log.update_result(id, BetResult::Void, Some(-25.0)).unwrap();

        store.save(&log).unwrap();
        let loaded = store.load();
        assert_eq!(loaded, log);

        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_missing_store_is_empty() {
        let store = BetLogStore::new(temp_path("missing.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_store_is_empty() {
        let path = temp_path("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = BetLogStore::new(&path);
        assert!(store.load().is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bets_csv() {
        let mut log = BetLog::default();
        let id = log.add(&bet_form()).unwrap().id;
        log.update_result(id, BetResult::Won, None).unwrap();

        let mut buffer = Vec::new();
        write_bets_csv(log.entries(), &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        let mut lines = csv.lines();

        assert!(lines.next().unwrap().starts_with("id,date,home_team,away_team"));
        let row = lines.next().unwrap();
        assert!(row.contains("2025-06-01,Sweden,Norway,Nations League"));
        assert!(row.contains(",won,"));
        assert!(row.contains("225.00"));
        assert!(row.contains("\"Hemmaplan, \"\"viktig\"\" match\""));
    }

    #[test]
    fn test_cache_round_trip() {
        let path = temp_path("cache.json");
        let path_str = path.to_str().unwrap();
        save_to_cache(&vec![1.5_f64, 2.25], path_str).unwrap();
        let loaded: Vec<f64> = load_from_cache(path_str).unwrap();
        assert_eq!(loaded, vec![1.5, 2.25]);
        std::fs::remove_file(&path).ok();
    }
}
