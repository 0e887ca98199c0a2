pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use api::*;
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::odds_api::OddsApiClient;
use chrono::{DateTime, Utc};
use config::Config;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use utils::arbitrage::{find_arbitrage, ArbitrageOpportunity};
use utils::data::{load_from_cache, save_to_cache};

/// Odds currently shown on the airbitrage page
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageBoard {
    pub query: OddsQuery,
    pub games: Vec<(Game, Vec<BookmakerOdds>)>,
    pub fetched_at: DateTime<Utc>,
}

impl ArbitrageBoard {
    /// Sure bets on the board, with stakes split for `total_stake`
    pub fn opportunities(&self, total_stake: f64) -> Vec<ArbitrageOpportunity> {
        find_arbitrage(&self.games, total_stake)
    }
}

/// Fetch odds for `query` from the odds API, or from the cache file when
/// `USE_CACHE=1` and one exists
pub async fn fetch_odds(config: &Config, query: &OddsQuery) -> Result<Vec<(Game, Vec<BookmakerOdds>)>> {
    let cache_file = query.cache_file(&config.cache_dir);

    if config.use_cache && Path::new(&cache_file).exists() {
        info!(cache_file = %cache_file, "Loading odds from cache");
        return load_from_cache(&cache_file);
    }

    let api_key = config
        .odds_api_key
        .clone()
        .context("ODDS_API_KEY not set in .env file")?;
    let odds_client = OddsApiClient::new(api_key);

    let games_with_odds = odds_client
        .fetch_games(query)
        .await
        .with_context(|| format!("Failed to fetch odds for {}", query.sport))?;

    save_to_cache(&games_with_odds, &cache_file)?;
    info!(cache_file = %cache_file, games = games_with_odds.len(), "Saved odds to cache");

    Ok(games_with_odds)
}

/// Build the airbitrage board for `query`
pub async fn load_arbitrage_board(config: &Config, query: &OddsQuery) -> Result<ArbitrageBoard> {
    let games = fetch_odds(config, query).await?;
    let board = ArbitrageBoard {
        query: query.clone(),
        games,
        fetched_at: Utc::now(),
    };
    info!(
        sport = %query.sport,
        games = board.games.len(),
        arbitrages = board.opportunities(config.default_stake).len(),
        "Arbitrage board loaded"
    );
    Ok(board)
}
