use crate::api::{OddsFormat, OddsQuery};
use crate::models::{BookmakerOdds, Game, MarketKind, MarketOdds, OutcomePrice};
use crate::utils::odds::american_to_decimal;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";

/// Response from The Odds API for a single game
#[derive(Debug, Deserialize)]
struct OddsApiGame {
    id: String,
    sport_title: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsApiBookmaker>,
}

/// Bookmaker data from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiBookmaker {
    title: String,
    last_update: DateTime<Utc>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    markets: Vec<OddsApiMarket>,
}

/// Market data (e.g., h2h, totals) from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiMarket {
    key: String,
    #[serde(default)]
    link: Option<String>,
    outcomes: Vec<OddsApiOutcome>,
}

/// Outcome data for a specific team or side
#[derive(Debug, Deserialize)]
struct OddsApiOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
    #[serde(default)]
    link: Option<String>,
}

pub struct OddsApiClient {
    api_key: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch upcoming games with odds for the queried sport and markets.
    /// Games that have already started are dropped.
    pub async fn fetch_games(&self, query: &OddsQuery) -> Result<Vec<(Game, Vec<BookmakerOdds>)>> {
        let url = format!("{}/sports/{}/odds", ODDS_API_BASE_URL, query.sport);
        let markets = query.markets_param();

        info!(sport = %query.sport, markets = %markets, regions = %query.regions, "Fetching odds");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", query.regions.as_str()),
                ("markets", markets.as_str()),
                ("oddsFormat", query.odds_format.as_str()),
                ("includeLinks", "true"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        log_usage(response.headers());

        let api_games: Vec<OddsApiGame> = response
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        Ok(convert_games(api_games, query.odds_format, Utc::now()))
    }

    /// Check how many API requests you have remaining
    pub async fn check_usage(&self) -> Result<()> {
        let url = format!("{}/sports", ODDS_API_BASE_URL);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to reach The Odds API")?;

        log_usage(response.headers());
        Ok(())
    }
}

fn log_usage(headers: &reqwest::header::HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("?")
            .to_string()
    };
    info!(
        remaining = %header("x-requests-remaining"),
        used = %header("x-requests-used"),
        "Odds API usage"
    );
}

/// Parse a raw odds API response body
pub fn parse_games(
    body: &str,
    odds_format: OddsFormat,
    now: DateTime<Utc>,
) -> Result<Vec<(Game, Vec<BookmakerOdds>)>> {
    let api_games: Vec<OddsApiGame> =
        serde_json::from_str(body).context("Failed to parse Odds API response")?;
    Ok(convert_games(api_games, odds_format, now))
}

fn convert_games(
    api_games: Vec<OddsApiGame>,
    odds_format: OddsFormat,
    now: DateTime<Utc>,
) -> Vec<(Game, Vec<BookmakerOdds>)> {
    api_games
        .into_iter()
        .filter(|api_game| api_game.commence_time > now)
        .map(|api_game| {
            let game = Game {
                id: api_game.id.clone(),
                home_team: api_game.home_team,
                away_team: api_game.away_team,
                commence_time: api_game.commence_time,
                sport_title: api_game.sport_title,
            };

            let odds: Vec<BookmakerOdds> = api_game
                .bookmakers
                .into_iter()
                .map(|bookmaker| {
                    let markets = bookmaker
                        .markets
                        .into_iter()
                        .filter_map(|market| {
                            let Some(kind) = MarketKind::from_api_key(&market.key) else {
                                debug!(market = %market.key, "Ignoring unsupported market");
                                return None;
                            };
                            let outcomes = market
                                .outcomes
                                .into_iter()
                                .map(|outcome| OutcomePrice {
                                    name: outcome.name,
                                    point: outcome.point,
                                    price: match odds_format {
                                        OddsFormat::Decimal => outcome.price,
                                        OddsFormat::American => american_to_decimal(outcome.price),
                                    },
                                    link: outcome.link,
                                })
                                .collect();
                            Some(MarketOdds {
                                kind,
                                outcomes,
                                link: market.link,
                            })
                        })
                        .collect();

                    BookmakerOdds {
                        game_id: api_game.id.clone(),
                        bookmaker: bookmaker.title,
                        last_update: bookmaker.last_update,
                        link: bookmaker.link,
                        markets,
                    }
                })
                .filter(|bookmaker_odds| !bookmaker_odds.markets.is_empty())
                .collect();

            (game, odds)
        })
        .collect()
}
