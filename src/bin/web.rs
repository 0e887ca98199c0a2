use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use betting_paradise::api::{sport_title, OddsQuery, SPORTS};
use betting_paradise::arbitrage::{featured_pairs, ArbitrageOpportunity, FeaturedPair, StakeSplit};
use betting_paradise::bet_log::{
    parse_amount, result_distribution, BalancePoint, BetFilter, BetLog, BetStats,
};
use betting_paradise::config::Config;
use betting_paradise::data::{write_bets_csv, BetLogStore};
use betting_paradise::error::{BetLogError, ValidationError};
use betting_paradise::site::{
    premium_groups, referral_rewards, reward_progress, ContactMessage, PremiumGroup,
    ReferralReward, CONTACT_EMAIL,
};
use betting_paradise::{load_arbitrage_board, ArbitrageBoard, BetEntry, BetForm, BetResult, MarketKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use uuid::Uuid;

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 200.0;

// Custom filters for formatting
mod filters {
    pub fn format_odds(odds: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}", odds))
    }

    pub fn format_money(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}", value))
    }

    pub fn format_signed_money(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:+.2}", value))
    }

    pub fn format_arb_percent(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}%", value))
    }
}

struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    active_page: String,
    groups: Vec<PremiumGroup>,
    live_count: usize,
}

#[derive(Template)]
#[template(path = "groups.html")]
struct GroupsTemplate {
    active_page: String,
    groups: Vec<PremiumGroup>,
}

#[derive(Template)]
#[template(path = "ranking.html")]
struct RankingTemplate {
    active_page: String,
    rewards: Vec<ReferralReward>,
    referrals: String,
    error: String,
    show_progress: bool,
    reached: Vec<ReferralReward>,
    next_prize: String,
    remaining: u32,
}

#[derive(Template)]
#[template(path = "contact.html")]
struct ContactTemplate {
    active_page: String,
    email: &'static str,
    sent: bool,
    error: String,
    form: ContactMessage,
}

struct LegView {
    label: String,
    bookmaker: String,
    odds: f64,
    stake: f64,
    link: String,
}

struct PairView {
    matchup: String,
    league: String,
    market: String,
    legs: Vec<LegView>,
    is_arbitrage: bool,
    guaranteed_return: f64,
    profit: f64,
    profit_percentage: f64,
    margin_percentage: f64,
}

#[derive(Template)]
#[template(path = "airbitrage.html")]
struct AirbitrageTemplate {
    active_page: String,
    stake: String,
    stake_error: String,
    featured: Vec<PairView>,
    live_enabled: bool,
    sport_options: Vec<SelectOption>,
    market_options: Vec<SelectOption>,
    fetch_error: String,
    fetched_at: String,
    games_scanned: usize,
    refresh_link: String,
    live: Vec<ArbitrageOpportunity>,
}

struct EntryView {
    id: String,
    date: String,
    matchup: String,
    league: String,
    bet_type: String,
    odds: f64,
    stake: f64,
    bookmaker: String,
    link: String,
    comment: String,
    void_amount: String,
    profit: f64,
    result_options: Vec<SelectOption>,
}

struct DistributionRow {
    label: &'static str,
    count: usize,
    width: u32,
}

#[derive(Template)]
#[template(path = "spelloggen.html")]
struct SpelloggenTemplate {
    active_page: String,
    filter_from: String,
    filter_to: String,
    filter_league: String,
    bookmaker_options: Vec<SelectOption>,
    filter_query: String,
    error: String,
    form_title: String,
    form_action: String,
    form_button: String,
    editing: bool,
    form: BetForm,
    form_result_options: Vec<SelectOption>,
    stats: BetStats,
    balance: Vec<BalancePoint>,
    chart_width: f64,
    chart_height: f64,
    chart_zero_y: String,
    chart_points: String,
    last_balance: f64,
    distribution: Vec<DistributionRow>,
    entries: Vec<EntryView>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

struct AppState {
    config: Config,
    store: BetLogStore,
    bet_log: RwLock<BetLog>,
    board: RwLock<Option<ArbitrageBoard>>,
}

impl AppState {
    fn new(config: Config, bet_log: BetLog, board: Option<ArbitrageBoard>) -> Self {
        Self {
            store: BetLogStore::new(&config.bet_log_path),
            config,
            bet_log: RwLock::new(bet_log),
            board: RwLock::new(board),
        }
    }

    fn live_enabled(&self) -> bool {
        self.config.odds_api_key.is_some() || self.config.use_cache
    }

    fn persist(&self, log: &BetLog) {
        if let Err(e) = self.store.save(log) {
            warn!("Failed to save bet log: {:#}", e);
        }
    }
}

type SharedState = Arc<AppState>;

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let live_count = state
        .board
        .read()
        .await
        .as_ref()
        .map(|board| board.opportunities(state.config.default_stake).len())
        .unwrap_or(0);

    HtmlTemplate(HomeTemplate {
        active_page: "home".to_string(),
        groups: premium_groups(),
        live_count,
    })
}

async fn groups() -> impl IntoResponse {
    HtmlTemplate(GroupsTemplate {
        active_page: "groups".to_string(),
        groups: premium_groups(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct RankingQuery {
    referrals: Option<String>,
}

async fn ranking(Query(query): Query<RankingQuery>) -> impl IntoResponse {
    let raw = query.referrals.unwrap_or_default();
    let mut template = RankingTemplate {
        active_page: "ranking".to_string(),
        rewards: referral_rewards(),
        referrals: raw.trim().to_string(),
        error: String::new(),
        show_progress: false,
        reached: Vec::new(),
        next_prize: String::new(),
        remaining: 0,
    };

    if !template.referrals.is_empty() {
        match template.referrals.parse::<u32>() {
            Ok(referrals) => {
                let progress = reward_progress(referrals);
                template.show_progress = true;
                template.reached = progress.reached;
                template.next_prize = progress
                    .next
                    .map(|reward| format!("{} {}", reward.icon, reward.prize))
                    .unwrap_or_default();
                template.remaining = progress.remaining;
            }
            Err(_) => {
                template.error = format!("Ogiltigt antal värvningar: {}", template.referrals);
            }
        }
    }

    HtmlTemplate(template)
}

fn contact_page(form: ContactMessage, sent: bool, error: String) -> ContactTemplate {
    ContactTemplate {
        active_page: "contact".to_string(),
        email: CONTACT_EMAIL,
        sent,
        error,
        form,
    }
}

async fn contact() -> impl IntoResponse {
    HtmlTemplate(contact_page(ContactMessage::default(), false, String::new()))
}

async fn send_contact(Form(message): Form<ContactMessage>) -> Response {
    match message.validate() {
        Ok(()) => {
            info!(name = %message.name.trim(), email = %message.email.trim(), "Contact message received");
            HtmlTemplate(contact_page(ContactMessage::default(), true, String::new())).into_response()
        }
        Err(error) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            HtmlTemplate(contact_page(message, false, error)),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct AirbitrageQuery {
    stake: Option<String>,
    sport: Option<String>,
    market: Option<String>,
    refresh: Option<String>,
}

/// The odds query a page load asks for: the board's current query with any
/// sport or market chosen in the form applied on top
fn requested_query(config: &Config, current: Option<&OddsQuery>, params: &AirbitrageQuery) -> OddsQuery {
    let mut query = current.cloned().unwrap_or_else(|| config.odds_query.clone());

    if let Some(sport) = params.sport.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.sport = sport.to_string();
    }
    match params.market.as_deref().map(str::trim) {
        Some("") => query.markets = config.odds_query.markets.clone(),
        Some(key) => {
            if let Some(kind) = MarketKind::from_api_key(key) {
                query.markets = vec![kind];
            }
        }
        None => {}
    }
    query
}

fn pair_view(pair: &FeaturedPair, total_stake: f64) -> PairView {
    let mut view = PairView {
        matchup: pair.matchup.clone(),
        league: pair.league.clone(),
        market: pair.market.clone(),
        legs: [&pair.first, &pair.second]
            .into_iter()
            .map(|outcome| LegView {
                label: outcome.label.clone(),
                bookmaker: outcome.bookmaker.clone().unwrap_or_default(),
                odds: outcome.odds,
                stake: 0.0,
                link: outcome.link.clone().unwrap_or_default(),
            })
            .collect(),
        is_arbitrage: false,
        guaranteed_return: 0.0,
        profit: 0.0,
        profit_percentage: 0.0,
        margin_percentage: 0.0,
    };

    match pair.evaluate(total_stake) {
        Ok(StakeSplit::Arbitrage(allocation)) => {
            view.is_arbitrage = true;
            view.guaranteed_return = allocation.guaranteed_return;
            view.profit = allocation.profit;
            view.profit_percentage = allocation.profit_percentage;
            for (leg_view, leg) in view.legs.iter_mut().zip(&allocation.legs) {
                leg_view.stake = leg.stake;
            }
        }
        Ok(StakeSplit::NoArbitrage {
            margin_percentage, ..
        }) => view.margin_percentage = margin_percentage,
        Err(e) => warn!(matchup = %pair.matchup, "Could not evaluate featured pair: {}", e),
    }

    view
}

async fn airbitrage(
    State(state): State<SharedState>,
    Query(params): Query<AirbitrageQuery>,
) -> impl IntoResponse {
    let default_stake = state.config.default_stake;
    let raw_stake = params.stake.as_deref().map(str::trim).unwrap_or("");
    let (stake, stake_error) = if raw_stake.is_empty() {
        (default_stake, String::new())
    } else {
        match raw_stake.replace(',', ".").parse::<f64>() {
            Ok(value) if value.is_finite() => (value, String::new()),
            _ => (default_stake, format!("Ogiltig insats: {}", raw_stake)),
        }
    };

    let live_enabled = state.live_enabled();
    let mut fetch_error = String::new();

    if live_enabled {
        let (requested, needs_fetch) = {
            let board = state.board.read().await;
            let requested = requested_query(&state.config, board.as_ref().map(|b| &b.query), &params);
            let needs_fetch = match board.as_ref() {
                Some(board) => board.query != requested || params.refresh.as_deref() == Some("1"),
                None => true,
            };
            (requested, needs_fetch)
        };

        if needs_fetch {
            match load_arbitrage_board(&state.config, &requested).await {
                Ok(board) => *state.board.write().await = Some(board),
                Err(e) => {
                    error!("Failed to load odds: {:#}", e);
                    fetch_error = "Kunde inte hämta odds just nu. Visar senast hämtade data.".to_string();
                }
            }
        }
    }

    let board = state.board.read().await;
    let current = board
        .as_ref()
        .map(|b| b.query.clone())
        .unwrap_or_else(|| state.config.odds_query.clone());

    let mut sport_options: Vec<SelectOption> = SPORTS
        .iter()
        .map(|(key, title)| SelectOption::new(*key, *title, *key == current.sport))
        .collect();
    if !SPORTS.iter().any(|(key, _)| *key == current.sport) {
        sport_options.insert(
            0,
            SelectOption::new(current.sport.clone(), sport_title(&current.sport), true),
        );
    }

    let mut market_options = vec![SelectOption::new(
        "",
        "Alla konfigurerade",
        current.markets == state.config.odds_query.markets && current.markets.len() > 1,
    )];
    market_options.extend(
        [MarketKind::H2h, MarketKind::Totals, MarketKind::Spreads, MarketKind::Btts]
            .into_iter()
            .map(|kind| SelectOption::new(kind.api_key(), kind.label(), current.markets == [kind])),
    );

    let stake_param = urlencoding::encode(&format!("{}", stake)).into_owned();
    let refresh_link = format!(
        "/airbitrage?stake={}&sport={}&refresh=1",
        stake_param,
        urlencoding::encode(&current.sport)
    );

    HtmlTemplate(AirbitrageTemplate {
        active_page: "airbitrage".to_string(),
        stake: if stake_error.is_empty() && !raw_stake.is_empty() {
            raw_stake.to_string()
        } else {
            format!("{}", stake)
        },
        stake_error,
        featured: featured_pairs().iter().map(|pair| pair_view(pair, stake)).collect(),
        live_enabled,
        sport_options,
        market_options,
        fetch_error,
        fetched_at: board
            .as_ref()
            .map(|b| b.fetched_at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default(),
        games_scanned: board.as_ref().map(|b| b.games.len()).unwrap_or(0),
        refresh_link,
        live: board
            .as_ref()
            .map(|b| b.opportunities(stake))
            .unwrap_or_default(),
    })
}

#[derive(Debug, Default, Clone, Deserialize)]
struct LogQuery {
    from: Option<String>,
    to: Option<String>,
    league: Option<String>,
    bookmaker: Option<String>,
    edit: Option<String>,
}

impl LogQuery {
    fn filter(&self) -> Result<BetFilter, ValidationError> {
        BetFilter::from_query(
            self.from.as_deref(),
            self.to.as_deref(),
            self.league.as_deref(),
            self.bookmaker.as_deref(),
        )
    }

    /// The filter part of the query, url-encoded, without the edit target
    fn filter_query(&self) -> String {
        [
            ("from", &self.from),
            ("to", &self.to),
            ("league", &self.league),
            ("bookmaker", &self.bookmaker),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then(|| format!("{}={}", key, urlencoding::encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
    }

    /// Parse the hidden `return_query` field a bet-log form posts back
    fn from_return_query(raw: &str) -> Self {
        format!("/spelloggen?{}", raw)
            .parse::<Uri>()
            .ok()
            .and_then(|uri| Query::<LogQuery>::try_from_uri(&uri).ok())
            .map(|Query(query)| query)
            .unwrap_or_default()
    }

    fn redirect(&self) -> Redirect {
        let query = self.filter_query();
        if query.is_empty() {
            Redirect::to("/spelloggen")
        } else {
            Redirect::to(&format!("/spelloggen?{}", query))
        }
    }
}

fn result_options(selected: BetResult) -> Vec<SelectOption> {
    BetResult::ALL
        .iter()
        .map(|result| SelectOption::new(result.as_str(), result.label(), *result == selected))
        .collect()
}

/// SVG polyline points for the running balance, and the y of the zero line
fn balance_chart(balance: &[BalancePoint]) -> (String, f64) {
    let min = balance.iter().map(|p| p.balance).fold(0.0, f64::min);
    let max = balance.iter().map(|p| p.balance).fold(0.0, f64::max);
    let range = if max - min > f64::EPSILON { max - min } else { 1.0 };
    let y = |value: f64| CHART_HEIGHT - (value - min) / range * CHART_HEIGHT;

    let step = if balance.len() > 1 {
        CHART_WIDTH / (balance.len() - 1) as f64
    } else {
        0.0
    };

    let points = balance
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let x = if balance.len() > 1 { i as f64 * step } else { CHART_WIDTH / 2.0 };
            format!("{:.1},{:.1}", x, y(point.balance))
        })
        .collect::<Vec<_>>()
        .join(" ");

    (points, y(0.0))
}

fn distribution_rows(stats: &BetStats) -> Vec<DistributionRow> {
    let rows = result_distribution(stats);
    let max = rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
    rows.into_iter()
        .map(|(result, count)| DistributionRow {
            label: result.label(),
            count,
            width: if max > 0 { (count * 100 / max) as u32 } else { 0 },
        })
        .collect()
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn entry_view(entry: &BetEntry) -> EntryView {
    EntryView {
        id: entry.id.to_string(),
        date: entry.date.format("%Y-%m-%d").to_string(),
        matchup: entry.matchup(),
        league: or_dash(&entry.league),
        bet_type: or_dash(&entry.bet_type),
        odds: entry.odds,
        stake: entry.stake,
        bookmaker: or_dash(&entry.bookmaker),
        link: entry.link.clone().unwrap_or_default(),
        comment: entry.comment.clone().unwrap_or_default(),
        void_amount: entry.void_amount.map(|v| v.to_string()).unwrap_or_default(),
        profit: entry.profit(),
        result_options: result_options(entry.result),
    }
}

/// Render the bet log page. `form` and `edit_id` override what the query
/// asks for when a submitted form is shown again with an error.
async fn render_spelloggen(
    state: &AppState,
    query: &LogQuery,
    form: Option<BetForm>,
    edit_id: Option<Uuid>,
    mut error: String,
    status: StatusCode,
) -> Response {
    let log = state.bet_log.read().await;

    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => {
            if error.is_empty() {
                error = e.to_string();
            }
            BetFilter::default()
        }
    };

    let edit_id = edit_id.or_else(|| query.edit.as_deref().and_then(|id| Uuid::parse_str(id.trim()).ok()));
    let editing = edit_id.and_then(|id| log.get(id));
    let form = form
        .or_else(|| editing.map(BetForm::from_entry))
        .unwrap_or_default();
    let form_result = form.result.parse::<BetResult>().unwrap_or_default();

    let (form_title, form_action, form_button) = match editing {
        Some(entry) => (
            format!("Redigera spel: {}", entry.matchup()),
            format!("/spelloggen/bets/{}/edit", entry.id),
            "Spara ändringar".to_string(),
        ),
        None => (
            "Lägg till spel".to_string(),
            "/spelloggen/bets".to_string(),
            "Lägg till spel".to_string(),
        ),
    };

    let selected_bookmaker = filter.bookmaker.clone().unwrap_or_default();
    let mut bookmaker_options = vec![SelectOption::new("", "Alla", selected_bookmaker.is_empty())];
    bookmaker_options.extend(log.bookmaker_options().into_iter().map(|bookmaker| {
        let selected = bookmaker == selected_bookmaker;
        SelectOption::new(bookmaker.clone(), bookmaker, selected)
    }));

    let entries = log.filtered(&filter);
    let stats = BetStats::compute(entries.iter().copied());
    let balance = log.running_balance(&filter);
    let (chart_points, zero_y) = balance_chart(&balance);
    let last_balance = balance.last().map(|p| p.balance).unwrap_or(0.0);

    let template = SpelloggenTemplate {
        active_page: "spelloggen".to_string(),
        filter_from: filter.from.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        filter_to: filter.to.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        filter_league: filter.league.clone().unwrap_or_default(),
        bookmaker_options,
        filter_query: query.filter_query(),
        error,
        form_title,
        form_action,
        form_button,
        editing: editing.is_some(),
        form_result_options: result_options(form_result),
        form,
        distribution: distribution_rows(&stats),
        stats,
        balance,
        chart_width: CHART_WIDTH,
        chart_height: CHART_HEIGHT,
        chart_zero_y: format!("{:.1}", zero_y),
        chart_points,
        last_balance,
        entries: entries.into_iter().map(entry_view).collect(),
    };

    (status, HtmlTemplate(template)).into_response()
}

async fn spelloggen(State(state): State<SharedState>, Query(query): Query<LogQuery>) -> Response {
    render_spelloggen(&state, &query, None, None, String::new(), StatusCode::OK).await
}

#[derive(Debug, Deserialize)]
struct BetSubmission {
    #[serde(flatten)]
    bet: BetForm,
    #[serde(default)]
    return_query: String,
}

#[derive(Debug, Deserialize)]
struct ResultSubmission {
    #[serde(default)]
    result: String,
    #[serde(default)]
    void_amount: String,
    #[serde(default)]
    return_query: String,
}

#[derive(Debug, Deserialize)]
struct ReturnTo {
    #[serde(default)]
    return_query: String,
}

fn bet_log_error_response(e: BetLogError) -> Response {
    match e {
        BetLogError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        BetLogError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    }
}

async fn add_bet(State(state): State<SharedState>, Form(submission): Form<BetSubmission>) -> Response {
    let query = LogQuery::from_return_query(&submission.return_query);

    let result = {
        let mut log = state.bet_log.write().await;
        let result = log.add(&submission.bet).map(|entry| entry.id);
        if result.is_ok() {
            state.persist(&log);
        }
        result
    };

    match result {
        Ok(_) => query.redirect().into_response(),
        Err(e) => {
            render_spelloggen(
                &state,
                &query,
                Some(submission.bet),
                None,
                e.to_string(),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
    }
}

async fn edit_bet(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Form(submission): Form<BetSubmission>,
) -> Response {
    let query = LogQuery::from_return_query(&submission.return_query);

    let result = {
        let mut log = state.bet_log.write().await;
        // A bet removed elsewhere must not fall back to the add form
        let result = if log.get(id).is_some() {
            log.update(id, &submission.bet).map(|entry| entry.id)
        } else {
            Err(BetLogError::NotFound(id))
        };
        if result.is_ok() {
            state.persist(&log);
        }
        result
    };

    match result {
        Ok(_) => query.redirect().into_response(),
        Err(BetLogError::Validation(e)) => {
            render_spelloggen(
                &state,
                &query,
                Some(submission.bet),
                Some(id),
                e.to_string(),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(e) => bet_log_error_response(e),
    }
}

async fn set_result(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Form(submission): Form<ResultSubmission>,
) -> Response {
    let query = LogQuery::from_return_query(&submission.return_query);

    let result = match submission.result.parse::<BetResult>() {
        Ok(result) => result,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e).into_response(),
    };
    let void_amount = match parse_amount(&submission.void_amount) {
        Ok(amount) => amount,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };

    let mut log = state.bet_log.write().await;
    match log.update_result(id, result, void_amount).map(|entry| entry.id) {
        Ok(_) => {
            state.persist(&log);
            query.redirect().into_response()
        }
        Err(e) => bet_log_error_response(e),
    }
}

async fn delete_bet(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Form(submission): Form<ReturnTo>,
) -> Response {
    let query = LogQuery::from_return_query(&submission.return_query);

    let mut log = state.bet_log.write().await;
    match log.delete(id) {
        Ok(_) => {
            state.persist(&log);
            query.redirect().into_response()
        }
        Err(e) => bet_log_error_response(e),
    }
}

async fn export_csv(State(state): State<SharedState>, Query(query): Query<LogQuery>) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let log = state.bet_log.read().await;
    let mut buffer = Vec::new();
    if let Err(e) = write_bets_csv(log.filtered(&filter), &mut buffer) {
        error!("Failed to export bet log: {:#}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export bet log").into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"spelloggen.csv\""),
        ],
        buffer,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct DistributionCount {
    result: BetResult,
    count: usize,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    stats: BetStats,
    balance: Vec<BalancePoint>,
    distribution: Vec<DistributionCount>,
}

async fn stats_json(State(state): State<SharedState>, Query(query): Query<LogQuery>) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let log = state.bet_log.read().await;
    let stats = log.stats(&filter);
    let distribution = result_distribution(&stats)
        .into_iter()
        .map(|(result, count)| DistributionCount { result, count })
        .collect();

    Json(StatsResponse {
        balance: log.running_balance(&filter),
        distribution,
        stats,
    })
    .into_response()
}

fn app(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/groups", get(groups))
        .route("/airbitrage", get(airbitrage))
        .route("/ranking", get(ranking))
        .route("/contact", get(contact).post(send_contact))
        .route("/spelloggen", get(spelloggen))
        .route("/spelloggen/bets", post(add_bet))
        .route("/spelloggen/bets/:id/result", post(set_result))
        .route("/spelloggen/bets/:id/edit", post(edit_bet))
        .route("/spelloggen/bets/:id/delete", post(delete_bet))
        .route("/spelloggen/export.csv", get(export_csv))
        .route("/api/spelloggen/stats", get(stats_json))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Invalid configuration")?;

    info!("Loading bet log...");
    let bet_log = BetLogStore::new(&config.bet_log_path).load();

    let board = if config.odds_api_key.is_some() || config.use_cache {
        info!("Loading odds...");
        match load_arbitrage_board(&config, &config.odds_query).await {
            Ok(board) => Some(board),
            Err(e) => {
                error!("Failed to load odds: {:#}", e);
                None
            }
        }
    } else {
        info!("ODDS_API_KEY not set, live odds disabled");
        None
    };

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, bet_log, board));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
