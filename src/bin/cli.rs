use anyhow::{bail, Context, Result};
use betting_paradise::api::odds_api::OddsApiClient;
use betting_paradise::arbitrage::{calculate_stakes, OutcomeOdds, StakeSplit};
use betting_paradise::bet_log::{parse_amount, BetFilter, BetLog};
use betting_paradise::config::Config;
use betting_paradise::data::{save_arbitrage_to_csv, save_bets_to_csv, BetLogStore};
use betting_paradise::{load_arbitrage_board, BetForm, BetResult, MarketKind};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

/// BettingParadise odds tools and bet log
#[derive(Parser)]
#[command(name = "cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a stake across the outcomes of one market
    Calc {
        /// Decimal odds, one per outcome
        #[arg(long, required = true, num_args = 1..)]
        odds: Vec<f64>,
        /// Total stake (defaults to DEFAULT_STAKE)
        #[arg(long)]
        stake: Option<f64>,
    },
    /// Fetch live odds and list sure bets
    Scan {
        /// Odds API sport key, e.g. soccer_epl
        #[arg(long)]
        sport: Option<String>,
        /// h2h, totals, spreads or btts
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        stake: Option<f64>,
        /// Also write the opportunities to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Show how many odds API requests are left this month
    Usage,
    /// Manage the bet log (Spelloggen)
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },
}

#[derive(Subcommand)]
enum LogCommand {
    /// Log a new bet
    Add(BetArgs),
    /// List bets
    List(FilterArgs),
    /// Set the result of a bet
    Settle {
        id: Uuid,
        /// pending, won, lost or void
        result: String,
        /// Signed amount for void bets, e.g. -25
        #[arg(long, allow_hyphen_values = true)]
        void_amount: Option<String>,
    },
    /// Change fields of a bet; omitted fields are kept
    Edit {
        id: Uuid,
        #[command(flatten)]
        bet: BetArgs,
    },
    Delete {
        id: Uuid,
    },
    /// Profit, ROI and win rate
    Stats(FilterArgs),
    /// Write bets to a CSV file
    Export {
        path: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args)]
struct BetArgs {
    /// YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,
    #[arg(long = "home")]
    home_team: Option<String>,
    #[arg(long = "away")]
    away_team: Option<String>,
    #[arg(long)]
    league: Option<String>,
    #[arg(long)]
    bet_type: Option<String>,
    #[arg(long)]
    odds: Option<String>,
    #[arg(long)]
    stake: Option<String>,
    #[arg(long)]
    bookmaker: Option<String>,
    #[arg(long)]
    link: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    result: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    void_amount: Option<String>,
}

impl BetArgs {
    /// Overlay the given fields on `base`
    fn apply(self, base: BetForm) -> BetForm {
        BetForm {
            date: self.date.unwrap_or(base.date),
            home_team: self.home_team.unwrap_or(base.home_team),
            away_team: self.away_team.unwrap_or(base.away_team),
            league: self.league.unwrap_or(base.league),
            bet_type: self.bet_type.unwrap_or(base.bet_type),
            odds: self.odds.unwrap_or(base.odds),
            stake: self.stake.unwrap_or(base.stake),
            bookmaker: self.bookmaker.unwrap_or(base.bookmaker),
            link: self.link.unwrap_or(base.link),
            comment: self.comment.unwrap_or(base.comment),
            result: self.result.unwrap_or(base.result),
            void_amount: self.void_amount.unwrap_or(base.void_amount),
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    /// Part of the league name
    #[arg(long)]
    league: Option<String>,
    #[arg(long)]
    bookmaker: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<BetFilter> {
        Ok(BetFilter::from_query(
            self.from.as_deref(),
            self.to.as_deref(),
            self.league.as_deref(),
            self.bookmaker.as_deref(),
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Command::Calc { odds, stake } => calc(&odds, stake.unwrap_or(config.default_stake)),
        Command::Scan {
            sport,
            market,
            stake,
            csv,
        } => scan(&config, sport, market, stake, csv).await,
        Command::Usage => {
            let api_key = config
                .odds_api_key
                .clone()
                .context("ODDS_API_KEY not set in .env file")?;
            OddsApiClient::new(api_key).check_usage().await
        }
        Command::Log { command } => run_log(&config, command),
    }
}

fn calc(odds: &[f64], total_stake: f64) -> Result<()> {
    let outcomes: Vec<OutcomeOdds> = odds
        .iter()
        .enumerate()
        .map(|(i, odds)| OutcomeOdds::new(format!("Utfall {}", i + 1), *odds))
        .collect();

    match calculate_stakes(&outcomes, total_stake)? {
        StakeSplit::Arbitrage(allocation) => {
            println!(
                "Arbitrage! Implied probability sum: {:.4}\n",
                allocation.implied_sum
            );
            for leg in &allocation.legs {
                println!(
                    "  {} @ {:.2}: stake {:.2} kr, payout {:.2} kr",
                    leg.label, leg.odds, leg.stake, leg.payout
                );
            }
            println!(
                "\nGuaranteed return: {:.2} kr\nProfit: {:+.2} kr ({:.2}%)",
                allocation.guaranteed_return, allocation.profit, allocation.profit_percentage
            );
        }
        StakeSplit::NoArbitrage {
            implied_sum,
            margin_percentage,
        } => {
            println!(
                "No arbitrage. Implied probability sum: {:.4} (bookmaker margin {:.2}%)",
                implied_sum, margin_percentage
            );
        }
    }
    Ok(())
}

async fn scan(
    config: &Config,
    sport: Option<String>,
    market: Option<String>,
    stake: Option<f64>,
    csv: Option<String>,
) -> Result<()> {
    let mut query = config.odds_query.clone();
    if let Some(sport) = sport {
        query.sport = sport;
    }
    if let Some(market) = market {
        match MarketKind::from_api_key(&market) {
            Some(kind) => query.markets = vec![kind],
            None => bail!("Unsupported market: {}", market),
        }
    }
    let total_stake = stake.unwrap_or(config.default_stake);

    println!("Scanning {} ({}) for arbitrage...\n", query.sport, query.markets_param());

    let board = load_arbitrage_board(config, &query).await?;
    let arbs = board.opportunities(total_stake);

    if arbs.is_empty() {
        println!("No arbitrage opportunities found in {} games.", board.games.len());
    } else {
        println!("Found {} Arbitrage Opportunities:\n", arbs.len());
        for (i, arb) in arbs.iter().enumerate() {
            println!("{}. {}", i + 1, arb.format());
        }
    }

    if let Some(path) = csv {
        save_arbitrage_to_csv(&arbs, &path)?;
        println!("\nSaved arbitrage opportunities to {}", path);
    }
    Ok(())
}

fn run_log(config: &Config, command: LogCommand) -> Result<()> {
    let store = BetLogStore::new(&config.bet_log_path);
    let mut log = store.load();

    match command {
        LogCommand::Add(args) => {
            let entry = log.add(&args.apply(BetForm::default()))?;
            println!("Added: {}", entry.format());
            store.save(&log)?;
        }
        LogCommand::List(filter) => {
            let entries = log.filtered(&filter.to_filter()?);
            if entries.is_empty() {
                println!("No bets logged.");
            }
            for entry in entries {
                println!("{}", entry.format());
            }
        }
        LogCommand::Settle {
            id,
            result,
            void_amount,
        } => {
            let result: BetResult = result.parse().map_err(anyhow::Error::msg)?;
            let void_amount = parse_amount(void_amount.as_deref().unwrap_or(""))?;
            let entry = log.update_result(id, result, void_amount)?;
            println!("Updated: {}", entry.format());
            store.save(&log)?;
        }
        LogCommand::Edit { id, bet } => {
            let current = log.get(id).with_context(|| format!("No bet with id {}", id))?;
            let form = bet.apply(BetForm::from_entry(current));
            let entry = log.update(id, &form)?;
            println!("Updated: {}", entry.format());
            store.save(&log)?;
        }
        LogCommand::Delete { id } => {
            let removed = log.delete(id)?;
            println!("Deleted: {}", removed.format());
            store.save(&log)?;
        }
        LogCommand::Stats(filter) => print_stats(&log, &filter.to_filter()?),
        LogCommand::Export { path, filter } => {
            let entries = log.filtered(&filter.to_filter()?);
            let count = entries.len();
            save_bets_to_csv(entries, &path)?;
            println!("Exported {} bets to {}", count, path);
        }
    }
    Ok(())
}

fn print_stats(log: &BetLog, filter: &BetFilter) {
    let stats = log.stats(filter);
    println!("Bets:          {}", stats.total);
    println!(
        "Results:       {} won, {} lost, {} void, {} pending",
        stats.won, stats.lost, stats.voids, stats.pending
    );
    println!("Total staked:  {:.2} kr", stats.total_staked);
    println!("Profit:        {:+.2} kr", stats.profit);
    println!("ROI:           {:.2}%", stats.roi);
    println!("Win rate:      {:.2}%", stats.win_rate);

    if let Some(last) = log.running_balance(filter).last() {
        println!("Balance:       {:+.2} kr ({})", last.balance, last.label);
    }
}
