use crate::error::ArbitrageError;
use crate::models::{BookmakerOdds, Game, MarketKind};
use crate::utils::odds::{implied_probability, is_valid_decimal_odds, overround_percentage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Decimal odds for one outcome, optionally tagged with where to place it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeOdds {
    pub label: String,
    pub bookmaker: Option<String>,
    pub odds: f64,
    pub link: Option<String>,
}

impl OutcomeOdds {
    pub fn new(label: impl Into<String>, odds: f64) -> Self {
        Self {
            label: label.into(),
            bookmaker: None,
            odds,
            link: None,
        }
    }

    pub fn at(mut self, bookmaker: impl Into<String>) -> Self {
        self.bookmaker = Some(bookmaker.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Stake to place on a single outcome
#[derive(Debug, Clone, Serialize)]
pub struct StakeLeg {
    pub label: String,
    pub bookmaker: Option<String>,
    pub link: Option<String>,
    pub odds: f64,
    pub implied_probability: f64,
    pub stake: f64,
    /// What this leg pays back if its outcome happens
    pub payout: f64,
}

impl StakeLeg {
    pub fn bookmaker_name(&self) -> &str {
        self.bookmaker.as_deref().unwrap_or("-")
    }

    pub fn link_or_empty(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }
}

/// Risk-free split of a total stake across all outcomes of a market
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub implied_sum: f64,
    pub total_stake: f64,
    pub legs: Vec<StakeLeg>,
    pub guaranteed_return: f64,
    pub profit: f64,
    pub profit_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub enum StakeSplit {
    Arbitrage(Allocation),
    /// Implied probabilities sum to 1 or more; no risk-free split exists
    NoArbitrage {
        implied_sum: f64,
        margin_percentage: f64,
    },
}

impl StakeSplit {
    pub fn is_arbitrage(&self) -> bool {
        matches!(self, StakeSplit::Arbitrage(_))
    }

    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            StakeSplit::Arbitrage(allocation) => Some(allocation),
            StakeSplit::NoArbitrage { .. } => None,
        }
    }

    pub fn implied_sum(&self) -> f64 {
        match self {
            StakeSplit::Arbitrage(allocation) => allocation.implied_sum,
            StakeSplit::NoArbitrage { implied_sum, .. } => *implied_sum,
        }
    }
}

/// Sum of implied probabilities over the usable odds (odds <= 1 are skipped)
pub fn implied_probability_sum(odds: &[f64]) -> f64 {
    odds.iter().filter_map(|o| implied_probability(*o)).sum()
}

/// Split `total_stake` over the outcomes so that every outcome returns the
/// same amount, `total_stake / Σ(1/odds)`.
///
/// Outcomes with odds <= 1 are treated as unavailable. A stake of zero or
/// less yields an all-zero allocation.
pub fn calculate_stakes(
    outcomes: &[OutcomeOdds],
    total_stake: f64,
) -> Result<StakeSplit, ArbitrageError> {
    if !total_stake.is_finite() {
        return Err(ArbitrageError::InvalidStake(total_stake));
    }

    let valid: Vec<&OutcomeOdds> = outcomes
        .iter()
        .filter(|outcome| {
            let ok = is_valid_decimal_odds(outcome.odds);
            if !ok {
                debug!(label = %outcome.label, odds = outcome.odds, "Skipping unusable odds");
            }
            ok
        })
        .collect();

    if valid.len() < 2 {
        return Err(ArbitrageError::InsufficientOutcomes { valid: valid.len() });
    }

    let implied_sum: f64 = valid.iter().map(|outcome| 1.0 / outcome.odds).sum();

    if implied_sum >= 1.0 {
        return Ok(StakeSplit::NoArbitrage {
            implied_sum,
            margin_percentage: overround_percentage(implied_sum),
        });
    }

    let stake = total_stake.max(0.0);
    let guaranteed_return = stake / implied_sum;

    let legs = valid
        .iter()
        .map(|outcome| {
            let leg_stake = guaranteed_return / outcome.odds;
            StakeLeg {
                label: outcome.label.clone(),
                bookmaker: outcome.bookmaker.clone(),
                link: outcome.link.clone(),
                odds: outcome.odds,
                implied_probability: 1.0 / outcome.odds,
                stake: leg_stake,
                payout: leg_stake * outcome.odds,
            }
        })
        .collect();

    Ok(StakeSplit::Arbitrage(Allocation {
        implied_sum,
        total_stake: stake,
        legs,
        guaranteed_return,
        profit: guaranteed_return - stake,
        profit_percentage: (1.0 / implied_sum - 1.0) * 100.0,
    }))
}

/// A sure bet found across bookmakers for one market of one game
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub market: MarketKind,
    /// Totals point, or the home-team handicap for spreads
    pub line: Option<f64>,
    pub allocation: Allocation,
}

impl ArbitrageOpportunity {
    pub fn profit_percentage(&self) -> f64 {
        self.allocation.profit_percentage
    }

    pub fn market_label(&self) -> String {
        match self.line {
            Some(line) => format!("{} {:+.1}", self.market.label(), line),
            None => self.market.label().to_string(),
        }
    }

    pub fn format(&self) -> String {
        let legs: Vec<String> = self
            .allocation
            .legs
            .iter()
            .map(|leg| {
                format!(
                    "{} ({:.2}) on {} [{:.2} kr]",
                    leg.label,
                    leg.odds,
                    leg.bookmaker_name(),
                    leg.stake
                )
            })
            .collect();

        format!(
            "{} vs {} ({}) | {} | {} | Return: {:.2} kr | Profit: {:.2} kr ({:.2}%)",
            self.home_team,
            self.away_team,
            self.sport_title,
            self.market_label(),
            legs.join(" | "),
            self.allocation.guaranteed_return,
            self.allocation.profit,
            self.profit_percentage()
        )
    }
}

/// Outcomes of one market line, with the best price seen per outcome
struct LineGroup {
    market: MarketKind,
    line: Option<f64>,
    best: Vec<(String, OutcomeOdds)>,
}

impl LineGroup {
    fn offer(&mut self, key: &str, candidate: OutcomeOdds) {
        match self.best.iter_mut().find(|(k, _)| k == key) {
            Some((_, current)) => {
                if candidate.odds > current.odds {
                    *current = candidate;
                }
            }
            None => self.best.push((key.to_string(), candidate)),
        }
    }
}

fn line_key(line: Option<f64>) -> i64 {
    line.map(|l| (l * 100.0).round() as i64).unwrap_or(0)
}

/// Find arbitrage opportunities across all bookmakers' markets.
///
/// Outcomes are grouped per market line: moneyline and both-teams-to-score
/// form one group, totals are grouped by point and spreads by the home
/// team's handicap. The best price per outcome in a group is used.
pub fn find_arbitrage(
    games_with_odds: &[(Game, Vec<BookmakerOdds>)],
    total_stake: f64,
) -> Vec<ArbitrageOpportunity> {
    let mut arbitrage_opportunities = Vec::new();

    for (game, odds_list) in games_with_odds {
        let mut groups: Vec<LineGroup> = Vec::new();

        for bookmaker_odds in odds_list {
            for market in &bookmaker_odds.markets {
                for outcome in &market.outcomes {
                    let line = match market.kind {
                        MarketKind::H2h | MarketKind::Btts => None,
                        MarketKind::Totals => match outcome.point {
                            Some(point) => Some(point),
                            None => continue,
                        },
                        MarketKind::Spreads => match outcome.point {
                            Some(point) if outcome.name == game.home_team => Some(point),
                            Some(point) => Some(-point),
                            None => continue,
                        },
                    };

                    let label = match outcome.point {
                        Some(point) if market.kind == MarketKind::Spreads => {
                            format!("{} {:+.1}", outcome.name, point)
                        }
                        Some(point) => format!("{} {}", outcome.name, point),
                        None => outcome.name.clone(),
                    };

                    let link = outcome
                        .link
                        .clone()
                        .or_else(|| market.link.clone())
                        .or_else(|| bookmaker_odds.link.clone());

                    let mut candidate =
                        OutcomeOdds::new(label, outcome.price).at(&bookmaker_odds.bookmaker);
                    candidate.link = link;

                    let key = line_key(line);
                    let index = match groups
                        .iter()
                        .position(|g| g.market == market.kind && line_key(g.line) == key)
                    {
                        Some(index) => index,
                        None => {
                            groups.push(LineGroup {
                                market: market.kind,
                                line,
                                best: Vec::new(),
                            });
                            groups.len() - 1
                        }
                    };
                    groups[index].offer(&outcome.name, candidate);
                }
            }
        }

        for group in groups {
            // Every outcome of the line needs a live price or the split is not covered
            if let Some((name, _)) = group
                .best
                .iter()
                .find(|(_, best)| !is_valid_decimal_odds(best.odds))
            {
                debug!(game = %game.id, market = group.market.api_key(), outcome = %name, "Skipping market: outcome has no valid price");
                continue;
            }
            let outcomes: Vec<OutcomeOdds> = group.best.into_iter().map(|(_, o)| o).collect();
            match calculate_stakes(&outcomes, total_stake) {
                Ok(StakeSplit::Arbitrage(allocation)) => {
                    arbitrage_opportunities.push(ArbitrageOpportunity {
                        game_id: game.id.clone(),
                        home_team: game.home_team.clone(),
                        away_team: game.away_team.clone(),
                        sport_title: game.sport_title.clone(),
                        commence_time: game.commence_time,
                        market: group.market,
                        line: group.line,
                        allocation,
                    });
                }
                Ok(StakeSplit::NoArbitrage { .. }) => {}
                Err(e) => {
                    debug!(game = %game.id, market = group.market.api_key(), "Skipping market: {}", e);
                }
            }
        }
    }

    // Sort by profit percentage (descending)
    arbitrage_opportunities.sort_by(|a, b| {
        b.profit_percentage()
            .partial_cmp(&a.profit_percentage())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Same game listed twice by the feed
    let mut seen = HashSet::new();
    arbitrage_opportunities.retain(|arb| {
        seen.insert((
            arb.game_id.clone(),
            arb.market,
            line_key(arb.line),
        ))
    });

    arbitrage_opportunities
}

/// Hand-picked two-way pairs shown on the airbitrage page
#[derive(Debug, Clone, Serialize)]
pub struct FeaturedPair {
    pub matchup: String,
    pub league: String,
    pub market: String,
    pub first: OutcomeOdds,
    pub second: OutcomeOdds,
}

impl FeaturedPair {
    pub fn evaluate(&self, total_stake: f64) -> Result<StakeSplit, ArbitrageError> {
        calculate_stakes(&[self.first.clone(), self.second.clone()], total_stake)
    }
}

pub fn featured_pairs() -> Vec<FeaturedPair> {
    vec![
        FeaturedPair {
            matchup: "Manchester City vs Real Madrid".to_string(),
            league: "UEFA Champions League".to_string(),
            market: "Över 2.5 mål".to_string(),
            first: OutcomeOdds::new("Över 2.5", 2.10)
                .at("Bet365")
                .with_link("https://www.bet365.com"),
            second: OutcomeOdds::new("Under 2.5", 2.05)
                .at("Unibet")
                .with_link("https://www.unibet.com"),
        },
        FeaturedPair {
            matchup: "Arsenal vs Bayern München".to_string(),
            league: "UEFA Champions League".to_string(),
            market: "Båda lagen gör mål".to_string(),
            first: OutcomeOdds::new("Ja", 1.95)
                .at("Betfair")
                .with_link("https://www.betfair.com"),
            second: OutcomeOdds::new("Nej", 2.00)
                .at("LeoVegas")
                .with_link("https://www.leovegas.com"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketOdds, OutcomePrice};
    use chrono::TimeZone;

    fn pair(o1: f64, o2: f64) -> Vec<OutcomeOdds> {
        vec![
            OutcomeOdds::new("A", o1).at("Bet365"),
            OutcomeOdds::new("B", o2).at("Unibet"),
        ]
    }

    #[test]
    fn test_two_way_split() {
        let split = calculate_stakes(&pair(2.10, 2.05), 1000.0).unwrap();
        let allocation = split.allocation().expect("2.10/2.05 is an arbitrage");

        assert!((allocation.implied_sum - 0.96400).abs() < 1e-4);
        assert!((allocation.legs[0].stake - 493.98).abs() < 0.01);
        assert!((allocation.legs[1].stake - 506.02).abs() < 0.01);
        assert!((allocation.guaranteed_return - 1037.35).abs() < 0.01);
        assert!((allocation.profit - 37.35).abs() < 0.01);
        assert!((allocation.profit_percentage - 3.735).abs() < 0.01);
    }

    #[test]
    fn test_equal_returns_across_outcomes() {
        let cases: Vec<Vec<f64>> = vec![
            vec![2.10, 2.05],
            vec![3.0, 3.2, 3.4],
            vec![1.5, 3.5],
            vec![4.2, 3.9, 2.2],
        ];

        for odds in cases {
            let outcomes: Vec<OutcomeOdds> = odds
                .iter()
                .enumerate()
                .map(|(i, o)| OutcomeOdds::new(format!("O{}", i), *o))
                .collect();
            let split = calculate_stakes(&outcomes, 500.0).unwrap();
            let allocation = split.allocation().expect("odds chosen to be an arbitrage");
            let expected = 500.0 / implied_probability_sum(&odds);

            for leg in &allocation.legs {
                assert!((leg.payout - expected).abs() < 1e-6);
            }
            let staked: f64 = allocation.legs.iter().map(|leg| leg.stake).sum();
            assert!((staked - 500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_arbitrage_reported() {
        let split = calculate_stakes(&pair(1.95, 2.00), 1000.0).unwrap();
        assert!(!split.is_arbitrage());
        assert!(split.allocation().is_none());
        match split {
            StakeSplit::NoArbitrage {
                implied_sum,
                margin_percentage,
            } => {
                assert!(implied_sum >= 1.0);
                assert!((margin_percentage - 1.282).abs() < 0.01);
            }
            StakeSplit::Arbitrage(_) => panic!("expected no arbitrage"),
        }

        // Exactly fair book is not an arbitrage either
        let split = calculate_stakes(&pair(2.0, 2.0), 1000.0).unwrap();
        assert!(!split.is_arbitrage());
    }

    #[test]
    fn test_invalid_odds_are_skipped() {
        let outcomes = vec![
            OutcomeOdds::new("A", 2.2),
            OutcomeOdds::new("B", 1.0),
            OutcomeOdds::new("C", 2.3),
        ];
        let split = calculate_stakes(&outcomes, 100.0).unwrap();
        let allocation = split.allocation().unwrap();
        assert_eq!(allocation.legs.len(), 2);
        assert_eq!(allocation.legs[1].label, "C");
    }

    #[test]
    fn test_fewer_than_two_valid_outcomes() {
        let outcomes = vec![OutcomeOdds::new("A", 2.2), OutcomeOdds::new("B", 0.5)];
        assert_eq!(
            calculate_stakes(&outcomes, 100.0).unwrap_err(),
            ArbitrageError::InsufficientOutcomes { valid: 1 }
        );
        assert!(calculate_stakes(&[], 100.0).is_err());
    }

    #[test]
    fn test_non_positive_stake_gives_zero_allocation() {
        for stake in [0.0, -50.0] {
            let split = calculate_stakes(&pair(2.10, 2.05), stake).unwrap();
            let allocation = split.allocation().unwrap();
            assert!(allocation.legs.iter().all(|leg| leg.stake == 0.0));
            assert_eq!(allocation.guaranteed_return, 0.0);
            assert_eq!(allocation.profit, 0.0);
            assert!(allocation.profit_percentage > 0.0);
        }

        assert!(matches!(
            calculate_stakes(&pair(2.10, 2.05), f64::NAN),
            Err(ArbitrageError::InvalidStake(_))
        ));
    }

    #[test]
    fn test_featured_pairs() {
        let pairs = featured_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].evaluate(1000.0).unwrap().is_arbitrage());
        assert!(!pairs[1].evaluate(1000.0).unwrap().is_arbitrage());
    }

    fn game() -> Game {
        Game {
            id: "g1".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            commence_time: Utc.with_ymd_and_hms(2030, 1, 1, 15, 0, 0).unwrap(),
            sport_title: "EPL".to_string(),
        }
    }

    fn book(name: &str, kind: MarketKind, outcomes: &[(&str, Option<f64>, f64)]) -> BookmakerOdds {
        BookmakerOdds {
            game_id: "g1".to_string(),
            bookmaker: name.to_string(),
            last_update: Utc.with_ymd_and_hms(2029, 12, 31, 12, 0, 0).unwrap(),
            link: None,
            markets: vec![MarketOdds {
                kind,
                outcomes: outcomes
                    .iter()
                    .map(|(n, point, price)| OutcomePrice {
                        name: n.to_string(),
                        point: *point,
                        price: *price,
                        link: None,
                    })
                    .collect(),
                link: None,
            }],
        }
    }

    #[test]
    fn test_find_three_way_moneyline_arbitrage() {
        let odds = vec![
            book(
                "Bet365",
                MarketKind::H2h,
                &[("Arsenal", None, 2.6), ("Chelsea", None, 2.9), ("Draw", None, 3.2)],
            ),
            book(
                "Unibet",
                MarketKind::H2h,
                &[("Arsenal", None, 2.4), ("Chelsea", None, 3.4), ("Draw", None, 3.9)],
            ),
        ];

        let arbs = find_arbitrage(&[(game(), odds)], 100.0);
        assert_eq!(arbs.len(), 1);
        let legs = &arbs[0].allocation.legs;
        assert_eq!(legs.len(), 3);
        assert_eq!(legs[0].bookmaker.as_deref(), Some("Bet365"));
        assert_eq!(legs[1].bookmaker.as_deref(), Some("Unibet"));
        assert_eq!(legs[2].bookmaker.as_deref(), Some("Unibet"));
        assert!(arbs[0].profit_percentage() > 0.0);
    }

    #[test]
    fn test_totals_grouped_by_point() {
        let odds = vec![
            book(
                "Bet365",
                MarketKind::Totals,
                &[("Over", Some(2.5), 2.10), ("Under", Some(2.5), 1.75)],
            ),
            book(
                "Unibet",
                MarketKind::Totals,
                &[("Over", Some(3.5), 3.00), ("Under", Some(2.5), 2.05)],
            ),
        ];

        let arbs = find_arbitrage(&[(game(), odds)], 1000.0);
        assert_eq!(arbs.len(), 1);
        assert_eq!(arbs[0].line, Some(2.5));
        assert_eq!(arbs[0].allocation.legs.len(), 2);
    }

    #[test]
    fn test_spreads_pair_opposite_lines() {
        let odds = vec![
            book(
                "Bet365",
                MarketKind::Spreads,
                &[("Arsenal", Some(-1.5), 2.15), ("Chelsea", Some(1.5), 1.70)],
            ),
            book(
                "Unibet",
                MarketKind::Spreads,
                &[("Arsenal", Some(-1.5), 1.80), ("Chelsea", Some(1.5), 2.05)],
            ),
        ];

        let arbs = find_arbitrage(&[(game(), odds)], 1000.0);
        assert_eq!(arbs.len(), 1);
        assert_eq!(arbs[0].line, Some(-1.5));
        assert!(arbs[0].format().contains("Arsenal -1.5"));
    }

    #[test]
    fn test_suspended_outcome_blocks_market() {
        let odds = vec![
            book(
                "Bet365",
                MarketKind::H2h,
                &[("Arsenal", None, 2.5), ("Chelsea", None, 2.8), ("Draw", None, 1.0)],
            ),
            book(
                "Unibet",
                MarketKind::H2h,
                &[("Arsenal", None, 2.4), ("Chelsea", None, 2.7)],
            ),
        ];
        assert!(find_arbitrage(&[(game(), odds.clone())], 1000.0).is_empty());

        // A valid Draw price anywhere covers the line again
        let mut odds = odds;
        odds.push(book("Betfair", MarketKind::H2h, &[("Draw", None, 9.0)]));
        let arbs = find_arbitrage(&[(game(), odds)], 1000.0);
        assert_eq!(arbs.len(), 1);
        assert_eq!(arbs[0].allocation.legs.len(), 3);
    }

    #[test]
    fn test_no_arbitrage_in_efficient_market() {
        let odds = vec![
            book("Bet365", MarketKind::H2h, &[("Arsenal", None, 1.9), ("Chelsea", None, 1.9)]),
            book("Unibet", MarketKind::H2h, &[("Arsenal", None, 1.95), ("Chelsea", None, 1.85)]),
        ];
        assert!(find_arbitrage(&[(game(), odds)], 1000.0).is_empty());
    }
}
