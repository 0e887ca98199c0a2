use betting_paradise::config::Config;
use betting_paradise::data::save_to_cache;
use betting_paradise::{
    fetch_odds, load_arbitrage_board, BookmakerOdds, Game, MarketKind, MarketOdds, OutcomePrice,
};
use chrono::{Duration, Utc};

fn cached_config(cache_dir: &str) -> Config {
    let cache_dir = cache_dir.to_string();
    Config::from_lookup(move |key| match key {
        "USE_CACHE" => Some("1".to_string()),
        "CACHE_DIR" => Some(cache_dir.clone()),
        _ => None,
    })
    .unwrap()
}

fn bookmaker(name: &str, home: f64, away: f64) -> BookmakerOdds {
    BookmakerOdds {
        game_id: "g1".to_string(),
        bookmaker: name.to_string(),
        last_update: Utc::now(),
        link: Some(format!("https://{}.example", name.to_lowercase())),
        markets: vec![MarketOdds {
            kind: MarketKind::H2h,
            outcomes: vec![
                OutcomePrice {
                    name: "Frölunda".to_string(),
                    point: None,
                    price: home,
                    link: None,
                },
                OutcomePrice {
                    name: "Färjestad".to_string(),
                    point: None,
                    price: away,
                    link: None,
                },
            ],
            link: None,
        }],
    }
}

#[tokio::test]
async fn test_board_from_cache() {
    let cache_dir = std::env::temp_dir().join(format!("betting_paradise_cache_{}", uuid::Uuid::new_v4()));
    let cache_dir_str = cache_dir.to_str().unwrap();
    let mut config = cached_config(cache_dir_str);
    config.odds_query.sport = "icehockey_sweden_hockey_league".to_string();

    let game = Game {
        id: "g1".to_string(),
        home_team: "Frölunda".to_string(),
        away_team: "Färjestad".to_string(),
        commence_time: Utc::now() + Duration::days(1),
        sport_title: "SHL".to_string(),
    };
    let games = vec![(
        game,
        vec![bookmaker("Unibet", 2.15, 1.80), bookmaker("Betsson", 1.85, 2.10)],
    )];
    save_to_cache(&games, &config.odds_query.cache_file(&config.cache_dir)).unwrap();

    // No API key needed when the cache is used
    let loaded = fetch_odds(&config, &config.odds_query).await.unwrap();
    assert_eq!(loaded.len(), 1);

    let board = load_arbitrage_board(&config, &config.odds_query).await.unwrap();
    let arbs = board.opportunities(1000.0);
    assert_eq!(arbs.len(), 1);

    let legs = &arbs[0].allocation.legs;
    assert_eq!(legs[0].bookmaker.as_deref(), Some("Unibet"));
    assert_eq!(legs[1].bookmaker.as_deref(), Some("Betsson"));
    assert_eq!(legs[0].link.as_deref(), Some("https://unibet.example"));
    // 1/2.15 + 1/2.10 < 1
    assert!(arbs[0].profit_percentage() > 0.0);
    let payouts: Vec<f64> = legs.iter().map(|leg| leg.payout).collect();
    assert!((payouts[0] - payouts[1]).abs() < 1e-6);

    std::fs::remove_dir_all(&cache_dir).ok();
}

#[tokio::test]
async fn test_missing_key_without_cache() {
    let config = Config::from_lookup(|_| None).unwrap();
    let err = fetch_odds(&config, &config.odds_query).await.unwrap_err();
    assert!(err.to_string().contains("ODDS_API_KEY"));
}
