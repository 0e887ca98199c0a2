use betting_paradise::bet_log::{BetFilter, BetLog};
use betting_paradise::data::{save_bets_to_csv, BetLogStore};
use betting_paradise::error::{BetLogError, ValidationError};
use betting_paradise::{BetForm, BetResult};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("betting_paradise_it_{}", uuid::Uuid::new_v4()))
        .join(name)
}

fn form(date: &str, league: &str, odds: &str, stake: &str, bookmaker: &str) -> BetForm {
    BetForm {
        date: date.to_string(),
        home_team: "Malmö FF".to_string(),
        away_team: "IFK Göteborg".to_string(),
        league: league.to_string(),
        bet_type: "1X2".to_string(),
        odds: odds.to_string(),
        stake: stake.to_string(),
        bookmaker: bookmaker.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_log_survives_restart() {
    let path = temp_path("bets.json");
    let store = BetLogStore::new(&path);

    let mut log = store.load();
    assert!(log.is_empty());

    let won = log.add(&form("2025-04-01", "Allsvenskan", "2.0", "100", "Unibet")).unwrap().id;
    let lost = log.add(&form("2025-04-08", "Allsvenskan", "3.5", "50", "Bet365")).unwrap().id;
    let void = log.add(&form("2025-04-15", "Superettan", "1.8", "50", "Bet365")).unwrap().id;
    log.add(&form("2025-04-22", "Allsvenskan", "1.5", "200", "Unibet")).unwrap();

    log.update_result(won, BetResult::Won, None).unwrap();
    log.update_result(lost, BetResult::Lost, None).unwrap();
    log.update_result(void, BetResult::Void, Some(-10.0)).unwrap();
    store.save(&log).unwrap();

    // A fresh store on the same path sees the same list
    let reloaded = BetLogStore::new(&path).load();
    assert_eq!(reloaded, log);

    let stats = reloaded.stats(&BetFilter::default());
    assert_eq!(stats.total, 4);
    assert_eq!(stats.pending, 1);
    assert!((stats.total_staked - 200.0).abs() < 1e-9);
    assert!((stats.profit - 40.0).abs() < 1e-9);
    assert!((stats.roi - 20.0).abs() < 1e-9);
    assert!((stats.win_rate - 50.0).abs() < 1e-9);

    let balance = reloaded.running_balance(&BetFilter::default());
    let values: Vec<f64> = balance.iter().map(|p| p.balance).collect();
    assert_eq!(values, vec![100.0, 50.0, 40.0, 40.0]);

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_filtered_view_maps_back_by_id() {
    let mut log = BetLog::default();
    // Two identical bets; settling one must not touch the other
    let first = log.add(&form("2025-05-01", "Allsvenskan", "2.0", "100", "Unibet")).unwrap().id;
    let second = log.add(&form("2025-05-01", "Allsvenskan", "2.0", "100", "Unibet")).unwrap().id;

    let filter = BetFilter::from_query(None, None, Some("allsv"), Some("Unibet")).unwrap();
    let visible: Vec<_> = log.filtered(&filter).iter().map(|e| e.id).collect();
    assert_eq!(visible, vec![first, second]);

    log.update_result(visible[1], BetResult::Won, None).unwrap();
    assert_eq!(log.get(first).unwrap().result, BetResult::Pending);
    assert_eq!(log.get(second).unwrap().result, BetResult::Won);

    log.delete(first).unwrap();
    assert_eq!(log.len(), 1);
    assert!(matches!(log.delete(first), Err(BetLogError::NotFound(_))));
}

#[test]
fn test_rejected_bet_is_not_saved() {
    let path = temp_path("bets.json");
    let store = BetLogStore::new(&path);
    let mut log = store.load();

    let err = log.add(&form("2025-04-01", "", "2.0", "", "")).unwrap_err();
    assert!(matches!(err, ValidationError::MissingFields(_)));
    assert!(log.is_empty());

    let err = log.add(&form("2025-04-01", "", "0.95", "100", "")).unwrap_err();
    assert!(matches!(err, ValidationError::OddsTooLow(_)));
    assert!(log.is_empty());
}

#[test]
fn test_export_filtered_csv() {
    let mut log = BetLog::default();
    log.add(&form("2025-04-01", "Allsvenskan", "2.0", "100", "Unibet")).unwrap();
    log.add(&form("2025-06-01", "Allsvenskan", "2.0", "100", "Bet365")).unwrap();

    let filter = BetFilter::from_query(Some("2025-05-01"), None, None, None).unwrap();
    let path = temp_path("export.csv");
    save_bets_to_csv(log.filtered(&filter), path.to_str().unwrap()).unwrap();

    let csv = std::fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("2025-06-01"));
    assert!(!csv.contains("2025-04-01"));

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}
