/// Convert decimal odds to implied probability.
/// Returns None for odds that cannot be a real price (<= 1, NaN, infinite).
pub fn implied_probability(decimal_odds: f64) -> Option<f64> {
    if is_valid_decimal_odds(decimal_odds) {
        Some(1.0 / decimal_odds)
    } else {
        None
    }
}

/// Decimal odds must be finite and strictly greater than 1
pub fn is_valid_decimal_odds(decimal_odds: f64) -> bool {
    decimal_odds.is_finite() && decimal_odds > 1.0
}

/// Convert American odds to decimal odds
/// Positive odds (+150) mean you win $150 on a $100 bet -> 2.50
/// Negative odds (-150) mean you need to bet $150 to win $100 -> 1.67
pub fn american_to_decimal(odds: f64) -> f64 {
    if odds > 0.0 {
        1.0 + odds / 100.0
    } else {
        1.0 + 100.0 / odds.abs()
    }
}

/// Bookmaker margin (overround) of a full market in percent.
/// Negative values mean the market is an arbitrage.
pub fn overround_percentage(implied_sum: f64) -> f64 {
    (implied_sum - 1.0) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implied_probability() {
        let prob = implied_probability(2.0).unwrap();
        assert!((prob - 0.5).abs() < 1e-9);

        let prob = implied_probability(4.0).unwrap();
        assert!((prob - 0.25).abs() < 1e-9);

        assert!(implied_probability(1.0).is_none());
        assert!(implied_probability(0.0).is_none());
        assert!(implied_probability(-2.0).is_none());
        assert!(implied_probability(f64::NAN).is_none());
        assert!(implied_probability(f64::INFINITY).is_none());
    }

    #[test]
    fn test_american_to_decimal() {
        assert!((american_to_decimal(150.0) - 2.5).abs() < 0.01);
        assert!((american_to_decimal(-150.0) - 1.667).abs() < 0.01);
        assert!((american_to_decimal(100.0) - 2.0).abs() < 0.01);
        assert!((american_to_decimal(-110.0) - 1.909).abs() < 0.01);
    }

    #[test]
    fn test_overround_percentage() {
        // Typical bookmaker market 1.91 / 1.91
        let sum = 1.0 / 1.91 + 1.0 / 1.91;
        assert!(overround_percentage(sum) > 4.0);
        assert!(overround_percentage(0.98) < 0.0);
    }
}
