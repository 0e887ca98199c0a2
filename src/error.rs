use thiserror::Error;
use uuid::Uuid;

/// Rejected bet-log form input. Messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Fyll i datum, lag, odds och insats.")]
    MissingFields(Vec<&'static str>),
    #[error("Ogiltigt datum: {0} (använd ÅÅÅÅ-MM-DD)")]
    InvalidDate(String),
    #[error("Ogiltigt värde för {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Odds måste vara större än 1 (fick {0})")]
    OddsTooLow(f64),
    #[error("Insatsen måste vara större än 0 (fick {0})")]
    StakeNotPositive(f64),
    #[error("Okänt resultat: {0}")]
    InvalidResult(String),
}

#[derive(Debug, Error)]
pub enum BetLogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No bet with id {0}")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArbitrageError {
    #[error("At least two outcomes with odds above 1 are required, got {valid}")]
    InsufficientOutcomes { valid: usize },
    #[error("Stake must be a finite number, got {0}")]
    InvalidStake(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
