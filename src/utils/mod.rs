pub mod arbitrage;
pub mod bet_log;
pub mod data;
pub mod odds;
