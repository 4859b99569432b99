//! STAKEBOOK — Virtual bankroll and wager settlement engine
//!
//! Tracks a virtual bankroll per automated handicapper, sizes bets with
//! a risk-adjusted Kelly criterion, and settles wagers against final
//! game results. Balances only move through the ledger's settlement
//! path; elimination at zero is permanent.

pub mod config;
pub mod types;
pub mod odds;
pub mod sizing;
pub mod ledger;
pub mod storage;
pub mod engine;
