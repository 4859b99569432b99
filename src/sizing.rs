//! Kelly criterion bet sizing.
//!
//! Computes risk-adjusted stake sizes from a prediction's confidence
//! and the market's American odds, with archetype multipliers and
//! safety caps. Pure arithmetic — no I/O, no locking, so it can run
//! with unbounded parallelism and is trivially unit-testable.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::odds::AmericanOdds;
use crate::types::Archetype;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sizing thresholds and caps.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Minimum confidence to consider a bet at all.
    pub min_confidence: Decimal,
    /// Minimum edge over the market-implied probability.
    pub min_edge: Decimal,
    /// Hard cap on the bankroll fraction, applied before and after the
    /// archetype multiplier.
    pub max_bet_fraction: Decimal,
    /// Smallest stake worth placing.
    pub min_bet_amount: Decimal,
    /// Largest stake the book accepts.
    pub max_bet_amount: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            min_confidence: dec!(0.70),
            min_edge: dec!(0.02),
            max_bet_fraction: dec!(0.30),
            min_bet_amount: dec!(5.00),
            max_bet_amount: dec!(50000.00),
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Machine-readable reason a bet was not (or would not be) placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// Confidence below the minimum threshold.
    LowConfidence { confidence: Decimal, min: Decimal },
    /// No bankroll left to stake from.
    NoBankroll,
    /// Edge over the market too thin to be worth the variance.
    ThinEdge { edge: Decimal, min: Decimal },
    /// Sized amount fell below the minimum stake.
    BelowMinimum { amount: Decimal, min: Decimal },
    /// Agent has been eliminated (used by the placer, never by sizing).
    Eliminated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LowConfidence { confidence, min } => {
                write!(f, "confidence {confidence} below minimum {min}")
            }
            SkipReason::NoBankroll => write!(f, "no bankroll available"),
            SkipReason::ThinEdge { edge, min } => {
                write!(f, "edge {edge} below minimum {min}")
            }
            SkipReason::BelowMinimum { amount, min } => {
                write!(f, "sized amount {amount} below minimum bet {min}")
            }
            SkipReason::Eliminated => write!(f, "agent eliminated"),
        }
    }
}

/// Full sizing decision, retained on the wager for audit.
#[derive(Debug, Clone)]
pub struct SizingDecision {
    pub should_bet: bool,
    /// Final stake in currency, zero when skipped.
    pub amount: Decimal,
    /// Bankroll fraction after multiplier and caps.
    pub fraction: Decimal,
    /// Raw Kelly fraction before the archetype multiplier.
    pub kelly_fraction: Decimal,
    pub multiplier: Decimal,
    /// Confidence minus market-implied probability.
    pub edge: Decimal,
    pub decimal_odds: Decimal,
    /// `Some` exactly when `should_bet` is false.
    pub reason: Option<SkipReason>,
}

impl SizingDecision {
    fn skip(reason: SkipReason, edge: Decimal, decimal_odds: Decimal, multiplier: Decimal) -> Self {
        Self {
            should_bet: false,
            amount: Decimal::ZERO,
            fraction: Decimal::ZERO,
            kelly_fraction: Decimal::ZERO,
            multiplier,
            edge,
            decimal_odds,
            reason: Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Sizing engine
// ---------------------------------------------------------------------------

pub struct SizingEngine {
    config: SizingConfig,
}

impl SizingEngine {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Access the sizing configuration.
    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Size a bet with the Kelly criterion.
    ///
    /// Kelly formula: f* = (bp - q) / b
    /// where:
    ///   b = decimal odds − 1 (net payout ratio)
    ///   p = confidence
    ///   q = 1 - p
    ///
    /// The raw fraction is clamped to `max_bet_fraction`, scaled by the
    /// archetype multiplier, re-clamped, then converted to a currency
    /// amount (half-up to cents) inside [min_bet, max_bet].
    pub fn size_bet(
        &self,
        confidence: Decimal,
        odds: &AmericanOdds,
        archetype: Archetype,
        bankroll: Decimal,
    ) -> SizingDecision {
        let multiplier = archetype.multiplier();
        let decimal_odds = odds.decimal_odds();
        let implied = odds.implied_probability();
        let edge = confidence - implied;

        if confidence < self.config.min_confidence {
            debug!(%confidence, min = %self.config.min_confidence, "Confidence below minimum");
            return SizingDecision::skip(
                SkipReason::LowConfidence {
                    confidence,
                    min: self.config.min_confidence,
                },
                edge,
                decimal_odds,
                multiplier,
            );
        }

        if bankroll <= Decimal::ZERO {
            debug!(%bankroll, "No bankroll to size from");
            return SizingDecision::skip(SkipReason::NoBankroll, edge, decimal_odds, multiplier);
        }

        if edge < self.config.min_edge {
            debug!(%edge, min = %self.config.min_edge, "Edge below minimum");
            return SizingDecision::skip(
                SkipReason::ThinEdge {
                    edge,
                    min: self.config.min_edge,
                },
                edge,
                decimal_odds,
                multiplier,
            );
        }

        // Raw Kelly, clamped to [0, max_bet_fraction]
        let b = decimal_odds - Decimal::ONE;
        let p = confidence;
        let q = Decimal::ONE - p;
        let kelly = ((b * p - q) / b)
            .clamp(Decimal::ZERO, self.config.max_bet_fraction);

        // Archetype adjustment, re-clamped to the same cap
        let fraction = (kelly * multiplier)
            .clamp(Decimal::ZERO, self.config.max_bet_fraction);

        let amount = (bankroll * fraction)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .min(self.config.max_bet_amount);

        if amount < self.config.min_bet_amount {
            debug!(%amount, min = %self.config.min_bet_amount, "Sized amount below minimum bet");
            return SizingDecision::skip(
                SkipReason::BelowMinimum {
                    amount,
                    min: self.config.min_bet_amount,
                },
                edge,
                decimal_odds,
                multiplier,
            );
        }

        debug!(
            kelly = %kelly,
            fraction = %fraction,
            amount = %format!("${amount:.2}"),
            edge = %edge,
            odds = %odds,
            archetype = %archetype,
            "Bet sized"
        );

        SizingDecision {
            should_bet: true,
            amount,
            fraction,
            kelly_fraction: kelly,
            multiplier,
            edge,
            decimal_odds,
            reason: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
