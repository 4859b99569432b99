//! Bet placement.
//!
//! Validates incoming predictions, checks agent eligibility, sizes the
//! stake, and persists the pending wager — all inside the agent's
//! critical section so a concurrent settlement cannot move the balance
//! between the sizing read and the wager write.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::BankrollLedger;
use crate::odds::AmericanOdds;
use crate::sizing::{SizingEngine, SkipReason};
use crate::storage::Store;
use crate::types::{Archetype, BetCategory, Prediction, StakebookError, Wager, WagerResult};

// ---------------------------------------------------------------------------
// Agent registry
// ---------------------------------------------------------------------------

/// Source of agent personality archetypes. Unregistered agents get
/// `Archetype::Unknown` (conservative multiplier) rather than an error.
pub trait AgentRegistry: Send + Sync {
    fn archetype(&self, agent_id: &str) -> Archetype;
}

/// Fixed registry built from a name → archetype table.
#[derive(Default)]
pub struct StaticRegistry {
    agents: HashMap<String, Archetype>,
}

impl StaticRegistry {
    pub fn new(agents: HashMap<String, Archetype>) -> Self {
        Self { agents }
    }
}

impl AgentRegistry for StaticRegistry {
    fn archetype(&self, agent_id: &str) -> Archetype {
        self.agents.get(agent_id).copied().unwrap_or(Archetype::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Confirmation of a persisted pending wager.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub wager_id: String,
    pub agent_id: String,
    pub game_id: String,
    pub amount: Decimal,
    pub odds: AmericanOdds,
    pub fraction: Decimal,
    pub edge: Decimal,
}

/// A placement either produces a wager or a structured skip. Skips are
/// normal business outcomes, not errors.
#[derive(Debug)]
pub enum PlacementOutcome {
    Placed(Receipt),
    Skipped { agent_id: String, reason: SkipReason },
}

/// One prediction that failed with a real error during a batch.
#[derive(Debug)]
pub struct PlacementFailure {
    pub agent_id: String,
    pub game_id: String,
    pub error: StakebookError,
}

/// Batch placement summary.
#[derive(Debug, Default)]
pub struct PlacementReport {
    pub placed: Vec<Receipt>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<PlacementFailure>,
    pub total_staked: Decimal,
}

// ---------------------------------------------------------------------------
// Placer
// ---------------------------------------------------------------------------

pub struct BetPlacer {
    ledger: Arc<BankrollLedger>,
    sizing: SizingEngine,
    registry: Arc<dyn AgentRegistry>,
}

impl BetPlacer {
    pub fn new(
        ledger: Arc<BankrollLedger>,
        sizing: SizingEngine,
        registry: Arc<dyn AgentRegistry>,
    ) -> Self {
        Self {
            ledger,
            sizing,
            registry,
        }
    }

    /// Place one bet from a prediction.
    ///
    /// Validation failures and unknown agents are errors; an eliminated
    /// agent or a sizing rejection is a `Skipped` outcome.
    pub async fn place(&self, prediction: &Prediction) -> Result<PlacementOutcome, StakebookError> {
        let odds = Self::validate(prediction)?;
        let agent_id = &prediction.agent_id;
        let archetype = self.registry.archetype(agent_id);

        let _guard = self.ledger.lock_agent(agent_id).await;
        let bankroll = self.ledger.get(agent_id).await?;

        if !bankroll.is_active() {
            debug!(agent_id, game_id = %prediction.game_id, "Eliminated agent, bet skipped");
            return Ok(PlacementOutcome::Skipped {
                agent_id: agent_id.clone(),
                reason: SkipReason::Eliminated,
            });
        }

        let decision = self.sizing.size_bet(
            prediction.confidence,
            &odds,
            archetype,
            bankroll.current_balance,
        );
        if !decision.should_bet {
            let reason = decision.reason.unwrap_or(SkipReason::NoBankroll);
            debug!(agent_id, game_id = %prediction.game_id, %reason, "Bet skipped");
            return Ok(PlacementOutcome::Skipped {
                agent_id: agent_id.clone(),
                reason,
            });
        }

        let wager = Wager {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.clone(),
            game_id: prediction.game_id.clone(),
            category: BetCategory::parse(&prediction.category),
            amount: decision.amount,
            odds,
            confidence: prediction.confidence,
            result: WagerResult::Pending,
            balance_before: bankroll.current_balance,
            balance_after: None,
            payout: Decimal::ZERO,
            kelly_fraction: decision.kelly_fraction,
            multiplier: decision.multiplier,
            edge: decision.edge,
            reasoning: prediction.reasoning.clone(),
            placed_at: Utc::now(),
            settled_at: None,
        };
        self.ledger.store().insert_wager(&wager).await?;

        info!(
            agent_id,
            wager_id = %wager.id,
            game_id = %wager.game_id,
            category = %wager.category,
            amount = %format!("${:.2}", wager.amount),
            odds = %wager.odds,
            "Bet placed"
        );

        Ok(PlacementOutcome::Placed(Receipt {
            wager_id: wager.id,
            agent_id: agent_id.clone(),
            game_id: wager.game_id,
            amount: wager.amount,
            odds: wager.odds,
            fraction: decision.fraction,
            edge: decision.edge,
        }))
    }

    /// Place a batch of predictions with per-item isolation: one bad
    /// prediction never blocks the rest of the slate.
    pub async fn place_all(&self, predictions: &[Prediction]) -> PlacementReport {
        let mut report = PlacementReport::default();
        for prediction in predictions {
            match self.place(prediction).await {
                Ok(PlacementOutcome::Placed(receipt)) => {
                    report.total_staked += receipt.amount;
                    report.placed.push(receipt);
                }
                Ok(PlacementOutcome::Skipped { agent_id, reason }) => {
                    report.skipped.push((agent_id, reason));
                }
                Err(e) => {
                    warn!(
                        agent_id = %prediction.agent_id,
                        game_id = %prediction.game_id,
                        error = %e,
                        "Placement failed"
                    );
                    report.failed.push(PlacementFailure {
                        agent_id: prediction.agent_id.clone(),
                        game_id: prediction.game_id.clone(),
                        error: e,
                    });
                }
            }
        }
        info!(
            placed = report.placed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            total_staked = %report.total_staked,
            "Placement batch complete"
        );
        report
    }

    fn validate(prediction: &Prediction) -> Result<AmericanOdds, StakebookError> {
        if prediction.agent_id.trim().is_empty() {
            return Err(StakebookError::Validation("agent_id is empty".to_string()));
        }
        if prediction.game_id.trim().is_empty() {
            return Err(StakebookError::Validation("game_id is empty".to_string()));
        }
        if prediction.confidence < Decimal::ZERO || prediction.confidence > Decimal::ONE {
            return Err(StakebookError::Validation(format!(
                "confidence {} outside [0, 1]",
                prediction.confidence
            )));
        }
        prediction.odds.parse()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
