//! Wager settlement.
//!
//! Grades wagers against final game results, pays out through the
//! ledger, and persists the terminal wager state. Settlement is
//! idempotent: re-settling an already-terminal wager echoes the stored
//! outcome without touching the bankroll again.

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ledger::BankrollLedger;
use crate::storage::Store;
use crate::types::{
    BetCategory, GameResult, SpreadOutcome, StakebookError, TeamSide, TotalOutcome, TotalSide,
    Wager, WagerResult, WinnerOutcome,
};

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// Grade a bet category against a final game result.
///
/// Fail-safe: an unrecognized category grades as a loss rather than
/// hanging forever in pending, so bankrolls always reconcile.
pub fn grade(category: &BetCategory, result: &GameResult) -> WagerResult {
    match category {
        BetCategory::Spread(side) => match (result.spread_result, side) {
            (SpreadOutcome::Push, _) => WagerResult::Push,
            (SpreadOutcome::HomeCovered, TeamSide::Home) => WagerResult::Won,
            (SpreadOutcome::AwayCovered, TeamSide::Away) => WagerResult::Won,
            _ => WagerResult::Lost,
        },
        BetCategory::Total(side) => match (result.total_result, side) {
            (TotalOutcome::Push, _) => WagerResult::Push,
            (TotalOutcome::Over, TotalSide::Over) => WagerResult::Won,
            (TotalOutcome::Under, TotalSide::Under) => WagerResult::Won,
            _ => WagerResult::Lost,
        },
        BetCategory::Moneyline(side) => match (result.winner, side) {
            (WinnerOutcome::Tie, _) => WagerResult::Push,
            (WinnerOutcome::Home, TeamSide::Home) => WagerResult::Won,
            (WinnerOutcome::Away, TeamSide::Away) => WagerResult::Won,
            _ => WagerResult::Lost,
        },
        BetCategory::Other(raw) => {
            warn!(category = %raw, game_id = %result.game_id, "Unknown category graded as loss");
            WagerResult::Lost
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of settling one wager.
#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub wager_id: String,
    pub agent_id: String,
    pub result: WagerResult,
    pub amount: Decimal,
    pub payout: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    /// True only on the settlement that zeroed the bankroll.
    pub was_eliminated: bool,
    /// True when this call found the wager already terminal and echoed
    /// the stored outcome instead of paying out again.
    pub already_settled: bool,
}

/// One wager that failed to settle during a game batch.
#[derive(Debug)]
pub struct SettlementFailure {
    pub wager_id: String,
    pub agent_id: String,
    pub error: StakebookError,
}

/// Per-game batch settlement summary.
#[derive(Debug, Default)]
pub struct SettlementReport {
    pub settled: Vec<SettlementResult>,
    pub failed: Vec<SettlementFailure>,
}

// ---------------------------------------------------------------------------
// Settler
// ---------------------------------------------------------------------------

pub struct BetSettler {
    ledger: Arc<BankrollLedger>,
}

impl BetSettler {
    pub fn new(ledger: Arc<BankrollLedger>) -> Self {
        Self { ledger }
    }

    /// Settle a single wager against a final game result.
    pub async fn settle(
        &self,
        wager_id: &str,
        game_result: &GameResult,
    ) -> Result<SettlementResult, StakebookError> {
        // First read only tells us which agent to lock; the state we
        // act on is re-read under the lock.
        let agent_id = self
            .ledger
            .store()
            .get_wager(wager_id)
            .await?
            .ok_or_else(|| StakebookError::WagerNotFound(wager_id.to_string()))?
            .agent_id;

        let outcome = {
            let _guard = self.ledger.lock_agent(&agent_id).await;
            let wager = self
                .ledger
                .store()
                .get_wager(wager_id)
                .await?
                .ok_or_else(|| StakebookError::WagerNotFound(wager_id.to_string()))?;

            if wager.is_terminal() {
                info!(wager_id, agent_id = %wager.agent_id, "Wager already settled, echoing");
                return Ok(Self::echo(&wager));
            }

            let result = grade(&wager.category, game_result);
            let payout = wager.odds.payout(wager.amount, result);

            let mut settled = wager.clone();
            settled.result = result;
            settled.payout = payout;
            settled.settled_at = Some(Utc::now());

            // Ledger first: the balance is authoritative. If the wager
            // write below is lost to a crash, the elimination sweep and
            // the pending re-settle path repair the row.
            let update = self.ledger.apply_settlement(&settled).await?;
            settled.balance_after = Some(update.balance_after);
            if let Err(e) = self.ledger.store().update_wager(&settled).await {
                warn!(
                    wager_id,
                    agent_id = %settled.agent_id,
                    error = %e,
                    "Balance applied but wager row not persisted"
                );
                return Err(e.into());
            }

            info!(
                wager_id,
                agent_id = %settled.agent_id,
                result = %result,
                payout = %format!("${payout:.2}"),
                balance = %update.balance_after,
                "Wager settled"
            );

            SettlementResult {
                wager_id: settled.id,
                agent_id: settled.agent_id,
                result,
                amount: settled.amount,
                payout,
                balance_before: update.balance_before,
                balance_after: update.balance_after,
                was_eliminated: update.was_eliminated,
                already_settled: false,
            }
        };
        Ok(outcome)
    }

    /// Settle every pending wager on a game. Agents settle in parallel
    /// with each other; an agent's own wagers settle in order. Failures
    /// are isolated per wager.
    pub async fn settle_game(&self, game_result: &GameResult) -> Result<SettlementReport, StakebookError> {
        let pending = self.ledger.store().pending_for_game(&game_result.game_id).await?;

        let mut by_agent: HashMap<String, Vec<Wager>> = HashMap::new();
        for wager in pending {
            by_agent.entry(wager.agent_id.clone()).or_default().push(wager);
        }

        let tasks = by_agent.into_values().map(|wagers| async move {
            let mut settled = Vec::new();
            let mut failed = Vec::new();
            for wager in wagers {
                match self.settle(&wager.id, game_result).await {
                    Ok(result) => settled.push(result),
                    Err(error) => {
                        warn!(
                            wager_id = %wager.id,
                            agent_id = %wager.agent_id,
                            %error,
                            "Settlement failed"
                        );
                        failed.push(SettlementFailure {
                            wager_id: wager.id,
                            agent_id: wager.agent_id,
                            error,
                        });
                    }
                }
            }
            (settled, failed)
        });

        let mut report = SettlementReport::default();
        for (settled, failed) in join_all(tasks).await {
            report.settled.extend(settled);
            report.failed.extend(failed);
        }

        info!(
            game_id = %game_result.game_id,
            settled = report.settled.len(),
            failed = report.failed.len(),
            "Game settled"
        );
        Ok(report)
    }

    /// Repair sweep over all bankrolls; see
    /// [`BankrollLedger::recalculate_elimination_status`].
    pub async fn recalculate_elimination_status(&self) -> Result<Vec<String>, StakebookError> {
        self.ledger.recalculate_elimination_status().await
    }

    fn echo(wager: &Wager) -> SettlementResult {
        // The wager's own balance_before is the placement-time
        // snapshot; the balance the settlement actually moved is
        // recovered from the stored outcome.
        let balance_before = match wager.balance_after {
            Some(after) => after - wager.net_change(),
            None => wager.balance_before,
        };
        SettlementResult {
            wager_id: wager.id.clone(),
            agent_id: wager.agent_id.clone(),
            result: wager.result,
            amount: wager.amount,
            payout: wager.payout,
            balance_before,
            balance_after: wager.balance_after.unwrap_or(wager.balance_before),
            was_eliminated: false,
            already_settled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
