//! Shared types for the STAKEBOOK engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that sizing, ledger, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::odds::AmericanOdds;
use crate::storage::StoreError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bankroll lifecycle status.
///
/// Elimination is permanent: once a bankroll hits zero it never
/// returns to `Active`, even if a later reconciliation pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankrollStatus {
    Active,
    Eliminated,
}

impl fmt::Display for BankrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankrollStatus::Active => write!(f, "active"),
            BankrollStatus::Eliminated => write!(f, "eliminated"),
        }
    }
}

impl std::str::FromStr for BankrollStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(BankrollStatus::Active),
            "eliminated" => Ok(BankrollStatus::Eliminated),
            _ => Err(anyhow::anyhow!("Unknown bankroll status: {s}")),
        }
    }
}

/// Derived risk tier, recomputed on every settlement from the ratio of
/// current to starting balance. Never authoritative — `status` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Safe,
    AtRisk,
    Danger,
    Critical,
}

impl RiskTier {
    /// Tier for a `current / starting` balance ratio.
    pub fn from_ratio(ratio: Decimal) -> Self {
        use rust_decimal_macros::dec;
        if ratio >= dec!(0.70) {
            RiskTier::Safe
        } else if ratio >= dec!(0.40) {
            RiskTier::AtRisk
        } else if ratio >= dec!(0.20) {
            RiskTier::Danger
        } else {
            RiskTier::Critical
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Safe => write!(f, "safe"),
            RiskTier::AtRisk => write!(f, "at_risk"),
            RiskTier::Danger => write!(f, "danger"),
            RiskTier::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "safe" => Ok(RiskTier::Safe),
            "at_risk" => Ok(RiskTier::AtRisk),
            "danger" => Ok(RiskTier::Danger),
            "critical" => Ok(RiskTier::Critical),
            _ => Err(anyhow::anyhow!("Unknown risk tier: {s}")),
        }
    }
}

/// Wager lifecycle. `Pending` is the only non-terminal state and a
/// wager transitions away from it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WagerResult {
    Pending,
    Won,
    Lost,
    Push,
}

impl WagerResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WagerResult::Pending)
    }
}

impl fmt::Display for WagerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WagerResult::Pending => write!(f, "pending"),
            WagerResult::Won => write!(f, "won"),
            WagerResult::Lost => write!(f, "lost"),
            WagerResult::Push => write!(f, "push"),
        }
    }
}

impl std::str::FromStr for WagerResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WagerResult::Pending),
            "won" => Ok(WagerResult::Won),
            "lost" => Ok(WagerResult::Lost),
            "push" => Ok(WagerResult::Push),
            _ => Err(anyhow::anyhow!("Unknown wager result: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet categories
// ---------------------------------------------------------------------------

/// Side of a spread or moneyline pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamSide {
    Home,
    Away,
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Home => write!(f, "home"),
            TeamSide::Away => write!(f, "away"),
        }
    }
}

/// Side of a totals (over/under) pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalSide {
    Over,
    Under,
}

impl fmt::Display for TotalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalSide::Over => write!(f, "over"),
            TotalSide::Under => write!(f, "under"),
        }
    }
}

/// Semantic bet type, carrying the picked outcome.
///
/// Unknown wire strings are preserved as `Other` rather than rejected:
/// a wager must always resolve to a terminal state, so grading treats
/// an unrecognized category as a conservative loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetCategory {
    Spread(TeamSide),
    Total(TotalSide),
    Moneyline(TeamSide),
    Other(String),
}

impl BetCategory {
    /// Parse a wire-format category (case-insensitive). Never fails:
    /// anything unrecognized becomes `Other` and is graded fail-safe.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "spread_home" | "ats_home" | "home_spread" => BetCategory::Spread(TeamSide::Home),
            "spread_away" | "ats_away" | "away_spread" => BetCategory::Spread(TeamSide::Away),
            "total_over" | "over" => BetCategory::Total(TotalSide::Over),
            "total_under" | "under" => BetCategory::Total(TotalSide::Under),
            "moneyline_home" | "ml_home" | "home_ml" => BetCategory::Moneyline(TeamSide::Home),
            "moneyline_away" | "ml_away" | "away_ml" => BetCategory::Moneyline(TeamSide::Away),
            _ => BetCategory::Other(s.to_string()),
        }
    }
}

impl fmt::Display for BetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetCategory::Spread(side) => write!(f, "spread_{side}"),
            BetCategory::Total(side) => write!(f, "total_{side}"),
            BetCategory::Moneyline(side) => write!(f, "moneyline_{side}"),
            BetCategory::Other(raw) => write!(f, "{raw}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

/// Agent personality archetype, used only to scale the Kelly fraction.
///
/// Closed enum with an explicit `Unknown` fallback so an unrecognized
/// archetype is a checked default rather than a silent lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    Aggressive,
    Sharp,
    Contrarian,
    Chalk,
    Conservative,
    Unknown,
}

impl Archetype {
    /// All known archetypes (useful for iteration).
    pub const ALL: &'static [Archetype] = &[
        Archetype::Aggressive,
        Archetype::Sharp,
        Archetype::Contrarian,
        Archetype::Chalk,
        Archetype::Conservative,
        Archetype::Unknown,
    ];

    /// Kelly-fraction multiplier for this archetype. All values sit in
    /// [0.5, 1.5]; `Unknown` defaults to the conservative 0.75.
    pub fn multiplier(&self) -> Decimal {
        use rust_decimal_macros::dec;
        match self {
            Archetype::Aggressive => dec!(1.40),
            Archetype::Sharp => dec!(1.10),
            Archetype::Contrarian => dec!(0.90),
            Archetype::Chalk => dec!(0.80),
            Archetype::Conservative => dec!(0.60),
            Archetype::Unknown => dec!(0.75),
        }
    }

    /// Parse an archetype name (case-insensitive). Unrecognized names
    /// fall back to `Unknown` rather than failing.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "aggressive" => Archetype::Aggressive,
            "sharp" => Archetype::Sharp,
            "contrarian" => Archetype::Contrarian,
            "chalk" => Archetype::Chalk,
            "conservative" => Archetype::Conservative,
            _ => Archetype::Unknown,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Archetype::Aggressive => write!(f, "aggressive"),
            Archetype::Sharp => write!(f, "sharp"),
            Archetype::Contrarian => write!(f, "contrarian"),
            Archetype::Chalk => write!(f, "chalk"),
            Archetype::Conservative => write!(f, "conservative"),
            Archetype::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Game results
// ---------------------------------------------------------------------------

/// Against-the-spread outcome for a completed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadOutcome {
    HomeCovered,
    AwayCovered,
    Push,
}

/// Totals outcome for a completed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalOutcome {
    Over,
    Under,
    Push,
}

/// Straight-up winner of a completed game. A tie pushes moneyline bets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerOutcome {
    Home,
    Away,
    Tie,
}

/// Final outcome of a game as supplied by the results source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub spread_result: SpreadOutcome,
    pub total_result: TotalOutcome,
    pub winner: WinnerOutcome,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} — {} {} (winner: {:?}, spread: {:?}, total: {:?})",
            self.game_id,
            self.away_team,
            self.away_score,
            self.home_team,
            self.home_score,
            self.winner,
            self.spread_result,
            self.total_result,
        )
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// A candidate bet as supplied by the upstream prediction source.
///
/// `category` and `odds` arrive in wire format; the placer validates
/// and parses them before any persistence happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub agent_id: String,
    pub game_id: String,
    pub category: String,
    /// Win probability estimated by the expert, in [0, 1].
    pub confidence: Decimal,
    /// American odds: "EVEN", "+150", "-110".
    pub odds: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

// ---------------------------------------------------------------------------
// Risk metrics
// ---------------------------------------------------------------------------

/// Derived risk statistics, recomputed on every settlement over the
/// agent's balance history. Cosmetic tiering data — money never flows
/// through these, so plain floats are fine here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Sample standard deviation of per-wager returns.
    pub volatility: f64,
    /// Mean return over volatility; no risk-free-rate adjustment.
    pub sharpe: f64,
    /// Largest peak-to-trough decline over the balance series.
    pub max_drawdown: f64,
    /// Length of the current run of wins (0 if last wager wasn't won).
    pub win_streak: u32,
    /// Length of the current run of losses.
    pub lose_streak: u32,
    /// Number of settled wagers behind these statistics.
    pub sample_size: u32,
}

impl fmt::Display for RiskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vol={:.4} sharpe={:.2} dd={:.1}% W{}/L{} (n={})",
            self.volatility,
            self.sharpe,
            self.max_drawdown * 100.0,
            self.win_streak,
            self.lose_streak,
            self.sample_size,
        )
    }
}

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

/// Per-agent virtual bankroll, optionally scoped to a season.
///
/// `current_balance` is mutated only through the ledger's settlement
/// path and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bankroll {
    pub agent_id: String,
    #[serde(default)]
    pub season: Option<String>,
    pub starting_balance: Decimal,
    pub current_balance: Decimal,
    pub status: BankrollStatus,
    pub risk_tier: RiskTier,
    pub metrics: RiskMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bankroll {
    /// Create a fresh bankroll at agent onboarding.
    pub fn new(agent_id: &str, season: Option<String>, starting_balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.to_string(),
            season,
            starting_balance,
            current_balance: starting_balance,
            status: BankrollStatus::Active,
            risk_tier: RiskTier::Safe,
            metrics: RiskMetrics::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Return on investment as a fraction of the starting balance.
    pub fn roi(&self) -> Decimal {
        if self.starting_balance.is_zero() {
            Decimal::ZERO
        } else {
            (self.current_balance - self.starting_balance) / self.starting_balance
        }
    }

    /// Ratio of current to starting balance (drives the risk tier).
    pub fn balance_ratio(&self) -> Decimal {
        if self.starting_balance.is_zero() {
            Decimal::ZERO
        } else {
            self.current_balance / self.starting_balance
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BankrollStatus::Active
    }
}

impl fmt::Display for Bankroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ${:.2} / ${:.2} (roi {:.1}%, {}) {}",
            self.agent_id,
            self.status,
            self.current_balance,
            self.starting_balance,
            self.roi() * Decimal::ONE_HUNDRED,
            self.risk_tier,
            self.metrics,
        )
    }
}

// ---------------------------------------------------------------------------
// Wagers
// ---------------------------------------------------------------------------

/// A single placed bet. Append-only: wagers are never deleted, and a
/// non-pending wager is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: String,
    pub agent_id: String,
    pub game_id: String,
    pub category: BetCategory,
    pub amount: Decimal,
    pub odds: AmericanOdds,
    pub confidence: Decimal,
    pub result: WagerResult,
    /// Bankroll balance snapshot at placement time.
    pub balance_before: Decimal,
    /// Bankroll balance after settlement; `None` while pending.
    pub balance_after: Option<Decimal>,
    /// Total returned at settlement (stake + profit for a win,
    /// stake for a push, zero for a loss). Zero while pending.
    pub payout: Decimal,
    /// Audit trail of the sizing decision that produced this wager.
    pub kelly_fraction: Decimal,
    pub multiplier: Decimal,
    pub edge: Decimal,
    #[serde(default)]
    pub reasoning: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Wager {
    pub fn is_terminal(&self) -> bool {
        self.result.is_terminal()
    }

    /// Signed net effect of this wager on the bankroll.
    /// Zero while pending (nothing has been applied yet).
    pub fn net_change(&self) -> Decimal {
        match self.result {
            WagerResult::Won => self.payout - self.amount,
            WagerResult::Lost => -self.amount,
            WagerResult::Push | WagerResult::Pending => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Wager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ${:.2} @ {} [{}]",
            self.agent_id, self.game_id, self.category, self.amount, self.odds, self.result,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy.
///
/// Already-settled wagers and eliminated agents are *not* errors: they
/// surface as structured values (idempotent echo / placement skip).
#[derive(Debug, thiserror::Error)]
pub enum StakebookError {
    /// Malformed input, surfaced before any persistence.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Wager not found: {0}")]
    WagerNotFound(String),

    /// Underlying store unavailable — retryable, caller owns the policy.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -- RiskTier tests --

    #[test]
    fn test_risk_tier_thresholds() {
        assert_eq!(RiskTier::from_ratio(dec!(1.00)), RiskTier::Safe);
        assert_eq!(RiskTier::from_ratio(dec!(0.70)), RiskTier::Safe);
        assert_eq!(RiskTier::from_ratio(dec!(0.69)), RiskTier::AtRisk);
        assert_eq!(RiskTier::from_ratio(dec!(0.40)), RiskTier::AtRisk);
        assert_eq!(RiskTier::from_ratio(dec!(0.39)), RiskTier::Danger);
        assert_eq!(RiskTier::from_ratio(dec!(0.20)), RiskTier::Danger);
        assert_eq!(RiskTier::from_ratio(dec!(0.19)), RiskTier::Critical);
        assert_eq!(RiskTier::from_ratio(Decimal::ZERO), RiskTier::Critical);
    }

    #[test]
    fn test_risk_tier_roundtrip() {
        for tier in [RiskTier::Safe, RiskTier::AtRisk, RiskTier::Danger, RiskTier::Critical] {
            let parsed: RiskTier = tier.to_string().parse().unwrap();
            assert_eq!(parsed, tier);
        }
    }

    // -- WagerResult tests --

    #[test]
    fn test_wager_result_terminal() {
        assert!(!WagerResult::Pending.is_terminal());
        assert!(WagerResult::Won.is_terminal());
        assert!(WagerResult::Lost.is_terminal());
        assert!(WagerResult::Push.is_terminal());
    }

    #[test]
    fn test_wager_result_roundtrip() {
        for r in [WagerResult::Pending, WagerResult::Won, WagerResult::Lost, WagerResult::Push] {
            let parsed: WagerResult = r.to_string().parse().unwrap();
            assert_eq!(parsed, r);
        }
        assert!("void".parse::<WagerResult>().is_err());
    }

    // -- BetCategory tests --

    #[test]
    fn test_category_parse_known() {
        assert_eq!(BetCategory::parse("spread_home"), BetCategory::Spread(TeamSide::Home));
        assert_eq!(BetCategory::parse("ATS_AWAY"), BetCategory::Spread(TeamSide::Away));
        assert_eq!(BetCategory::parse("over"), BetCategory::Total(TotalSide::Over));
        assert_eq!(BetCategory::parse("total_under"), BetCategory::Total(TotalSide::Under));
        assert_eq!(BetCategory::parse("ml_home"), BetCategory::Moneyline(TeamSide::Home));
        assert_eq!(
            BetCategory::parse("moneyline_away"),
            BetCategory::Moneyline(TeamSide::Away)
        );
    }

    #[test]
    fn test_category_parse_unknown_preserved() {
        let cat = BetCategory::parse("parlay_teaser");
        assert_eq!(cat, BetCategory::Other("parlay_teaser".to_string()));
        assert_eq!(cat.to_string(), "parlay_teaser");
    }

    #[test]
    fn test_category_display_roundtrip() {
        for cat in [
            BetCategory::Spread(TeamSide::Home),
            BetCategory::Spread(TeamSide::Away),
            BetCategory::Total(TotalSide::Over),
            BetCategory::Total(TotalSide::Under),
            BetCategory::Moneyline(TeamSide::Home),
            BetCategory::Moneyline(TeamSide::Away),
        ] {
            assert_eq!(BetCategory::parse(&cat.to_string()), cat);
        }
    }

    // -- Archetype tests --

    #[test]
    fn test_archetype_multipliers_in_range() {
        for a in Archetype::ALL {
            let m = a.multiplier();
            assert!(m >= dec!(0.5) && m <= dec!(1.5), "{a} multiplier {m} out of range");
        }
    }

    #[test]
    fn test_archetype_unknown_fallback() {
        assert_eq!(Archetype::from_name("galaxy_brain"), Archetype::Unknown);
        assert_eq!(Archetype::Unknown.multiplier(), dec!(0.75));
    }

    #[test]
    fn test_archetype_from_name() {
        assert_eq!(Archetype::from_name("Aggressive"), Archetype::Aggressive);
        assert_eq!(Archetype::from_name("conservative"), Archetype::Conservative);
    }

    // -- Bankroll tests --

    #[test]
    fn test_bankroll_new() {
        let b = Bankroll::new("expert-1", None, dec!(10000));
        assert_eq!(b.current_balance, dec!(10000));
        assert_eq!(b.status, BankrollStatus::Active);
        assert_eq!(b.risk_tier, RiskTier::Safe);
        assert_eq!(b.roi(), Decimal::ZERO);
        assert!(b.is_active());
    }

    #[test]
    fn test_bankroll_roi() {
        let mut b = Bankroll::new("expert-1", None, dec!(10000));
        b.current_balance = dec!(12500);
        assert_eq!(b.roi(), dec!(0.25));
        b.current_balance = dec!(7500);
        assert_eq!(b.roi(), dec!(-0.25));
    }

    #[test]
    fn test_bankroll_ratio_zero_start() {
        let b = Bankroll::new("expert-1", None, Decimal::ZERO);
        assert_eq!(b.balance_ratio(), Decimal::ZERO);
        assert_eq!(b.roi(), Decimal::ZERO);
    }

    #[test]
    fn test_bankroll_serialization_roundtrip() {
        let b = Bankroll::new("expert-1", Some("2026".to_string()), dec!(500));
        let json = serde_json::to_string(&b).unwrap();
        let parsed: Bankroll = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.agent_id, "expert-1");
        assert_eq!(parsed.season.as_deref(), Some("2026"));
        assert_eq!(parsed.current_balance, dec!(500));
    }

    // -- Wager tests --

    fn make_wager(result: WagerResult, amount: Decimal, payout: Decimal) -> Wager {
        Wager {
            id: "w1".to_string(),
            agent_id: "expert-1".to_string(),
            game_id: "g1".to_string(),
            category: BetCategory::Spread(TeamSide::Home),
            amount,
            odds: "-110".parse().unwrap(),
            confidence: dec!(0.75),
            result,
            balance_before: dec!(10000),
            balance_after: None,
            payout,
            kelly_fraction: dec!(0.10),
            multiplier: dec!(0.75),
            edge: dec!(0.05),
            reasoning: None,
            placed_at: Utc::now(),
            settled_at: None,
        }
    }

    #[test]
    fn test_wager_net_change() {
        assert_eq!(make_wager(WagerResult::Won, dec!(300), dec!(572.73)).net_change(), dec!(272.73));
        assert_eq!(make_wager(WagerResult::Lost, dec!(300), Decimal::ZERO).net_change(), dec!(-300));
        assert_eq!(make_wager(WagerResult::Push, dec!(300), dec!(300)).net_change(), Decimal::ZERO);
        assert_eq!(make_wager(WagerResult::Pending, dec!(300), Decimal::ZERO).net_change(), Decimal::ZERO);
    }

    #[test]
    fn test_wager_serialization_roundtrip() {
        let w = make_wager(WagerResult::Won, dec!(300), dec!(572.73));
        let json = serde_json::to_string(&w).unwrap();
        let parsed: Wager = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "w1");
        assert_eq!(parsed.result, WagerResult::Won);
        assert_eq!(parsed.payout, dec!(572.73));
        assert_eq!(parsed.odds.to_string(), "-110");
    }

    #[test]
    fn test_wager_display() {
        let w = make_wager(WagerResult::Pending, dec!(300), Decimal::ZERO);
        let display = format!("{w}");
        assert!(display.contains("expert-1"));
        assert!(display.contains("spread_home"));
        assert!(display.contains("-110"));
    }

    // -- Error tests --

    #[test]
    fn test_error_display() {
        let e = StakebookError::Validation("confidence out of range".to_string());
        assert_eq!(format!("{e}"), "Validation failed: confidence out of range");

        let e = StakebookError::AgentNotFound("expert-9".to_string());
        assert!(format!("{e}").contains("expert-9"));
    }
}
