//! American-odds wire format and payout arithmetic.
//!
//! One parser and one payout path shared by the sizing engine and the
//! settler, so the implied probability used to size a bet and the
//! profit paid at settlement can never drift apart.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::types::{StakebookError, WagerResult};

/// American odds notation: `EVEN`, `+N` (underdog, risk 100 to win N)
/// or `-N` (favorite, risk N to win 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmericanOdds {
    Even,
    Plus(u32),
    Minus(u32),
}

impl AmericanOdds {
    /// Decimal odds: total return per unit staked.
    /// `EVEN` → 2.0; `+N` → 1 + N/100; `-N` → 1 + 100/N.
    pub fn decimal_odds(&self) -> Decimal {
        match self {
            AmericanOdds::Even => dec!(2),
            AmericanOdds::Plus(n) => Decimal::ONE + Decimal::from(*n) / Decimal::ONE_HUNDRED,
            AmericanOdds::Minus(n) => Decimal::ONE + Decimal::ONE_HUNDRED / Decimal::from(*n),
        }
    }

    /// Market-implied win probability (1 / decimal odds).
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.decimal_odds()
    }

    /// Profit on a winning stake, rounded half-up to cents.
    /// `+N` pays N/100 per unit, `-N` pays 100/N per unit.
    pub fn profit(&self, stake: Decimal) -> Decimal {
        let raw = match self {
            AmericanOdds::Even => stake,
            AmericanOdds::Plus(n) => stake * Decimal::from(*n) / Decimal::ONE_HUNDRED,
            AmericanOdds::Minus(n) => stake * Decimal::ONE_HUNDRED / Decimal::from(*n),
        };
        raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Total payout for a settled stake: stake + profit on a win,
    /// the stake back on a push, nothing on a loss. A pending wager
    /// has no payout.
    pub fn payout(&self, stake: Decimal, result: WagerResult) -> Decimal {
        match result {
            WagerResult::Won => stake + self.profit(stake),
            WagerResult::Push => stake,
            WagerResult::Lost | WagerResult::Pending => Decimal::ZERO,
        }
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmericanOdds::Even => write!(f, "EVEN"),
            AmericanOdds::Plus(n) => write!(f, "+{n}"),
            AmericanOdds::Minus(n) => write!(f, "-{n}"),
        }
    }
}

impl std::str::FromStr for AmericanOdds {
    type Err = StakebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("even") {
            return Ok(AmericanOdds::Even);
        }
        let (rest, favorite) = if let Some(rest) = s.strip_prefix('+') {
            (rest, false)
        } else if let Some(rest) = s.strip_prefix('-') {
            (rest, true)
        } else {
            return Err(StakebookError::Validation(format!(
                "Unparseable odds {s:?}: expected EVEN, +N or -N"
            )));
        };
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StakebookError::Validation(format!(
                "Unparseable odds {s:?}: {rest:?} is not a number"
            )));
        }
        let n: u32 = rest.parse().map_err(|_| {
            StakebookError::Validation(format!("Unparseable odds {s:?}: line out of range"))
        })?;
        if n == 0 {
            return Err(StakebookError::Validation(format!(
                "Unparseable odds {s:?}: zero line"
            )));
        }
        if favorite {
            Ok(AmericanOdds::Minus(n))
        } else {
            Ok(AmericanOdds::Plus(n))
        }
    }
}

// Serialized as the wire string ("+150") rather than a tagged enum, so
// stored wagers carry the same representation the results source uses.
impl Serialize for AmericanOdds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AmericanOdds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
