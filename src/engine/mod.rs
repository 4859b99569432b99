//! Core engine — the place → settle lifecycle around the ledger.

pub mod placer;
pub mod settler;

pub use placer::{AgentRegistry, BetPlacer, PlacementOutcome, PlacementReport, StaticRegistry};
pub use settler::{grade, BetSettler, SettlementReport, SettlementResult};
