pub mod settlement;
pub mod settlement_sweep;

pub use settlement::apply_settlement;
pub use settlement_sweep::{SettlementSweep, SettlementSweepStats, SweepConfig};
