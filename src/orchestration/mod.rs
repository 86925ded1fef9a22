//! Workflow orchestration over the engine and the ledger.

pub mod processor;
pub mod recompute;
pub mod settle;

pub use processor::{BatchFailure, BatchOutcome, ProcessError, Processor};
pub use recompute::{RecomputeError, RecomputeSummary};
pub use settle::SettleError;
