//! SQLite persistence for the commission ledger.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{
    AuthorizationAction, MoveFilter, Repository, SettlementGroup, TransitionError,
};
