pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod records;

pub use config::Config;
pub use db::{init_db, MoveFilter, Repository};
pub use domain::{
    Amount, CommissionMove, ComputedCommission, Currency, Invoice, PaymentEvent, PaymentOrigin,
    SalesOrder, Settlement,
};
pub use engine::CurrencyConverter;
pub use error::AppError;
pub use orchestration::Processor;
pub use records::{MemoryRecordSource, RateSource, RecordError, RecordSource};
