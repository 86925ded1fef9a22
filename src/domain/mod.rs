//! Domain types for commission proration.
//!
//! This module provides:
//! - Lossless money handling via the Amount wrapper
//! - Identifier newtypes for the host ERP's id spaces
//! - Read-only invoice/ledger/order snapshots
//! - Payment events with tagged discovery origins
//! - Persisted commission move / settlement / authorization records

pub mod commission;
pub mod invoice;
pub mod money;
pub mod order;
pub mod payment;
pub mod primitives;

pub use commission::{
    Authorization, AuthorizationState, CommissionMove, ComputedCommission, MoveState, Settlement,
    SettlementState,
};
pub use invoice::{
    AccountClass, DocumentType, Invoice, InvoiceLine, LedgerLine, PaymentStatus,
    PaymentSummaryEntry, ReconciliationRecord,
};
pub use money::Amount;
pub use order::{CalculationBasis, CommissionRule, RoleType, SalesOrder, SalesOrderLine};
pub use payment::{PaymentEvent, PaymentOrigin};
pub use primitives::{
    CompanyId, Currency, DocumentId, LineId, OrderId, OrderLineId, PartnerId, PaymentId,
    ReconcileId,
};
