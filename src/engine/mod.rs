//! Commission computation engine.
//!
//! Pure computation over record-source snapshots: currency normalization,
//! payment discovery, order attribution, and proration. Persistence and
//! workflow live in `db` and `orchestration`.

pub mod attributor;
pub mod currency;
pub mod locator;
pub mod proration;

pub use attributor::{attribute_orders, AttributedOrder};
pub use currency::{ConvertError, CurrencyConverter};
pub use locator::{locate_payments, orient, OrientedMatch};
pub use proration::{prorate, ROUNDING_FLOOR};
