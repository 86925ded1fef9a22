//! Identifier newtypes and the currency code primitive.
//!
//! Business records live in the host ERP; this core only ever holds their
//! numeric identifiers, wrapped so the id spaces cannot be mixed up.

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                $name(id)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Commission beneficiary (partner) id.
    PartnerId
);
id_newtype!(
    /// Sales order id.
    OrderId
);
id_newtype!(
    /// Sales order line id.
    OrderLineId
);
id_newtype!(
    /// Ledger document id (invoice, credit note, vendor bill, manual entry).
    DocumentId
);
id_newtype!(
    /// Ledger line id.
    LineId
);
id_newtype!(
    /// Reconciliation record id.
    ReconcileId
);
id_newtype!(
    /// Customer payment document id.
    PaymentId
);
id_newtype!(
    /// Company id.
    CompanyId
);

/// ISO-style currency code ("USD", "MXN", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Currency(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_and_get() {
        let id = OrderId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn ids_are_ordered() {
        assert!(ReconcileId::new(1) < ReconcileId::new(2));
    }

    #[test]
    fn currency_display() {
        let usd = Currency::new("USD");
        assert_eq!(usd.as_str(), "USD");
        assert_eq!(usd.to_string(), "USD");
    }
}
