//! Currency normalizer: historical-rate conversion into the reporting
//! currency.

use crate::domain::{Amount, CompanyId, Currency};
use crate::records::RateSource;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("no exchange rate available for {from}->{to} (company {company})")]
    NoRate {
        from: Currency,
        to: Currency,
        company: CompanyId,
    },
}

/// Converts amounts between currencies at a given valuation date.
///
/// Uses the rate valid at `as_of` (the latest quote dated at or before it),
/// not the latest rate, so proration stays consistent with when the
/// underlying sale was booked. No side effects.
#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<dyn RateSource>,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn RateSource>) -> Self {
        Self { rates }
    }

    /// Convert `amount` from `from` to `to` as of `as_of`.
    ///
    /// Falls back to "today" when the caller has no valuation date (sales
    /// order without an order date). When no quote predates `as_of`, the
    /// earliest later quote is used as a degraded approximation and logged;
    /// when the pair was never quoted at all this returns `NoRate`, which
    /// callers treat as fatal for the affected sales order only.
    pub fn convert(
        &self,
        amount: Amount,
        from: &Currency,
        to: &Currency,
        company: CompanyId,
        as_of: Option<NaiveDate>,
    ) -> Result<Amount, ConvertError> {
        if from == to {
            return Ok(amount);
        }

        let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
        let quotes = self.rates.rates(from, to, company);

        if let Some(quote) = quotes.iter().rev().find(|q| q.valid_from <= as_of) {
            return Ok(amount * quote.rate);
        }

        if let Some(quote) = quotes.first() {
            tracing::warn!(
                from = %from,
                to = %to,
                company = %company,
                as_of = %as_of,
                quote_date = %quote.valid_from,
                "No historical rate at valuation date, approximating with earliest later quote"
            );
            return Ok(amount * quote.rate);
        }

        Err(ConvertError::NoRate {
            from: from.clone(),
            to: to.clone(),
            company,
        })
    }
}
