//! Settlement workflow: batch generation, approval and vendor billing.

use crate::domain::{PartnerId, Settlement, SettlementState};
use crate::orchestration::processor::Processor;
use crate::records::{RecordError, VendorBillRequest};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettleError {
    #[error("settlement {0} not found")]
    NotFound(i64),
    #[error("billing parameters are not configured")]
    MissingBillingConfig,
    #[error("settlement {0} is not approved")]
    NotApproved(i64),
    #[error("settlement {0} is already billed")]
    AlreadyBilled(i64),
    #[error("settlement {0} is not in draft")]
    NotDraft(i64),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Processor {
    /// Group eligible draft moves into one settlement per (beneficiary,
    /// currency, company) and promote the members. `cutoff` defaults to
    /// today; an empty partner list means all beneficiaries.
    pub async fn generate_settlements(
        &self,
        cutoff: Option<NaiveDate>,
        partners: &[PartnerId],
    ) -> Result<Vec<Settlement>, SettleError> {
        let date = cutoff.unwrap_or_else(Self::ledger_date);
        let groups = self.repo().settleable_groups(date, partners).await?;
        let mut settlements = Vec::with_capacity(groups.len());
        for group in &groups {
            let settlement = self.repo().create_settlement(group, date).await?;
            tracing::info!(
                settlement = %settlement.name,
                members = group.moves.len(),
                total = %settlement.total_amount,
                "Settlement generated"
            );
            settlements.push(settlement);
        }
        Ok(settlements)
    }

    pub async fn approve_settlement(&self, id: i64) -> Result<Settlement, SettleError> {
        let settlement = self
            .repo()
            .get_settlement(id)
            .await?
            .ok_or(SettleError::NotFound(id))?;
        if settlement.state != SettlementState::Draft {
            return Err(SettleError::NotDraft(id));
        }
        self.repo()
            .set_settlement_state(id, SettlementState::Approved)
            .await?;
        self.repo()
            .get_settlement(id)
            .await?
            .ok_or(SettleError::NotFound(id))
    }

    /// Issue the vendor bill for an approved settlement and promote the
    /// batch and its members to invoiced. Requires the billing product and
    /// journal to be configured.
    pub async fn bill_settlement(&self, id: i64) -> Result<Settlement, SettleError> {
        let settlement = self
            .repo()
            .get_settlement(id)
            .await?
            .ok_or(SettleError::NotFound(id))?;

        match settlement.state {
            SettlementState::Approved => {}
            SettlementState::Invoiced => return Err(SettleError::AlreadyBilled(id)),
            _ => return Err(SettleError::NotApproved(id)),
        }

        let (product_id, journal_id) = match (
            self.config().commission_product_id,
            self.config().commission_journal_id,
        ) {
            (Some(p), Some(j)) => (p, j),
            _ => return Err(SettleError::MissingBillingConfig),
        };

        let request = VendorBillRequest {
            partner: settlement.partner,
            company: settlement.company,
            currency: settlement.currency.clone(),
            date: Self::ledger_date(),
            product_id,
            journal_id,
            description: settlement.name.clone(),
            amount: settlement.total_amount,
        };
        let bill = self.records().create_vendor_bill(request).await?;

        self.repo().mark_settlement_billed(id, bill).await?;
        tracing::info!(settlement = %settlement.name, bill = %bill, "Settlement billed");

        self.repo()
            .get_settlement(id)
            .await?
            .ok_or(SettleError::NotFound(id))
    }
}
