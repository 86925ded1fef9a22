//! Settlement batches: grouping draft moves into payable batches per
//! beneficiary, currency and company, then carrying them to a vendor bill.

use super::{parse_amount, row_to_move, row_to_settlement, Repository};
use crate::domain::{
    Amount, CommissionMove, CompanyId, Currency, DocumentId, PartnerId, Settlement,
    SettlementState,
};
use chrono::NaiveDate;
use sqlx::Row;

/// One (partner, currency, company) batch candidate with its member moves.
#[derive(Debug)]
pub struct SettlementGroup {
    pub partner: PartnerId,
    pub currency: Currency,
    pub company: CompanyId,
    pub moves: Vec<CommissionMove>,
}

impl Repository {
    /// Draft moves eligible for settlement: dated on or before the cutoff,
    /// not yet assigned to a batch, optionally restricted to a partner set.
    /// Grouped by (partner, currency, company) in ledger order.
    pub async fn settleable_groups(
        &self,
        cutoff: NaiveDate,
        partners: &[PartnerId],
    ) -> Result<Vec<SettlementGroup>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM commission_moves
            WHERE state = 'draft' AND settlement_id IS NULL AND date <= ?
            ORDER BY partner_id ASC, date ASC, id ASC
            "#,
        )
        .bind(cutoff.to_string())
        .fetch_all(self.pool())
        .await?;

        let mut groups: Vec<SettlementGroup> = Vec::new();
        for row in &rows {
            let m = row_to_move(row);
            if !partners.is_empty() && !partners.contains(&m.partner) {
                continue;
            }
            match groups.iter_mut().find(|g| {
                g.partner == m.partner && g.currency == m.currency && g.company == m.company
            }) {
                Some(g) => g.moves.push(m),
                None => groups.push(SettlementGroup {
                    partner: m.partner,
                    currency: m.currency.clone(),
                    company: m.company,
                    moves: vec![m],
                }),
            }
        }
        Ok(groups)
    }

    /// Create one settlement batch from a group: insert the batch row,
    /// assign its members and promote them to `settled`, all in one
    /// transaction. The total is the signed sum of member amounts, so
    /// refund moves reduce the payable.
    pub async fn create_settlement(
        &self,
        group: &SettlementGroup,
        date: NaiveDate,
    ) -> Result<Settlement, sqlx::Error> {
        let name = format!("LIQ-{}-{}", date, group.partner.get());
        let total = group
            .moves
            .iter()
            .fold(Amount::zero(), |acc, m| acc + m.amount);

        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO commission_settlements
            (name, partner_id, currency, company_id, date, total_amount, state)
            VALUES (?, ?, ?, ?, ?, ?, 'draft')
            "#,
        )
        .bind(&name)
        .bind(group.partner.get())
        .bind(group.currency.as_str())
        .bind(group.company.get())
        .bind(date.to_string())
        .bind(total.to_canonical_string())
        .execute(&mut *tx)
        .await?;
        let settlement_id = result.last_insert_rowid();

        for m in &group.moves {
            sqlx::query(
                "UPDATE commission_moves SET settlement_id = ?, state = 'settled' WHERE id = ?",
            )
            .bind(settlement_id)
            .bind(m.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_settlement(settlement_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_settlement(&self, id: i64) -> Result<Option<Settlement>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM commission_settlements WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(row_to_settlement))
    }

    pub async fn list_settlements(
        &self,
        state: Option<SettlementState>,
    ) -> Result<Vec<Settlement>, sqlx::Error> {
        let rows = match state {
            Some(s) => {
                sqlx::query(
                    "SELECT * FROM commission_settlements WHERE state = ? ORDER BY id ASC",
                )
                .bind(s.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM commission_settlements ORDER BY id ASC")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows.iter().map(row_to_settlement).collect())
    }

    pub async fn set_settlement_state(
        &self,
        id: i64,
        state: SettlementState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE commission_settlements SET state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record the vendor bill on a settlement and promote the batch and its
    /// members to `invoiced`, atomically.
    pub async fn mark_settlement_billed(
        &self,
        id: i64,
        vendor_bill: DocumentId,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "UPDATE commission_settlements SET vendor_bill_id = ?, state = 'invoiced' WHERE id = ?",
        )
        .bind(vendor_bill.get())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE commission_moves SET state = 'invoiced' WHERE settlement_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn moves_for_settlement(
        &self,
        id: i64,
    ) -> Result<Vec<CommissionMove>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM commission_moves WHERE settlement_id = ? ORDER BY partner_id, date, id",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(row_to_move).collect())
    }

    /// Recompute a settlement total from its members. Used after a member
    /// set changes out of band; the stored total is otherwise fixed at
    /// creation.
    pub async fn settlement_member_total(&self, id: i64) -> Result<Amount, sqlx::Error> {
        let rows = sqlx::query("SELECT amount FROM commission_moves WHERE settlement_id = ?")
            .bind(id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.iter().fold(Amount::zero(), |acc, row| {
            let raw: String = row.get("amount");
            acc + parse_amount("amount", &raw)
        }))
    }
}
