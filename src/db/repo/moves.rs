//! Commission move persistence and the storage side of the dedup guard.

use super::{parse_amount, row_to_move, Repository};
use crate::domain::{
    CommissionMove, CompanyId, ComputedCommission, MoveState, OrderId, PartnerId, PaymentOrigin,
};
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Row, Sqlite, Transaction};

/// Predicate set for ledger queries. Empty vectors and `None`s mean "no
/// filter on that field".
#[derive(Debug, Clone, Default)]
pub struct MoveFilter {
    pub state: Option<MoveState>,
    /// Drop cancelled moves regardless of `state` (report queries).
    pub exclude_cancelled: bool,
    pub partners: Vec<PartnerId>,
    pub company: Option<CompanyId>,
    pub origin: Option<PaymentOrigin>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Repository {
    /// Persist computed commissions through the dedup guard, all in one
    /// transaction. Returns the moves actually created; duplicates are
    /// suppressed silently (logged at info).
    pub async fn persist_computed(
        &self,
        computed: &[ComputedCommission],
        date: NaiveDate,
    ) -> Result<Vec<CommissionMove>, sqlx::Error> {
        if computed.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool().begin().await?;
        let mut created = Vec::with_capacity(computed.len());
        for c in computed {
            if let Some(m) = insert_guarded(&mut tx, c, date).await? {
                created.push(m);
            }
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Delete one order's draft moves and insert its regenerated set, as a
    /// single transaction so no window exists with the order's history
    /// half-gone. Settled and invoiced moves are never touched; the guard
    /// still runs against them.
    pub async fn replace_draft_moves_for_order(
        &self,
        order: OrderId,
        computed: &[ComputedCommission],
        date: NaiveDate,
    ) -> Result<Vec<CommissionMove>, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM commission_moves WHERE sale_order_id = ? AND state = 'draft'")
            .bind(order.get())
            .execute(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(computed.len());
        for c in computed {
            if let Some(m) = insert_guarded(&mut tx, c, date).await? {
                created.push(m);
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Ledger query, pre-sorted by (partner, date, id) for grouping
    /// consumers.
    pub async fn query_moves(
        &self,
        filter: &MoveFilter,
    ) -> Result<Vec<CommissionMove>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM commission_moves WHERE 1=1");

        if let Some(state) = filter.state {
            builder.push(" AND state = ").push_bind(state.as_str());
        }
        if filter.exclude_cancelled {
            builder.push(" AND state != 'cancel'");
        }
        if !filter.partners.is_empty() {
            builder.push(" AND partner_id IN (");
            let mut separated = builder.separated(", ");
            for partner in &filter.partners {
                separated.push_bind(partner.get());
            }
            separated.push_unseparated(")");
        }
        if let Some(company) = filter.company {
            builder.push(" AND company_id = ").push_bind(company.get());
        }
        if let Some(origin) = filter.origin {
            builder.push(" AND origin = ").push_bind(origin.as_str());
        }
        if let Some(from) = filter.date_from {
            builder.push(" AND date >= ").push_bind(from.to_string());
        }
        if let Some(to) = filter.date_to {
            builder.push(" AND date <= ").push_bind(to.to_string());
        }

        builder.push(" ORDER BY partner_id ASC, date ASC, id ASC");

        let rows = builder.build().fetch_all(self.pool()).await?;
        Ok(rows.iter().map(row_to_move).collect())
    }

    /// All non-cancelled moves for one order, for conservation checks and
    /// recompute summaries.
    pub async fn moves_for_order(
        &self,
        order: OrderId,
    ) -> Result<Vec<CommissionMove>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM commission_moves
            WHERE sale_order_id = ? AND state != 'cancel'
            ORDER BY partner_id ASC, date ASC, id ASC
            "#,
        )
        .bind(order.get())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(row_to_move).collect())
    }

    pub async fn count_moves(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM commission_moves")
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("n"))
    }
}

/// Insert one computed commission behind the dedup guard.
///
/// Reconciliation-keyed inserts lean on the UNIQUE constraint, which also
/// closes the race between check and insert under concurrent triggers.
/// Synthesized events fall back to the tolerance key: same (partner,
/// order), same payment linkage (including explicit absence), and a base
/// amount within the origin's tolerance.
async fn insert_guarded(
    tx: &mut Transaction<'_, Sqlite>,
    c: &ComputedCommission,
    date: NaiveDate,
) -> Result<Option<CommissionMove>, sqlx::Error> {
    if c.reconciliation.is_none() && tolerance_match_exists(tx, c).await? {
        tracing::info!(
            partner = %c.partner,
            order = %c.order,
            base = %c.base_amount_paid,
            origin = %c.origin,
            "Duplicate commission suppressed by tolerance guard"
        );
        return Ok(None);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO commission_moves
        (name, partner_id, sale_order_id, invoice_line_id, payment_id, reconcile_id,
         company_id, amount, base_amount_paid, currency, date, is_refund, origin,
         coverage_ratio, share_ratio, final_ratio, state)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft')
        ON CONFLICT(reconcile_id, partner_id, sale_order_id) DO NOTHING
        "#,
    )
    .bind(&c.name)
    .bind(c.partner.get())
    .bind(c.order.get())
    .bind(c.invoice_line.map(|l| l.get()))
    .bind(c.payment.map(|p| p.get()))
    .bind(c.reconciliation.map(|r| r.get()))
    .bind(c.company.get())
    .bind(c.amount.to_canonical_string())
    .bind(c.base_amount_paid.to_canonical_string())
    .bind(c.currency.as_str())
    .bind(date.to_string())
    .bind(c.is_refund as i64)
    .bind(c.origin.as_str())
    .bind(c.coverage_ratio.to_canonical_string())
    .bind(c.share_ratio.to_canonical_string())
    .bind(c.final_ratio.to_canonical_string())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        tracing::info!(
            partner = %c.partner,
            order = %c.order,
            reconcile = ?c.reconciliation,
            "Duplicate commission suppressed by uniqueness constraint"
        );
        return Ok(None);
    }

    let row = sqlx::query("SELECT * FROM commission_moves WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&mut **tx)
        .await?;
    Ok(Some(row_to_move(&row)))
}

/// Tolerance-key existence check, run inside the insert transaction.
/// Candidate rows are fetched and compared in Rust to keep the decimal
/// comparison exact.
async fn tolerance_match_exists(
    tx: &mut Transaction<'_, Sqlite>,
    c: &ComputedCommission,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT base_amount_paid FROM commission_moves
        WHERE partner_id = ? AND sale_order_id = ?
          AND reconcile_id IS NULL
          AND payment_id IS ?
          AND state != 'cancel'
        "#,
    )
    .bind(c.partner.get())
    .bind(c.order.get())
    .bind(c.payment.map(|p| p.get()))
    .fetch_all(&mut **tx)
    .await?;

    let tolerance = c.origin.dedup_tolerance();
    Ok(rows.iter().any(|row| {
        let stored: String = row.get("base_amount_paid");
        let stored = parse_amount("base_amount_paid", &stored);
        (stored - c.base_amount_paid).abs() <= tolerance
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_repo;
    use crate::domain::{Amount, Currency, PaymentId, ReconcileId};

    fn computed(reconcile: Option<i64>, base: &str, origin: PaymentOrigin) -> ComputedCommission {
        ComputedCommission {
            name: "CMSN INV/001 / SO001 (50%)".into(),
            partner: PartnerId::new(7),
            order: OrderId::new(1),
            invoice_line: None,
            payment: None,
            reconciliation: reconcile.map(ReconcileId::new),
            company: CompanyId::new(1),
            amount: Amount::parse("21.55").unwrap(),
            base_amount_paid: Amount::parse(base).unwrap(),
            currency: Currency::new("USD"),
            is_refund: false,
            origin,
            coverage_ratio: Amount::parse("0.5").unwrap(),
            share_ratio: Amount::one(),
            final_ratio: Amount::parse("0.5").unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[tokio::test]
    async fn reconciliation_key_deduplicates() {
        let (repo, _temp) = setup_test_repo().await;
        let c = computed(Some(5), "431.04", PaymentOrigin::Reconciliation);

        let first = repo.persist_computed(&[c.clone()], today()).await.unwrap();
        let second = repo.persist_computed(&[c], today()).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(repo.count_moves().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn distinct_reconciliations_both_persist() {
        let (repo, _temp) = setup_test_repo().await;
        let a = computed(Some(5), "431.04", PaymentOrigin::Reconciliation);
        let b = computed(Some(6), "431.04", PaymentOrigin::Reconciliation);

        let created = repo.persist_computed(&[a, b], today()).await.unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn tolerance_guard_suppresses_near_identical_base() {
        let (repo, _temp) = setup_test_repo().await;
        let a = computed(None, "431.04", PaymentOrigin::ResidualDelta);
        let b = computed(None, "431.35", PaymentOrigin::ResidualDelta); // within 0.5

        repo.persist_computed(&[a], today()).await.unwrap();
        let created = repo.persist_computed(&[b], today()).await.unwrap();
        assert!(created.is_empty());
        assert_eq!(repo.count_moves().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tolerance_guard_passes_genuinely_distinct_partials() {
        let (repo, _temp) = setup_test_repo().await;
        let a = computed(None, "431.04", PaymentOrigin::ResidualDelta);
        let b = computed(None, "200", PaymentOrigin::ResidualDelta);

        repo.persist_computed(&[a], today()).await.unwrap();
        let created = repo.persist_computed(&[b], today()).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(repo.count_moves().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tolerance_guard_distinguishes_payment_linkage() {
        let (repo, _temp) = setup_test_repo().await;
        let a = computed(None, "431.04", PaymentOrigin::PaymentWidget);
        let mut b = computed(None, "431.04", PaymentOrigin::PaymentWidget);
        b.payment = Some(PaymentId::new(55));

        repo.persist_computed(&[a], today()).await.unwrap();
        let created = repo.persist_computed(&[b], today()).await.unwrap();
        // Different payment linkage means a different event.
        assert_eq!(created.len(), 1);
    }

    #[tokio::test]
    async fn replace_drafts_is_atomic_and_respects_settled() {
        let (repo, _temp) = setup_test_repo().await;
        let draft = computed(Some(5), "431.04", PaymentOrigin::Reconciliation);
        let created = repo.persist_computed(&[draft], today()).await.unwrap();

        // Promote the existing move out of draft.
        sqlx::query("UPDATE commission_moves SET state = 'settled' WHERE id = ?")
            .bind(created[0].id)
            .execute(repo.pool())
            .await
            .unwrap();

        // Regeneration must not duplicate the settled move and must add the
        // genuinely new one.
        let regenerated = vec![
            computed(Some(5), "431.04", PaymentOrigin::Reconciliation),
            computed(Some(6), "200", PaymentOrigin::Reconciliation),
        ];
        let new = repo
            .replace_draft_moves_for_order(OrderId::new(1), &regenerated, today())
            .await
            .unwrap();

        assert_eq!(new.len(), 1);
        assert_eq!(new[0].reconciliation, Some(ReconcileId::new(6)));
        assert_eq!(repo.count_moves().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn query_moves_sorted_and_filtered() {
        let (repo, _temp) = setup_test_repo().await;
        let mut a = computed(Some(1), "100", PaymentOrigin::Reconciliation);
        a.partner = PartnerId::new(2);
        let b = computed(Some(2), "200", PaymentOrigin::Reconciliation);
        repo.persist_computed(&[a, b], today()).await.unwrap();

        let all = repo.query_moves(&MoveFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Sorted by partner first.
        assert!(all[0].partner < all[1].partner || all[0].partner == all[1].partner);

        let filtered = repo
            .query_moves(&MoveFilter {
                partners: vec![PartnerId::new(2)],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].partner, PartnerId::new(2));
    }
}
