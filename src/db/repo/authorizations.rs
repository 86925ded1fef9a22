//! Authorization workflow records for orders whose internal commission
//! percentages exceed the configured ceiling.

use super::{row_to_authorization, Repository};
use crate::domain::{Amount, Authorization, AuthorizationState, CompanyId, OrderId};

impl Repository {
    pub async fn create_authorization(
        &self,
        order: OrderId,
        order_name: &str,
        requested_percent: Amount,
        ceiling_percent: Amount,
        justification: Option<&str>,
        company: CompanyId,
    ) -> Result<Authorization, sqlx::Error> {
        let name = format!("AUTH-{order_name}");
        let result = sqlx::query(
            r#"
            INSERT INTO commission_authorizations
            (name, sale_order_id, requested_percent, ceiling_percent, justification,
             company_id, state)
            VALUES (?, ?, ?, ?, ?, ?, 'draft')
            "#,
        )
        .bind(&name)
        .bind(order.get())
        .bind(requested_percent.to_canonical_string())
        .bind(ceiling_percent.to_canonical_string())
        .bind(justification)
        .bind(company.get())
        .execute(self.pool())
        .await?;

        self.get_authorization(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_authorization(&self, id: i64) -> Result<Option<Authorization>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM commission_authorizations WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(row_to_authorization))
    }

    pub async fn authorizations_for_order(
        &self,
        order: OrderId,
    ) -> Result<Vec<Authorization>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM commission_authorizations WHERE sale_order_id = ? ORDER BY id ASC",
        )
        .bind(order.get())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(row_to_authorization).collect())
    }

    /// Whether the order carries an approved authorization, which unlocks
    /// recomputation above the ceiling.
    pub async fn has_approved_authorization(&self, order: OrderId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM commission_authorizations
            WHERE sale_order_id = ? AND state = 'approved'
            "#,
        )
        .bind(order.get())
        .fetch_one(self.pool())
        .await?;
        let n: i64 = sqlx::Row::get(&row, "n");
        Ok(n > 0)
    }

    /// Apply one workflow transition. Returns the updated record, or `None`
    /// when the authorization does not exist. Invalid transitions surface as
    /// `TransitionError`.
    pub async fn transition_authorization(
        &self,
        id: i64,
        action: AuthorizationAction,
    ) -> Result<Option<Result<Authorization, TransitionError>>, sqlx::Error> {
        let Some(current) = self.get_authorization(id).await? else {
            return Ok(None);
        };

        let next = match action.next_state(current.state) {
            Some(next) => next,
            None => {
                return Ok(Some(Err(TransitionError {
                    from: current.state,
                    action,
                })))
            }
        };

        let reject_reason = match &action {
            AuthorizationAction::Reject { reason } => Some(reason.as_str()),
            // Reset wipes the rejection trace along with the state.
            AuthorizationAction::Reset => None,
            _ => current.reject_reason.as_deref(),
        };

        sqlx::query(
            "UPDATE commission_authorizations SET state = ?, reject_reason = ? WHERE id = ?",
        )
        .bind(next.as_str())
        .bind(reject_reason)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(self.get_authorization(id).await?.map(Ok))
    }
}

#[derive(Debug, Clone)]
pub enum AuthorizationAction {
    Submit,
    Approve,
    Reject { reason: String },
    Reset,
}

impl AuthorizationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationAction::Submit => "submit",
            AuthorizationAction::Approve => "approve",
            AuthorizationAction::Reject { .. } => "reject",
            AuthorizationAction::Reset => "reset",
        }
    }

    fn next_state(&self, from: AuthorizationState) -> Option<AuthorizationState> {
        match (self, from) {
            (AuthorizationAction::Submit, AuthorizationState::Draft) => {
                Some(AuthorizationState::Pending)
            }
            (AuthorizationAction::Approve, AuthorizationState::Pending) => {
                Some(AuthorizationState::Approved)
            }
            (AuthorizationAction::Reject { .. }, AuthorizationState::Pending) => {
                Some(AuthorizationState::Rejected)
            }
            (AuthorizationAction::Reset, AuthorizationState::Rejected)
            | (AuthorizationAction::Reset, AuthorizationState::Approved) => {
                Some(AuthorizationState::Draft)
            }
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("cannot {} an authorization in state {}", action.as_str(), from.as_str())]
pub struct TransitionError {
    pub from: AuthorizationState,
    pub action: AuthorizationAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_repo;

    async fn seeded() -> (Repository, tempfile::TempDir, Authorization) {
        let (repo, temp) = setup_test_repo().await;
        let auth = repo
            .create_authorization(
                OrderId::new(1),
                "SO001",
                Amount::parse("4.0").unwrap(),
                Amount::parse("2.5").unwrap(),
                Some("strategic account"),
                CompanyId::new(1),
            )
            .await
            .unwrap();
        (repo, temp, auth)
    }

    #[tokio::test]
    async fn create_names_after_order() {
        let (_repo, _temp, auth) = seeded().await;
        assert_eq!(auth.name, "AUTH-SO001");
        assert_eq!(auth.state, AuthorizationState::Draft);
    }

    #[tokio::test]
    async fn full_approval_path() {
        let (repo, _temp, auth) = seeded().await;

        let pending = repo
            .transition_authorization(auth.id, AuthorizationAction::Submit)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(pending.state, AuthorizationState::Pending);

        let approved = repo
            .transition_authorization(auth.id, AuthorizationAction::Approve)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(approved.state, AuthorizationState::Approved);
        assert!(repo
            .has_approved_authorization(OrderId::new(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn reject_requires_pending_and_records_reason() {
        let (repo, _temp, auth) = seeded().await;

        // Draft cannot be rejected directly.
        let err = repo
            .transition_authorization(
                auth.id,
                AuthorizationAction::Reject {
                    reason: "over budget".into(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(err.is_err());

        repo.transition_authorization(auth.id, AuthorizationAction::Submit)
            .await
            .unwrap();
        let rejected = repo
            .transition_authorization(
                auth.id,
                AuthorizationAction::Reject {
                    reason: "over budget".into(),
                },
            )
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(rejected.state, AuthorizationState::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some("over budget"));
        assert!(!repo
            .has_approved_authorization(OrderId::new(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn reset_returns_to_draft_and_clears_reason() {
        let (repo, _temp, auth) = seeded().await;
        repo.transition_authorization(auth.id, AuthorizationAction::Submit)
            .await
            .unwrap();
        repo.transition_authorization(
            auth.id,
            AuthorizationAction::Reject {
                reason: "no".into(),
            },
        )
        .await
        .unwrap();

        let reset = repo
            .transition_authorization(auth.id, AuthorizationAction::Reset)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reset.state, AuthorizationState::Draft);
        assert!(reset.reject_reason.is_none());
    }

    #[tokio::test]
    async fn missing_authorization_is_none() {
        let (repo, _temp) = setup_test_repo().await;
        let out = repo
            .transition_authorization(42, AuthorizationAction::Submit)
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
