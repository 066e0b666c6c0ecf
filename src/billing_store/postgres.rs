use super::{BillingStore, BillingStoreError};
use crate::domain::{BillingId, BillingUpdate, PAID_STATUS};
use async_trait::async_trait;
use sqlx::PgPool;

/// Billing store talking to Postgres directly.
#[derive(Clone)]
pub struct PostgresBillingStore {
    db_pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    #[tracing::instrument(
        name = "Marking billing record as paid in the database",
        skip(self, update),
        fields(billing_id = %update.billing_id)
    )]
    async fn mark_paid(
        &self,
        update: &BillingUpdate,
    ) -> Result<Option<BillingId>, BillingStoreError> {
        // `id::text` lets the same statement serve text and uuid primary keys
        let updated_id = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE billing
            SET status = $1, paid_date = $2, payment_id = $3
            WHERE id::text = $4
            RETURNING id::text
            "#,
        )
        .bind(PAID_STATUS)
        .bind(update.paid_at)
        .bind(&update.payment_id)
        .bind(update.billing_id.as_ref())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })?;

        Ok(updated_id.as_deref().and_then(BillingId::parse))
    }
}
