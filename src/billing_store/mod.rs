mod postgres;
mod postgrest;

pub use postgres::PostgresBillingStore;
pub use postgrest::PostgrestBillingStore;

use crate::domain::{BillingId, BillingUpdate};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BillingStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("data api request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("data api base url cannot carry path segments")]
    InvalidBaseUrl,
    #[error("update for billing id {billing_id} matched {matched} rows")]
    AmbiguousMatch { billing_id: BillingId, matched: usize },
    #[error("data api rejected the single-row update: {0}")]
    SingularUpdateRejected(String),
}

/// Persistence for billing records. Rows are only ever updated here.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Mark the row identified by `update.billing_id` as paid.
    ///
    /// Returns the id of the updated row, or `None` when no row matched.
    async fn mark_paid(&self, update: &BillingUpdate)
    -> Result<Option<BillingId>, BillingStoreError>;
}
