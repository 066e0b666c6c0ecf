use super::{BillingStore, BillingStoreError};
use crate::domain::{BillingId, BillingUpdate, PAID_STATUS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use url::Url;

/// Makes PostgREST answer with one object and roll back unless exactly one row matched.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// PostgREST code for a singular response that did not get exactly one row.
const SINGULAR_RESULT_MISMATCH: &str = "PGRST116";

/// Billing store backed by a managed PostgREST data API (e.g. Supabase).
#[derive(Clone)]
pub struct PostgrestBillingStore {
    http_client: Client,
    base_url: Url,
    api_key: Secret<String>,
    table: String,
}

#[derive(serde::Serialize)]
struct MarkPaidRequest<'a> {
    status: &'a str,
    paid_date: DateTime<Utc>,
    payment_id: &'a str,
}

#[derive(serde::Deserialize)]
struct UpdatedRow {
    id: serde_json::Value,
}

impl UpdatedRow {
    fn into_billing_id(self) -> Option<BillingId> {
        match self.id {
            serde_json::Value::String(id) => BillingId::parse(&id),
            serde_json::Value::Null => None,
            other => BillingId::parse(&other.to_string()),
        }
    }
}

#[derive(serde::Deserialize)]
struct PostgrestError {
    code: Option<String>,
    details: Option<String>,
}

impl PostgrestError {
    /// Row count reported in e.g. `"The result contains 2 rows"`.
    fn matched_rows(&self) -> Option<usize> {
        if self.code.as_deref() != Some(SINGULAR_RESULT_MISMATCH) {
            return None;
        }
        self.details
            .as_deref()?
            .split(|c: char| !c.is_ascii_digit())
            .find(|digits| !digits.is_empty())?
            .parse()
            .ok()
    }
}

impl PostgrestBillingStore {
    pub fn new(
        base_url: Url,
        api_key: Secret<String>,
        table: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            api_key,
            table,
        })
    }

    fn update_url(&self, billing_id: &BillingId) -> Result<Url, BillingStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BillingStoreError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["rest", "v1", self.table.as_str()]);
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", billing_id.as_ref()))
            .append_pair("select", "id");
        Ok(url)
    }
}

#[async_trait]
impl BillingStore for PostgrestBillingStore {
    #[tracing::instrument(
        name = "Marking billing record as paid via data API",
        skip(self, update),
        fields(billing_id = %update.billing_id)
    )]
    async fn mark_paid(
        &self,
        update: &BillingUpdate,
    ) -> Result<Option<BillingId>, BillingStoreError> {
        let url = self.update_url(&update.billing_id)?;
        let body = MarkPaidRequest {
            status: PAID_STATUS,
            paid_date: update.paid_at,
            payment_id: &update.payment_id,
        };
        let api_key = self.api_key.expose_secret();

        let response = self
            .http_client
            .patch(url)
            .header("apikey", api_key)
            .bearer_auth(api_key)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            let error = response.json::<PostgrestError>().await?;
            return match error.matched_rows() {
                Some(0) => Ok(None),
                Some(matched) => Err(BillingStoreError::AmbiguousMatch {
                    billing_id: update.billing_id.clone(),
                    matched,
                }),
                None => Err(BillingStoreError::SingularUpdateRejected(
                    error.details.unwrap_or_default(),
                )),
            };
        }

        let row = response
            .error_for_status()?
            .json::<UpdatedRow>()
            .await?;
        Ok(row.into_billing_id())
    }
}
