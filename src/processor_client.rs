use crate::domain::{CheckoutSession, SessionId};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("processor base url cannot carry path segments")]
    InvalidBaseUrl,
    #[error("processor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("paid session {0} carries no payment intent")]
    MissingPaymentIntent(String),
}

/// HTTP client for the payment processor's checkout-session API.
#[derive(Clone)]
pub struct ProcessorClient {
    http_client: Client,
    base_url: Url,
    secret_key: Secret<String>,
    api_version: String,
}

impl ProcessorClient {
    pub fn new(
        base_url: Url,
        secret_key: Secret<String>,
        api_version: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            secret_key,
            api_version,
        })
    }

    fn session_url(&self, session_id: &SessionId) -> Result<Url, ProcessorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProcessorError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["v1", "checkout", "sessions", session_id.as_ref()]);
        Ok(url)
    }

    #[tracing::instrument(name = "Retrieving checkout session", skip(self))]
    pub async fn retrieve_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CheckoutSession, ProcessorError> {
        let url = self.session_url(session_id)?;
        let session = self
            .http_client
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .header("Stripe-Version", &self.api_version)
            .send()
            .await?
            .error_for_status()?
            .json::<CheckoutSession>()
            .await?;
        Ok(session)
    }
}
