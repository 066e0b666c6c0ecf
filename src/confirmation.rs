//! Confirms a checkout session with the processor and marks the linked
//! billing record as paid.

use crate::billing_store::{BillingStore, BillingStoreError};
use crate::domain::{BillingId, BillingUpdate, PaymentStatus, SessionId};
use crate::processor_client::{ProcessorClient, ProcessorError};
use chrono::Utc;

#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error("session id is missing")]
    MissingParameter,
    #[error("payment is not completed (status: {0})")]
    PaymentIncomplete(PaymentStatus),
    #[error("session metadata carries no billing id")]
    MissingCorrelationId,
    #[error("failed to fetch the checkout session")]
    UpstreamFetch(#[source] ProcessorError),
    #[error("failed to update the billing record")]
    Persistence(#[source] BillingStoreError),
    #[error("unexpected fault while verifying payment")]
    UnknownFault,
}

impl ConfirmationError {
    /// Rejections caused by the request or the payment's state, as opposed to infrastructure faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter | Self::PaymentIncomplete(_) | Self::MissingCorrelationId
        )
    }
}

/// Outcome of a verified payment.
#[derive(Clone, Debug)]
pub struct PaymentConfirmation {
    pub payment_intent_id: String,
    pub amount_total: i64,
    pub payment_status: PaymentStatus,
    pub billing_id: BillingId,
    /// `false` when no local billing row matched the correlation id.
    pub billing_record_linked: bool,
}

#[tracing::instrument(
    name = "Confirming payment",
    skip(processor, billing_store),
    fields(billing_id = tracing::field::Empty)
)]
pub async fn confirm_payment(
    processor: &ProcessorClient,
    billing_store: &dyn BillingStore,
    session_id: &str,
) -> Result<PaymentConfirmation, ConfirmationError> {
    let session_id = SessionId::parse(session_id.to_string())
        .map_err(|_| ConfirmationError::MissingParameter)?;

    let session = processor
        .retrieve_session(&session_id)
        .await
        .map_err(ConfirmationError::UpstreamFetch)?;

    if !session.is_paid() {
        return Err(ConfirmationError::PaymentIncomplete(session.payment_status));
    }

    let billing_id = session
        .billing_id()
        .and_then(BillingId::parse)
        .ok_or(ConfirmationError::MissingCorrelationId)?;
    tracing::Span::current().record("billing_id", tracing::field::display(&billing_id));

    let payment_intent_id = session
        .payment_intent_id()
        .ok_or_else(|| {
            ConfirmationError::UpstreamFetch(ProcessorError::MissingPaymentIntent(
                session.id.clone(),
            ))
        })?
        .to_string();

    let update = BillingUpdate {
        billing_id: billing_id.clone(),
        payment_id: payment_intent_id.clone(),
        paid_at: Utc::now(),
    };
    let updated = billing_store
        .mark_paid(&update)
        .await
        .map_err(ConfirmationError::Persistence)?;

    // The processor is the source of truth: a missing local row does not fail the confirmation
    if updated.is_none() {
        tracing::warn!(%billing_id, "No billing record found for billing id");
    }

    Ok(PaymentConfirmation {
        payment_intent_id,
        amount_total: session.amount_total(),
        payment_status: session.payment_status,
        billing_id,
        billing_record_linked: updated.is_some(),
    })
}
