use crate::confirmation::{ConfirmationError, PaymentConfirmation, confirm_payment};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(serde::Deserialize)]
pub struct VerifyPaymentParameters {
    // Optional: an absent parameter is a MissingParameter rejection, not a parse failure
    session_id: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub id: String,
    pub amount: i64,
    pub status: String,
    #[serde(rename = "billingId")]
    pub billing_id: String,
}

impl From<PaymentConfirmation> for VerifyPaymentResponse {
    fn from(confirmation: PaymentConfirmation) -> Self {
        Self {
            success: true,
            id: confirmation.payment_intent_id,
            amount: confirmation.amount_total,
            status: confirmation.payment_status.to_string(),
            billing_id: confirmation.billing_id.to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ConfirmationError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing session_id",
            Self::PaymentIncomplete(_) => "Payment not completed",
            Self::MissingCorrelationId => "Missing billingId in session metadata",
            Self::Persistence(_) => "Database update error",
            Self::UpstreamFetch(_) | Self::UnknownFault => "Error verifying payment",
        }
    }
}

impl IntoResponse for ConfirmationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Error verifying payment");
        } else {
            tracing::info!(error = %self, "Rejected payment verification");
        }
        let body = ErrorBody {
            success: false,
            message: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[axum::debug_handler]
#[tracing::instrument(name = "Verifying a checkout payment", skip(state, query))]
pub async fn verify_payment(
    State(state): State<AppState>,
    query: Result<Query<VerifyPaymentParameters>, QueryRejection>,
) -> Result<Json<VerifyPaymentResponse>, ConfirmationError> {
    let Query(parameters) = query.map_err(|rejection| {
        tracing::info!(error = %rejection, "Unreadable query string");
        ConfirmationError::MissingParameter
    })?;
    let session_id = parameters.session_id.unwrap_or_default();

    let confirmation = tokio::time::timeout(
        state.request_timeout,
        confirm_payment(
            &state.processor,
            state.billing_store.as_ref(),
            &session_id,
        ),
    )
    .await
    .map_err(|_| {
        tracing::error!(timeout = ?state.request_timeout, "Payment verification timed out");
        ConfirmationError::UnknownFault
    })??;
    Ok(Json(confirmation.into()))
}
