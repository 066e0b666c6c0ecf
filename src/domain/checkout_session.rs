use serde::Deserialize;
use std::collections::HashMap;

/// Metadata key linking a checkout session to its local billing row.
pub const BILLING_ID_METADATA_KEY: &str = "billingId";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The processor returns either the bare intent id or, when expanded, the whole object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
    Id(String),
    Expanded { id: String },
}

impl PaymentIntentRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

/// Checkout session as returned by the payment processor. Read-only here.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: PaymentStatus,
    pub amount_total: Option<i64>,
    pub payment_intent: Option<PaymentIntentRef>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(PaymentIntentRef::id)
    }

    /// Minor currency units; a missing total counts as zero.
    pub fn amount_total(&self) -> i64 {
        self.amount_total.unwrap_or(0)
    }

    pub fn billing_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(BILLING_ID_METADATA_KEY))
            .map(String::as_str)
    }
}
