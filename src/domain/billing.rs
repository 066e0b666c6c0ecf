use chrono::{DateTime, Utc};

/// Identifier of a local billing row, carried in the session metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingId(String);

impl BillingId {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().is_empty() {
            return None;
        }
        Some(Self(s.to_string()))
    }
}

impl AsRef<str> for BillingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BillingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Status written to a billing row once its payment is confirmed.
pub const PAID_STATUS: &str = "paid";

/// Marks one billing row as paid.
#[derive(Clone, Debug)]
pub struct BillingUpdate {
    pub billing_id: BillingId,
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
}
