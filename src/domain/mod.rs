mod billing;
mod checkout_session;
mod session_id;

pub use billing::{BillingId, BillingUpdate, PAID_STATUS};
pub use checkout_session::{
    BILLING_ID_METADATA_KEY, CheckoutSession, PaymentIntentRef, PaymentStatus,
};
pub use session_id::SessionId;
