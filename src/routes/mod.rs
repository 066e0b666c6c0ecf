mod health_check;
mod verify_payment;

pub use health_check::health_check;
pub use verify_payment::{ErrorBody, VerifyPaymentParameters, VerifyPaymentResponse, verify_payment};
