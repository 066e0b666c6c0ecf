use crate::billing_store::BillingStore;
use crate::processor_client::ProcessorClient;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)] // Important for state sharing
pub struct AppState {
    pub processor: ProcessorClient,
    pub billing_store: Arc<dyn BillingStore>,
    /// Deadline for one whole verification, both outbound calls included.
    pub request_timeout: Duration,
}
