pub mod billing_store;
pub mod configuration;
pub mod confirmation;
pub mod domain;
pub mod processor_client;
pub mod routes;
pub mod startup;
pub mod state;
pub mod telemetry;

pub use startup::app;
