use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::billing_store::{BillingStore, PostgresBillingStore, PostgrestBillingStore};
use crate::configuration::{BillingStoreSettings, ProcessorSettings, Settings};
use crate::confirmation::ConfirmationError;
use crate::processor_client::ProcessorClient;
use crate::routes::{health_check, verify_payment};
use crate::state::AppState;

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let processor = build_processor_client(&config.processor)?;
        let billing_store = build_billing_store(&config.billing_store)?;
        let state = AppState {
            processor,
            billing_store,
            request_timeout: config.application.request_timeout(),
        };

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address).await?;
        let port = listener.local_addr()?.port();
        let router = app(state);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run(self) -> Result<(), std::io::Error> {
        axum::serve(self.listener, self.router).await
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .route("/api/verify-payment", get(verify_payment))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = details, "Request handler panicked");
    ConfirmationError::UnknownFault.into_response()
}

pub fn build_processor_client(
    settings: &ProcessorSettings,
) -> Result<ProcessorClient, std::io::Error> {
    let base_url = settings.base_url().map_err(std::io::Error::other)?;
    ProcessorClient::new(
        base_url,
        settings.secret_key.clone(),
        settings.api_version.clone(),
        settings.timeout(),
    )
    .map_err(std::io::Error::other)
}

pub fn build_billing_store(
    settings: &BillingStoreSettings,
) -> Result<Arc<dyn BillingStore>, std::io::Error> {
    match settings {
        BillingStoreSettings::Postgrest(postgrest) => {
            let base_url = postgrest.base_url().map_err(std::io::Error::other)?;
            let store = PostgrestBillingStore::new(
                base_url,
                postgrest.api_key.clone(),
                postgrest.table.clone(),
                postgrest.timeout(),
            )
            .map_err(std::io::Error::other)?;
            Ok(Arc::new(store))
        }
        BillingStoreSettings::Postgres(database) => {
            // Connections are opened on first use
            let db_pool = PgPoolOptions::new()
                .acquire_timeout(Duration::from_secs(2))
                .connect_lazy_with(database.with_db());
            Ok(Arc::new(PostgresBillingStore::new(db_pool)))
        }
    }
}
