use payment_relay::configuration::get_configuration;
use payment_relay::startup::Application;
use payment_relay::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let subscriber = get_subscriber(
        "payment_relay".into(),
        "payment_relay=info,tower_http=warn".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    // Panic if we cannot read configuration
    let config = get_configuration().expect("Failed to read configuration.");

    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Payment relay listening");
    application.run().await
}
