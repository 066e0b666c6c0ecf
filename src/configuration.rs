use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::time::Duration;
use url::Url;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub processor: ProcessorSettings,
    pub billing_store: BillingStoreSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_milliseconds: u64,
}

impl ApplicationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct ProcessorSettings {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub api_version: String,
    pub timeout_milliseconds: u64,
}

impl ProcessorSettings {
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

/// Where billing records live. Selected by the `kind` key.
#[derive(serde::Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingStoreSettings {
    Postgrest(PostgrestSettings),
    Postgres(DatabaseSettings),
}

#[derive(serde::Deserialize, Clone)]
pub struct PostgrestSettings {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub table: String,
    pub timeout_milliseconds: u64,
}

impl PostgrestSettings {
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        // Search for file named `configuration`
        .add_source(config::File::with_name("configuration"))
        // e.g. `APP_PROCESSOR__SECRET_KEY=sk_live_...` overrides `processor.secret_key`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
