use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::PgPool;

use url::Url;

use crate::client::{EmailClient, LogNotifier, Notifier, OpenWeatherClient};
use crate::domain::EmailAddress;
use crate::repo::{InMemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore};
use crate::service::{SubscriptionLinks, Trigger};

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub weather: WeatherSettings,
    pub subscription: SubscriptionSettings,
    pub scheduler: SchedulerSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        let path = env::current_dir()?.join("settings");
        // `APP_ENV` picks the runtime, defaulting to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }

    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from(base_path.join("base")).required(true))
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    base_url: String,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
    /// Public links handed out to subscribers, rooted at `base_url`
    pub fn links(&self) -> anyhow::Result<SubscriptionLinks> {
        let base_url = Url::parse(&self.base_url).context("Failed to parse app base URL")?;
        Ok(SubscriptionLinks::new(base_url))
    }
}

/// Where subscriptions are kept
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local, lost on restart
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    backend: StoreBackend,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    require_ssl: bool,
}

impl DatabaseSettings {
    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        use secrecy::ExposeSecret;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }
    /// The database connection options, with the database name
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }
    /// Open the configured subscription store, migrating Postgres up to date
    pub async fn store(&self) -> anyhow::Result<Arc<dyn SubscriptionStore>> {
        match self.backend {
            StoreBackend::Postgres => {
                let pool = PgPool::connect_with(self.with_db())
                    .await
                    .context("Failed to connect to Postgres")?;
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                Ok(Arc::new(PgSubscriptionStore::new(pool)))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory subscription store, nothing will be persisted");
                Ok(Arc::new(InMemorySubscriptionStore::new()))
            }
        }
    }
}

/// How notifications leave the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Templated email API
    Api,
    /// Structured log line only
    Log,
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    delivery: Delivery,
    sender: String,
    api_base_url: String,
    api_auth_token: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl EmailSettings {
    /// The email address to send application emails from
    pub fn sender(&self) -> anyhow::Result<EmailAddress> {
        self.sender
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse email sender address")
    }
    /// The email REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
    /// The base URL for the email REST service
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse email base URL")
    }
    /// Build the configured notifier
    pub fn notifier(&self) -> anyhow::Result<Arc<dyn Notifier>> {
        match self.delivery {
            Delivery::Api => {
                let api_auth_token = self
                    .api_auth_token
                    .clone()
                    .context("email.api_auth_token is required for api delivery")?;
                let client = EmailClient::new(
                    self.sender()?,
                    self.api_timeout(),
                    self.api_base_url()?,
                    api_auth_token,
                )?;
                Ok(Arc::new(client))
            }
            Delivery::Log => Ok(Arc::new(LogNotifier)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherSettings {
    api_base_url: String,
    // Absent key is reported per request, not at startup
    api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    timeout_milliseconds: u64,
    units: String,
    lang: String,
}

impl WeatherSettings {
    /// Build the OpenWeather client
    pub fn client(&self) -> anyhow::Result<OpenWeatherClient> {
        if self.api_key.is_none() {
            tracing::warn!("weather.api_key is not set, weather lookups will fail");
        }
        let api_base_url =
            Url::parse(&self.api_base_url).context("Failed to parse weather base URL")?;

        OpenWeatherClient::new(
            api_base_url,
            self.api_key.clone(),
            Duration::from_millis(self.timeout_milliseconds),
            self.units.clone(),
            self.lang.clone(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub token_length: usize,
}

#[derive(Debug, Deserialize)]
pub struct SchedulerSettings {
    pub hourly: Trigger,
    pub daily: Trigger,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    attempt_timeout_milliseconds: u64,
}

impl SchedulerSettings {
    /// Upper bound on each weather fetch and each send
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_milliseconds)
    }
}
