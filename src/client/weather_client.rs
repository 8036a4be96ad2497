use std::time::Duration;

use anyhow::Context;

use reqwest::{Client, StatusCode};

use secrecy::Secret;

use serde::Deserialize;

use url::Url;

use crate::domain::WeatherSnapshot;

/// Classified failures of a weather lookup
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("City name is required")]
    EmptyCity,
    #[error("City \"{0}\" not found")]
    CityNotFound(String),
    #[error("Invalid Weather API key")]
    Unauthorized,
    #[error("Weather API request limit exceeded")]
    RateLimited,
    #[error("Failed to fetch weather data")]
    Failed(#[source] anyhow::Error),
    // Configuration problem, not an upstream one
    #[error("Weather API key is not configured")]
    MissingApiKey,
}

/// Source of current weather conditions
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;
}

/// Client for the OpenWeather current weather API
#[derive(Debug)]
pub struct OpenWeatherClient {
    client: Client,
    api_current_weather_url: Url,
    api_key: Option<Secret<String>>,
    units: String,
    lang: String,
}

impl OpenWeatherClient {
    pub fn new(
        api_base_url: Url,
        api_key: Option<Secret<String>>,
        api_timeout: Duration,
        units: String,
        lang: String,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_current_weather_url = api_base_url
            .join("data/2.5/weather")
            .context("Failed to create current weather endpoint URL")?;

        Ok(Self {
            client,
            api_current_weather_url,
            api_key,
            units,
            lang,
        })
    }

    async fn request(&self, city: &str, api_key: &str) -> Result<WeatherSnapshot, WeatherError> {
        let res = self
            .client
            .get(self.api_current_weather_url.clone())
            .query(&[
                ("q", city),
                ("appid", api_key),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .context("Weather API request failed")
            .map_err(WeatherError::Failed)?;

        match res.status() {
            StatusCode::NOT_FOUND => return Err(WeatherError::CityNotFound(city.to_string())),
            StatusCode::UNAUTHORIZED => return Err(WeatherError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(WeatherError::RateLimited),
            _ => {}
        }

        let body: CurrentWeatherResponse = res
            .error_for_status()
            .context("Weather API returned an error status")
            .map_err(WeatherError::Failed)?
            .json()
            .await
            .context("Failed to decode weather API response")
            .map_err(WeatherError::Failed)?;

        body.try_into().map_err(WeatherError::Failed)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[tracing::instrument(name = "Fetch current weather", skip(self))]
    async fn fetch_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        use secrecy::ExposeSecret;

        if city.trim().is_empty() {
            return Err(WeatherError::EmptyCity);
        }
        let api_key = self.api_key.as_ref().ok_or(WeatherError::MissingApiKey)?;

        self.request(city, api_key.expose_secret())
            .await
            .map_err(|error| {
                tracing::error!(error.cause_chain = ?error, "Weather API error for {}", city);
                error
            })
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainReadings,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl TryFrom<CurrentWeatherResponse> for WeatherSnapshot {
    type Error = anyhow::Error;

    fn try_from(res: CurrentWeatherResponse) -> anyhow::Result<Self> {
        let condition = res
            .weather
            .into_iter()
            .next()
            .context("Weather API response has no conditions")?;

        Ok(Self {
            temperature: res.main.temp,
            humidity: res.main.humidity,
            description: condition.description,
        })
    }
}
