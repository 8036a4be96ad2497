use serde_json::json;

use url::Url;

use crate::domain::{EmailAddress, WeatherSnapshot};

pub const CONFIRMATION_TEMPLATE: &str = "confirmation";
pub const WEATHER_UPDATE_TEMPLATE: &str = "weather-update";

/// A templated message for a single recipient
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Sent once, right after subscribing
    Confirmation {
        confirmation_link: Url,
        unsubscribe_link: Url,
    },
    /// Sent on every scheduled tick of the subscriber's cadence
    WeatherUpdate {
        city: String,
        weather: WeatherSnapshot,
        unsubscribe_link: Url,
    },
}

impl Notification {
    /// Identifier of the template the message is rendered with
    pub fn template_id(&self) -> &'static str {
        match self {
            Self::Confirmation { .. } => CONFIRMATION_TEMPLATE,
            Self::WeatherUpdate { .. } => WEATHER_UPDATE_TEMPLATE,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::Confirmation { .. } => "Confirm your weather subscription".into(),
            Self::WeatherUpdate { city, .. } => format!("Weather update for {}", city),
        }
    }

    /// Values substituted into the template
    pub fn context(&self) -> serde_json::Value {
        match self {
            Self::Confirmation {
                confirmation_link,
                unsubscribe_link,
            } => json!({
                "confirmationLink": confirmation_link.as_str(),
                "unsubscribeLink": unsubscribe_link.as_str(),
            }),
            Self::WeatherUpdate {
                city,
                weather,
                unsubscribe_link,
            } => json!({
                "city": city,
                "temperature": weather.temperature,
                "humidity": weather.humidity,
                "description": weather.description,
                "unsubscribeLink": unsubscribe_link.as_str(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to send email: {0}")]
    Request(#[from] reqwest::Error),
    /// Transport accepted the call but refused the message
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Delivers notifications to recipients.
/// Which implementation runs is picked once at startup from settings.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &EmailAddress,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}
