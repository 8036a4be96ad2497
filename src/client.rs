mod email_client;
mod log_notifier;
mod notifier;
mod weather_client;

pub use email_client::EmailClient;
pub use log_notifier::LogNotifier;
pub use notifier::{Notification, Notifier, NotifyError};
pub use weather_client::{OpenWeatherClient, WeatherError, WeatherProvider};
