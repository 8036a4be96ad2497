use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use weather_subscriptions::app;
use weather_subscriptions::client::WeatherProvider;
use weather_subscriptions::service::{DeliveryScheduler, SubscriptionManager};
use weather_subscriptions::settings::Settings;
use weather_subscriptions::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let store = settings.database.store().await?;
    let notifier = settings.email.notifier()?;
    let weather: Arc<dyn WeatherProvider> = Arc::new(settings.weather.client()?);
    let links = settings.app.links()?;

    let manager = SubscriptionManager::new(
        store.clone(),
        notifier.clone(),
        links.clone(),
        settings.subscription.token_length,
    );

    let scheduler = Arc::new(DeliveryScheduler::new(
        store,
        weather.clone(),
        notifier,
        links,
        settings.scheduler.attempt_timeout(),
    ));
    let scheduler = scheduler.start(settings.scheduler.hourly, settings.scheduler.daily);

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let served = app::run(listener, manager, weather)?
        .await
        .context("Failed to run app");

    scheduler.shutdown().await;

    served
}
