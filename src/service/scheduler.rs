use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use serde::Deserialize;
use serde_aux::prelude::*;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{Notification, Notifier, NotifyError, WeatherError, WeatherProvider};
use crate::domain::{EmailAddress, Frequency};
use crate::model::Subscription;
use crate::repo::{StoreError, SubscriptionStore};

use super::SubscriptionLinks;

/// When a periodic delivery task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Trigger {
    /// Fixed interval between the end of one tick and the start of the next
    Every {
        #[serde(deserialize_with = "deserialize_number_from_string")]
        every_seconds: u64,
    },
    /// Once a day at a wall-clock time, UTC
    DailyAt { at: NaiveTime },
}

impl Trigger {
    /// Time left from `now` until the trigger next fires
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Trigger::Every { every_seconds } => Duration::from_secs(every_seconds.max(1)),
            Trigger::DailyAt { at } => {
                let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
                let next = if today > now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                };
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Outcome counts of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Why one subscriber's delivery failed; never escapes the tick
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Stored email is invalid: {0}")]
    InvalidEmail(String),
    #[error("Failed to fetch weather")]
    Weather(#[from] WeatherError),
    #[error("Subscription is no longer active")]
    Gone,
    #[error("Failed to build unsubscribe link")]
    Link(#[from] url::ParseError),
    #[error("Failed to send weather update")]
    Notify(#[from] NotifyError),
    #[error("Failed to look up subscription")]
    Store(#[from] StoreError),
    #[error("{0} timed out")]
    TimedOut(&'static str),
}

/// Periodically sends weather updates to confirmed subscribers, one task per frequency
pub struct DeliveryScheduler {
    store: Arc<dyn SubscriptionStore>,
    weather: Arc<dyn WeatherProvider>,
    notifier: Arc<dyn Notifier>,
    links: SubscriptionLinks,
    attempt_timeout: Duration,
}

impl DeliveryScheduler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        weather: Arc<dyn WeatherProvider>,
        notifier: Arc<dyn Notifier>,
        links: SubscriptionLinks,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            weather,
            notifier,
            links,
            attempt_timeout,
        }
    }

    /// Spawn the hourly and daily delivery tasks on the current runtime
    pub fn start(self: Arc<Self>, hourly: Trigger, daily: Trigger) -> SchedulerHandle {
        let shutdown = CancellationToken::new();

        let hourly = tokio::spawn(self.clone().run_periodic(
            Frequency::Hourly,
            hourly,
            shutdown.clone(),
        ));
        let daily = tokio::spawn(self.run_periodic(Frequency::Daily, daily, shutdown.clone()));

        SchedulerHandle {
            shutdown,
            hourly,
            daily,
        }
    }

    async fn run_periodic(
        self: Arc<Self>,
        frequency: Frequency,
        trigger: Trigger,
        shutdown: CancellationToken,
    ) {
        tracing::info!(%frequency, ?trigger, "Weather update task started");

        loop {
            let delay = trigger.delay_from(Utc::now());
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            // An in-flight tick is abandoned on shutdown
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.tick(frequency) => {}
            }
        }

        tracing::info!(%frequency, "Weather update task stopped");
    }

    /// Deliver one weather update to every confirmed subscriber of `frequency`.
    /// Each subscriber is its own unit of work; a failure is logged and skipped.
    #[tracing::instrument(name = "Weather update tick", skip(self))]
    pub async fn tick(&self, frequency: Frequency) -> TickSummary {
        let mut summary = TickSummary::default();

        let subscriptions = match self.store.fetch_confirmed(frequency).await {
            Ok(subscriptions) => subscriptions,
            Err(error) => {
                tracing::error!(
                    error.cause_chain = ?error,
                    "Failed to load confirmed subscriptions, skipping tick"
                );
                return summary;
            }
        };

        for subscription in &subscriptions {
            match self.deliver(subscription).await {
                Ok(()) => {
                    summary.delivered += 1;
                    tracing::info!("Weather update sent to {}", subscription.email);
                }
                Err(error) => {
                    summary.failed += 1;
                    tracing::error!(
                        error.cause_chain = ?error,
                        "Failed to send update to {}: {}",
                        subscription.email,
                        error
                    );
                }
            }
        }

        tracing::info!(
            delivered = summary.delivered,
            failed = summary.failed,
            "Weather update tick finished"
        );
        summary
    }

    async fn deliver(&self, subscription: &Subscription) -> Result<(), DeliveryError> {
        let recipient: EmailAddress = subscription
            .email
            .parse()
            .map_err(DeliveryError::InvalidEmail)?;

        let weather = self
            .with_timeout("Weather fetch", self.weather.fetch_weather(&subscription.city))
            .await??;

        // The subscriber may have unsubscribed while the tick was running
        match self.store.find_by_token(&subscription.token).await? {
            Some(current) if current.confirmed => {}
            _ => return Err(DeliveryError::Gone),
        }

        let notification = Notification::WeatherUpdate {
            city: subscription.city.clone(),
            weather,
            unsubscribe_link: self.links.unsubscribe(&subscription.token)?,
        };

        self.with_timeout("Weather update send", self.notifier.send(&recipient, &notification))
            .await??;

        Ok(())
    }

    async fn with_timeout<F: Future>(
        &self,
        stage: &'static str,
        attempt: F,
    ) -> Result<F::Output, DeliveryError> {
        tokio::time::timeout(self.attempt_timeout, attempt)
            .await
            .map_err(|_| DeliveryError::TimedOut(stage))
    }
}

/// Owns the two running delivery tasks
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    hourly: JoinHandle<()>,
    daily: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop both tasks and wait for them to exit
    pub async fn shutdown(self) {
        self.shutdown.cancel();

        for (frequency, task) in [(Frequency::Hourly, self.hourly), (Frequency::Daily, self.daily)] {
            if let Err(error) = task.await {
                tracing::error!(%frequency, error.cause_chain = ?error, "Weather update task panicked");
            }
        }
    }
}
