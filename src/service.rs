mod links;
mod scheduler;
mod subscriptions;


pub use links::SubscriptionLinks;
pub use scheduler::{DeliveryError, DeliveryScheduler, SchedulerHandle, TickSummary, Trigger};
pub use subscriptions::{
    SubscribeError, SubscribeResponse, SubscriptionManager, TokenResponse, MAX_TOKEN_ATTEMPTS,
};
