/// Subscription lifecycle endpoints
pub mod subscriptions;
/// Current weather endpoint
pub mod weather;
