use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::domain::{CityName, EmailAddress, Frequency};

/// New Subscription request
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: EmailAddress,
    pub city: CityName,
    pub frequency: Frequency,
}

/// Stored Subscription record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscription {
    /// ID of the subscription
    pub id: Uuid,
    /// Normalized on the way in, unique across subscriptions
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    /// Credential for both confirmation and unsubscription
    pub token: String,
    /// Only confirmed subscriptions receive weather updates
    pub confirmed: bool,
    /// Creation and update timestamps
    /// NOTE: Maintained by the store
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
