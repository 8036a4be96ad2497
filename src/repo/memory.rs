use std::collections::HashMap;

use chrono::Utc;

use tokio::sync::RwLock;

use uuid::Uuid;

use crate::crypto::SubscriptionToken;
use crate::domain::{EmailAddress, Frequency};
use crate::model::{NewSubscription, Subscription};

use super::{StoreError, StoreResult, SubscriptionStore};

/// Subscription store held in process memory.
/// Both unique indexes live behind one lock so inserts check and claim them atomically.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    // email -> record
    by_email: HashMap<String, Subscription>,
    // token -> email
    by_token: HashMap<String, String>,
}

impl Tables {
    fn get_by_token(&self, token: &str) -> Option<&Subscription> {
        self.by_token
            .get(token)
            .and_then(|email| self.by_email.get(email))
    }
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored subscription, in no particular order
    pub async fn all(&self) -> Vec<Subscription> {
        self.tables.read().await.by_email.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Subscription>> {
        Ok(self.tables.read().await.by_email.get(email.as_ref()).cloned())
    }

    async fn find_by_token(&self, token: &str) -> StoreResult<Option<Subscription>> {
        Ok(self.tables.read().await.get_by_token(token).cloned())
    }

    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &SubscriptionToken,
    ) -> StoreResult<Subscription> {
        let mut tables = self.tables.write().await;

        if tables.by_email.contains_key(new_subscription.email.as_ref()) {
            return Err(StoreError::EmailTaken);
        }
        if tables.by_token.contains_key(token.as_ref()) {
            return Err(StoreError::TokenTaken);
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            email: new_subscription.email.as_ref().to_string(),
            city: new_subscription.city.as_ref().to_string(),
            frequency: new_subscription.frequency,
            token: token.as_ref().to_string(),
            confirmed: false,
            created_at: now,
            updated_at: now,
        };

        tables
            .by_token
            .insert(subscription.token.clone(), subscription.email.clone());
        tables
            .by_email
            .insert(subscription.email.clone(), subscription.clone());

        Ok(subscription)
    }

    async fn confirm_by_token(&self, token: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        let Some(email) = tables.by_token.get(token).cloned() else {
            return Ok(false);
        };

        match tables.by_email.get_mut(&email) {
            Some(subscription) if !subscription.confirmed => {
                subscription.confirmed = true;
                subscription.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_token(&self, token: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        match tables.by_token.remove(token) {
            Some(email) => Ok(tables.by_email.remove(&email).is_some()),
            None => Ok(false),
        }
    }

    async fn fetch_confirmed(&self, frequency: Frequency) -> StoreResult<Vec<Subscription>> {
        let tables = self.tables.read().await;

        Ok(tables
            .by_email
            .values()
            .filter(|s| s.confirmed && s.frequency == frequency)
            .cloned()
            .collect())
    }
}
