use std::sync::Arc;

use serde::Serialize;

use crate::client::{Notification, Notifier, NotifyError};
use crate::crypto::SubscriptionToken;
use crate::model::NewSubscription;
use crate::repo::{StoreError, SubscriptionStore};

use super::SubscriptionLinks;

/// How many fresh tokens to try before giving up on an insert
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

const INVALID_TOKEN: &str = "Invalid token";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeResponse {
    pub message: String,
}

/// Result of an operation keyed by a subscription token.
/// An unknown token is a regular `success: false` outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
}

impl TokenResponse {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }

    fn invalid_token() -> Self {
        Self::new(false, INVALID_TOKEN)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("Email already subscribed")]
    Conflict,
    #[error("Failed to generate a unique subscription token")]
    TokenSpaceExhausted,
    #[error("Failed to send confirmation email")]
    ConfirmationNotSent(#[source] NotifyError),
    #[error("Failed to build subscription link")]
    Link(#[from] url::ParseError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SubscribeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmailTaken => Self::Conflict,
            other => Self::Store(other),
        }
    }
}

/// Owns the subscription lifecycle: subscribe, confirm, unsubscribe
pub struct SubscriptionManager {
    store: Arc<dyn SubscriptionStore>,
    notifier: Arc<dyn Notifier>,
    links: SubscriptionLinks,
    token_length: usize,
}

impl SubscriptionManager {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        notifier: Arc<dyn Notifier>,
        links: SubscriptionLinks,
        token_length: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            links,
            token_length,
        }
    }

    /// Create an unconfirmed subscription and send the confirmation notification.
    ///
    /// The subscription is kept even when the notification cannot be delivered;
    /// the caller is told through [`SubscribeError::ConfirmationNotSent`].
    #[tracing::instrument(
        name = "Create a new subscription",
        skip(self, new_subscription),
        fields(
            subscriber_email = %new_subscription.email,
            city = %new_subscription.city,
            frequency = %new_subscription.frequency,
        )
    )]
    pub async fn subscribe(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<SubscribeResponse, SubscribeError> {
        if self
            .store
            .find_by_email(&new_subscription.email)
            .await?
            .is_some()
        {
            return Err(SubscribeError::Conflict);
        }

        let token = self.insert_with_fresh_token(&new_subscription).await?;

        let notification = Notification::Confirmation {
            confirmation_link: self.links.confirm(token.as_ref())?,
            unsubscribe_link: self.links.unsubscribe(token.as_ref())?,
        };
        self.notifier
            .send(&new_subscription.email, &notification)
            .await
            .map_err(SubscribeError::ConfirmationNotSent)?;

        Ok(SubscribeResponse {
            message: "Confirmation email sent".into(),
        })
    }

    /// Insert the subscription, drawing a new token whenever the previous one collides
    async fn insert_with_fresh_token(
        &self,
        new_subscription: &NewSubscription,
    ) -> Result<SubscriptionToken, SubscribeError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = SubscriptionToken::generate(self.token_length);
            match self.store.insert(new_subscription, &token).await {
                Ok(_) => return Ok(token),
                Err(StoreError::TokenTaken) => {
                    tracing::warn!(attempt, "Subscription token collided, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(SubscribeError::TokenSpaceExhausted)
    }

    /// Confirm the subscription holding `token`. Repeated calls are no-ops.
    #[tracing::instrument(name = "Confirm a subscription by token", skip(self, token))]
    pub async fn confirm(&self, token: &str) -> Result<TokenResponse, StoreError> {
        let Some(subscription) = self.store.find_by_token(token).await? else {
            return Ok(TokenResponse::invalid_token());
        };
        if subscription.confirmed {
            return Ok(TokenResponse::new(true, "Already confirmed"));
        }

        if self.store.confirm_by_token(token).await? {
            return Ok(TokenResponse::new(true, "Subscription confirmed"));
        }

        // Lost a race: either another confirm won or the subscription was removed
        match self.store.find_by_token(token).await? {
            Some(_) => Ok(TokenResponse::new(true, "Already confirmed")),
            None => Ok(TokenResponse::invalid_token()),
        }
    }

    /// Remove the subscription holding `token`
    #[tracing::instrument(name = "Unsubscribe by token", skip(self, token))]
    pub async fn unsubscribe(&self, token: &str) -> Result<TokenResponse, StoreError> {
        if self.store.delete_by_token(token).await? {
            Ok(TokenResponse::new(true, "Unsubscribed successfully"))
        } else {
            Ok(TokenResponse::invalid_token())
        }
    }
}
