use uuid::Uuid;

use sqlx::PgPool;

use crate::crypto::SubscriptionToken;
use crate::domain::{EmailAddress, Frequency};
use crate::model::{NewSubscription, Subscription};

const EMAIL_CONSTRAINT: &str = "subscriptions_email_key";
const TOKEN_CONSTRAINT: &str = "subscriptions_token_key";

const SUBSCRIPTION_COLUMNS: &str =
    "id, email, city, frequency, token, confirmed, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A subscription already exists for this email")]
    EmailTaken,
    #[error("Subscription token is already in use")]
    TokenTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Subscription store, keyed both by email and by token.
/// NOTE: Implementations must enforce uniqueness of both keys atomically on insert;
/// callers never lock around store calls.
#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Look a subscription up by its (normalized) email
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Subscription>>;

    /// Look a subscription up by its token
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<Subscription>>;

    /// Insert a new, unconfirmed subscription
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &SubscriptionToken,
    ) -> StoreResult<Subscription>;

    /// Mark the subscription confirmed.
    /// Returns `false` if no unconfirmed subscription holds this token.
    async fn confirm_by_token(&self, token: &str) -> StoreResult<bool>;

    /// Delete the subscription holding this token, returns `false` if there was none
    async fn delete_by_token(&self, token: &str) -> StoreResult<bool>;

    /// Fetch every confirmed subscription with the given frequency
    async fn fetch_confirmed(&self, frequency: Frequency) -> StoreResult<Vec<Subscription>>;
}

/// Postgres Subscription store
#[derive(Debug, Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    #[tracing::instrument(name = "Fetch subscription by email", skip(self))]
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Subscription>> {
        let query = format!("select {SUBSCRIPTION_COLUMNS} from subscriptions where email=$1");
        let subscription = sqlx::query_as::<_, Subscription>(&query)
            .bind(email.as_ref())
            .fetch_optional(&self.pool)
            .await?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Fetch subscription by token", skip(self, token))]
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<Subscription>> {
        let query = format!("select {SUBSCRIPTION_COLUMNS} from subscriptions where token=$1");
        let subscription = sqlx::query_as::<_, Subscription>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(subscription)
    }

    #[tracing::instrument(name = "Insert subscription", skip(self, token))]
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &SubscriptionToken,
    ) -> StoreResult<Subscription> {
        let query = format!(
            "insert into subscriptions(id, email, city, frequency, token) \
             values ($1, $2, $3, $4, $5) returning {SUBSCRIPTION_COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(Uuid::new_v4())
            .bind(new_subscription.email.as_ref())
            .bind(new_subscription.city.as_ref())
            .bind(new_subscription.frequency)
            .bind(token.as_ref())
            .fetch_one(&self.pool)
            .await
            .map_err(classify_insert_error)
    }

    #[tracing::instrument(name = "Confirm subscription by token", skip(self, token))]
    async fn confirm_by_token(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "update subscriptions set confirmed=true where token=$1 and confirmed=false",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Delete subscription by token", skip(self, token))]
    async fn delete_by_token(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("delete from subscriptions where token=$1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Fetch confirmed subscriptions", skip(self))]
    async fn fetch_confirmed(&self, frequency: Frequency) -> StoreResult<Vec<Subscription>> {
        let query = format!(
            "select {SUBSCRIPTION_COLUMNS} from subscriptions where frequency=$1 and confirmed"
        );
        let subscriptions = sqlx::query_as::<_, Subscription>(&query)
            .bind(frequency)
            .fetch_all(&self.pool)
            .await?;

        Ok(subscriptions)
    }
}

/// Tell the two unique-key violations apart from any other database failure
fn classify_insert_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            match db_error.constraint() {
                Some(EMAIL_CONSTRAINT) => return StoreError::EmailTaken,
                Some(TOKEN_CONSTRAINT) => return StoreError::TokenTaken,
                _ => {}
            }
        }
    }
    StoreError::Database(error)
}
