use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    value_objects::enums::subscription_statuses::{SubscriptionClosure, SubscriptionStatus},
};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn create(&self, insert_subscription_entity: InsertSubscriptionEntity) -> Result<Uuid>;

    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn list_for_account(&self, account_id: i64) -> Result<Vec<SubscriptionEntity>>;

    /// `new -> active` transition, conditional on the row still being new.
    async fn activate_if_new(
        &self,
        subscription_id: Uuid,
        first_charge_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Closes the row with a reason, conditional on the expected status.
    async fn close_if_status(
        &self,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        reason: SubscriptionClosure,
    ) -> Result<bool>;

    /// Successful recurring charge: bumps `last_charge_at` and resets the
    /// consecutive-failure counter.
    async fn record_successful_charge(
        &self,
        subscription_id: Uuid,
        charged_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Failed recurring charge: increments and returns the consecutive
    /// failure counter.
    async fn record_failed_charge(&self, subscription_id: Uuid) -> Result<i32>;

    /// Active subscriptions whose billing interval has elapsed at `now`.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>>;
}
