use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
        repositories::subscriptions::SubscriptionRepository,
        value_objects::enums::subscription_statuses::{SubscriptionClosure, SubscriptionStatus},
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::billing_subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn create(&self, insert_subscription_entity: InsertSubscriptionEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription_id = insert_into(billing_subscriptions::table)
            .values(&insert_subscription_entity)
            .returning(billing_subscriptions::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(subscription_id)
    }

    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = billing_subscriptions::table
            .filter(billing_subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_for_account(&self, account_id: i64) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = billing_subscriptions::table
            .filter(billing_subscriptions::account_id.eq(account_id))
            .order(billing_subscriptions::created_at.asc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn activate_if_new(
        &self,
        subscription_id: Uuid,
        first_charge_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(billing_subscriptions::table)
            .filter(billing_subscriptions::id.eq(subscription_id))
            .filter(billing_subscriptions::status.eq(SubscriptionStatus::New.as_str()))
            .set((
                billing_subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
                billing_subscriptions::last_charge_at.eq(Some(first_charge_at)),
                billing_subscriptions::charge_attempts.eq(0),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn close_if_status(
        &self,
        subscription_id: Uuid,
        expected: SubscriptionStatus,
        reason: SubscriptionClosure,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(billing_subscriptions::table)
            .filter(billing_subscriptions::id.eq(subscription_id))
            .filter(billing_subscriptions::status.eq(expected.as_str()))
            .set((
                billing_subscriptions::status.eq(SubscriptionStatus::Closed.as_str()),
                billing_subscriptions::closure_reason.eq(Some(reason.as_str())),
                billing_subscriptions::closed_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn record_successful_charge(
        &self,
        subscription_id: Uuid,
        charged_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(billing_subscriptions::table)
            .filter(billing_subscriptions::id.eq(subscription_id))
            .set((
                billing_subscriptions::last_charge_at.eq(Some(charged_at)),
                billing_subscriptions::charge_attempts.eq(0),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn record_failed_charge(&self, subscription_id: Uuid) -> Result<i32> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let attempts = update(billing_subscriptions::table)
            .filter(billing_subscriptions::id.eq(subscription_id))
            .set(
                billing_subscriptions::charge_attempts
                    .eq(billing_subscriptions::charge_attempts + 1),
            )
            .returning(billing_subscriptions::charge_attempts)
            .get_result::<i32>(&mut conn)?;

        Ok(attempts)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let active = billing_subscriptions::table
            .filter(billing_subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        // The interval lives per-row, so the elapsed check happens here
        // rather than in SQL.
        Ok(active
            .into_iter()
            .filter(|subscription| subscription.is_due(now))
            .collect())
    }
}
