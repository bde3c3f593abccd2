use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus, payment_methods::PaymentMethod,
};
use crate::infrastructure::postgres::schema::billing_subscriptions;

/// Recurring purchase agreement. Only `active` rows are eligible for the
/// scheduled billing sweep.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = billing_subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method_kind: String,
    pub payment_method_ref: Option<String>,
    pub vendor_profile_id: String,
    pub amount_usd_minor: i32,
    pub recurring_interval_days: i32,
    pub status: String,
    pub last_charge_at: Option<DateTime<Utc>>,
    pub charge_attempts: i32,
    pub closure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = billing_subscriptions)]
pub struct InsertSubscriptionEntity {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method_kind: String,
    pub payment_method_ref: Option<String>,
    pub vendor_profile_id: String,
    pub amount_usd_minor: i32,
    pub recurring_interval_days: i32,
    pub status: String,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn payment_method(&self) -> Result<PaymentMethod> {
        PaymentMethod::from_columns(&self.payment_method_kind, self.payment_method_ref.clone())
            .context("stored payment method is invalid")
    }

    /// Whether the next recurring charge is due. A missing `last_charge_at`
    /// on an active row counts as due so a row can never get stuck.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.status() != SubscriptionStatus::Active {
            return false;
        }
        match self.last_charge_at {
            None => true,
            Some(last) => now - last >= Duration::days(self.recurring_interval_days.into()),
        }
    }
}
