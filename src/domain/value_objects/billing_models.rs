use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{
    subscriptions::SubscriptionEntity, transactions::TransactionEntity,
};
use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus,
    enums::transaction_statuses::TransactionStatus, transaction_items::TransactionItem,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionModel {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method: String,
    pub amount_usd_minor: i32,
    pub amount_usd_items_minor: i32,
    pub currency_quoted: i32,
    pub currency_rewarded: Option<i32>,
    pub currency_rewarded_items: Option<i32>,
    pub purchase_description: String,
    pub recurring_interval: Option<i32>,
    pub subscription_id: Option<Uuid>,
    pub items: Vec<TransactionItem>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<TransactionEntity> for TransactionModel {
    fn from(entity: TransactionEntity) -> Self {
        let items = entity.items().unwrap_or_default();
        Self {
            id: entity.id,
            account_id: entity.account_id,
            payment_method: entity.payment_method_kind.clone(),
            amount_usd_minor: entity.amount_usd_minor,
            amount_usd_items_minor: entity.amount_usd_items_minor,
            currency_quoted: entity.currency_quoted,
            currency_rewarded: entity.currency_rewarded,
            currency_rewarded_items: entity.currency_rewarded_items,
            purchase_description: entity.purchase_description.clone(),
            recurring_interval: entity.recurring_interval,
            subscription_id: entity.subscription_id,
            items,
            status: entity.status(),
            created_at: entity.created_at,
            paid_at: entity.paid_at,
            completed_at: entity.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertTransactionModel {
    pub payment_method: String,
    pub profile_id: Option<String>,
    pub amount_usd_minor: i32,
    #[serde(default)]
    pub items: Vec<String>,
    pub recurring_interval: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method: String,
    pub amount_usd_minor: i32,
    pub recurring_interval_days: i32,
    pub status: SubscriptionStatus,
    pub last_charge_at: Option<DateTime<Utc>>,
    pub closure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            account_id: entity.account_id,
            payment_method: entity.payment_method_kind.clone(),
            amount_usd_minor: entity.amount_usd_minor,
            recurring_interval_days: entity.recurring_interval_days,
            status: entity.status(),
            last_charge_at: entity.last_charge_at,
            closure_reason: entity.closure_reason.clone(),
            created_at: entity.created_at,
            closed_at: entity.closed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertSubscriptionModel {
    pub profile_id: String,
    pub amount_usd_minor: i32,
    pub recurring_interval_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteModel {
    pub amount_usd_minor: i32,
    pub account_currency: Option<i32>,
}
