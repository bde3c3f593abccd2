use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::transaction_statuses::TransactionStatus, payment_methods::PaymentMethod,
    transaction_items::TransactionItem,
};
use crate::infrastructure::postgres::schema::billing_transactions;

/// One-off purchase row. A NULL `result` means the transaction is still open;
/// `completed_at` is set exactly once, when the terminal result is written.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = billing_transactions)]
pub struct TransactionEntity {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method_kind: String,
    pub payment_method_ref: Option<String>,
    pub amount_usd_minor: i32,
    pub amount_usd_items_minor: i32,
    pub currency_quoted: i32,
    pub currency_rewarded: Option<i32>,
    pub currency_rewarded_items: Option<i32>,
    pub purchase_description: String,
    pub recurring_interval: Option<i32>,
    pub subscription_id: Option<Uuid>,
    pub items_json: Option<serde_json::Value>,
    pub vendor_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = billing_transactions)]
pub struct InsertTransactionEntity {
    pub id: Uuid,
    pub account_id: i64,
    pub payment_method_kind: String,
    pub payment_method_ref: Option<String>,
    pub amount_usd_minor: i32,
    pub amount_usd_items_minor: i32,
    pub currency_quoted: i32,
    pub purchase_description: String,
    pub recurring_interval: Option<i32>,
    pub subscription_id: Option<Uuid>,
    pub items_json: Option<serde_json::Value>,
}

impl TransactionEntity {
    pub fn status(&self) -> TransactionStatus {
        match self.result.as_deref() {
            None => TransactionStatus::Open,
            Some("fulfilled") => TransactionStatus::Fulfilled,
            Some("user_declined") => TransactionStatus::UserDeclined,
            Some("vendor_refused") => TransactionStatus::VendorRefused,
            _ => TransactionStatus::Expired,
        }
    }

    pub fn is_open(&self) -> bool {
        self.result.is_none()
    }

    pub fn payment_method(&self) -> Result<PaymentMethod> {
        PaymentMethod::from_columns(&self.payment_method_kind, self.payment_method_ref.clone())
            .context("stored payment method is invalid")
    }

    pub fn total_price_usd_minor(&self) -> i32 {
        self.amount_usd_minor + self.amount_usd_items_minor
    }

    pub fn total_rewarded(&self) -> i32 {
        self.currency_rewarded.unwrap_or(0) + self.currency_rewarded_items.unwrap_or(0)
    }

    pub fn items(&self) -> Result<Vec<TransactionItem>> {
        match &self.items_json {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .context("stored items_json does not deserialize"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransactionEntity {
        TransactionEntity {
            id: Uuid::new_v4(),
            account_id: 1,
            payment_method_kind: "card".to_string(),
            payment_method_ref: Some("profile-1".to_string()),
            amount_usd_minor: 1000,
            amount_usd_items_minor: 500,
            currency_quoted: 30,
            currency_rewarded: None,
            currency_rewarded_items: None,
            purchase_description: "30 mako".to_string(),
            recurring_interval: None,
            subscription_id: None,
            items_json: None,
            vendor_transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
            completed_at: None,
            result: None,
        }
    }

    #[test]
    fn open_transaction_has_no_completion_timestamp() {
        let entity = sample();
        assert_eq!(entity.status(), TransactionStatus::Open);
        assert!(entity.is_open());
        assert!(entity.completed_at.is_none());
    }

    #[test]
    fn result_column_maps_to_terminal_statuses() {
        let mut entity = sample();
        for (raw, status) in [
            ("fulfilled", TransactionStatus::Fulfilled),
            ("user_declined", TransactionStatus::UserDeclined),
            ("vendor_refused", TransactionStatus::VendorRefused),
            ("expired", TransactionStatus::Expired),
        ] {
            entity.result = Some(raw.to_string());
            assert_eq!(entity.status(), status);
            assert!(!entity.is_open());
        }
    }

    #[test]
    fn totals_combine_currency_and_item_amounts() {
        let mut entity = sample();
        assert_eq!(entity.total_price_usd_minor(), 1500);
        entity.currency_rewarded = Some(32);
        entity.currency_rewarded_items = Some(3);
        assert_eq!(entity.total_rewarded(), 35);
    }

    #[test]
    fn items_round_trip_through_json() {
        let mut entity = sample();
        let items = vec![TransactionItem {
            code: "hideaway".to_string(),
            name: "Hideaway".to_string(),
            quantity: 1,
            price_usd_minor: 500,
            currency_value: 15,
        }];
        entity.items_json = Some(serde_json::to_value(&items).unwrap());
        assert_eq!(entity.items().unwrap(), items);
    }
}
