use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::transactions::{InsertTransactionEntity, TransactionEntity},
    value_objects::enums::transaction_statuses::ClosureReason,
};

#[async_trait]
#[automock]
pub trait TransactionRepository {
    async fn create(&self, insert_transaction_entity: InsertTransactionEntity) -> Result<Uuid>;

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>>;

    async fn list_for_account(&self, account_id: i64) -> Result<Vec<TransactionEntity>>;

    /// Records the gateway charge against the row once the vendor accepted it.
    async fn mark_paid(&self, transaction_id: Uuid, vendor_transaction_id: String) -> Result<()>;

    /// Writes the terminal result and `completed_at` in one conditional
    /// update (`where result is null`). Returns false when the row was
    /// already closed, so a user decline racing the expiry sweep closes the
    /// row exactly once.
    async fn close_if_open(
        &self,
        transaction_id: Uuid,
        reason: ClosureReason,
        currency_rewarded: Option<i32>,
        currency_rewarded_items: Option<i32>,
    ) -> Result<bool>;

    /// Open transactions created before the cutoff, for the expiry sweep.
    async fn list_stale_open(&self, cutoff: DateTime<Utc>) -> Result<Vec<TransactionEntity>>;
}
