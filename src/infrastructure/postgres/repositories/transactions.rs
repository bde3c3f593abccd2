use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::transactions::{InsertTransactionEntity, TransactionEntity},
        repositories::transactions::TransactionRepository,
        value_objects::enums::transaction_statuses::ClosureReason,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::billing_transactions},
};

pub struct TransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TransactionRepository for TransactionPostgres {
    async fn create(&self, insert_transaction_entity: InsertTransactionEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let transaction_id = insert_into(billing_transactions::table)
            .values(&insert_transaction_entity)
            .returning(billing_transactions::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(transaction_id)
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = billing_transactions::table
            .filter(billing_transactions::id.eq(transaction_id))
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_for_account(&self, account_id: i64) -> Result<Vec<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = billing_transactions::table
            .filter(billing_transactions::account_id.eq(account_id))
            .order(billing_transactions::created_at.asc())
            .select(TransactionEntity::as_select())
            .load::<TransactionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_paid(&self, transaction_id: Uuid, vendor_transaction_id: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(billing_transactions::table)
            .filter(billing_transactions::id.eq(transaction_id))
            .set((
                billing_transactions::vendor_transaction_id.eq(Some(vendor_transaction_id)),
                billing_transactions::paid_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn close_if_open(
        &self,
        transaction_id: Uuid,
        reason: ClosureReason,
        currency_rewarded: Option<i32>,
        currency_rewarded_items: Option<i32>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(billing_transactions::table)
            .filter(billing_transactions::id.eq(transaction_id))
            .filter(billing_transactions::result.is_null())
            .set((
                billing_transactions::result.eq(Some(reason.as_str())),
                billing_transactions::completed_at.eq(Some(Utc::now())),
                billing_transactions::currency_rewarded.eq(currency_rewarded),
                billing_transactions::currency_rewarded_items.eq(currency_rewarded_items),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn list_stale_open(&self, cutoff: DateTime<Utc>) -> Result<Vec<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = billing_transactions::table
            .filter(billing_transactions::result.is_null())
            .filter(billing_transactions::paid_at.is_null())
            .filter(billing_transactions::created_at.lt(cutoff))
            .select(TransactionEntity::as_select())
            .load::<TransactionEntity>(&mut conn)?;

        Ok(results)
    }
}
