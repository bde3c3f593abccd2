use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::transactions::{InsertTransactionEntity, TransactionEntity},
    repositories::transactions::TransactionRepository,
    value_objects::{
        catalogue::ItemCatalogue, enums::transaction_statuses::ClosureReason,
        payment_methods::PaymentMethod, transaction_items::TransactionItem,
    },
};
use crate::usecases::gateways::{CardGateway, FulfillmentService};

/// Smallest accepted purchase, in USD minor units ($5).
pub const MINIMUM_PURCHASE_USD_MINOR: i32 = 500;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction not found")]
    NotFound,
    #[error("transaction belongs to another account")]
    NotYours,
    #[error("transaction is no longer open")]
    NotOpen,
    #[error("amount is below the minimum purchase")]
    BelowMinimum,
    #[error("nothing purchasable was requested")]
    NothingToPurchase,
    #[error("this payment method cannot be charged directly")]
    UnsupportedPaymentMethod,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TransactionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            TransactionError::NotFound => StatusCode::NOT_FOUND,
            TransactionError::NotYours | TransactionError::NotOpen => StatusCode::FORBIDDEN,
            TransactionError::BelowMinimum
            | TransactionError::NothingToPurchase
            | TransactionError::UnsupportedPaymentMethod => StatusCode::BAD_REQUEST,
            TransactionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, TransactionError>;

/// Result of an accept call. A gateway decline is an ordinary outcome the
/// user can retry, not an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcceptOutcome {
    Fulfilled { account_currency_rewarded: i32 },
    PaymentFailed { message: String },
}

pub struct TransactionUseCase<T, G, F>
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    transaction_repo: Arc<T>,
    gateway: Arc<G>,
    fulfillment: Arc<F>,
    catalogue: Arc<ItemCatalogue>,
}

impl<T, G, F> TransactionUseCase<T, G, F>
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    pub fn new(
        transaction_repo: Arc<T>,
        gateway: Arc<G>,
        fulfillment: Arc<F>,
        catalogue: Arc<ItemCatalogue>,
    ) -> Self {
        Self {
            transaction_repo,
            gateway,
            fulfillment,
            catalogue,
        }
    }

    pub async fn quote_account_currency(
        &self,
        amount_usd_minor: i32,
    ) -> UseCaseResult<Option<i32>> {
        if amount_usd_minor < MINIMUM_PURCHASE_USD_MINOR {
            return Err(TransactionError::BelowMinimum);
        }

        let quoted = self
            .fulfillment
            .usd_to_account_currency(amount_usd_minor)
            .await
            .map_err(TransactionError::Internal)?;

        Ok(quoted)
    }

    pub async fn create_transaction(
        &self,
        account_id: i64,
        payment_method: PaymentMethod,
        amount_usd_minor: i32,
        item_codes: &[String],
        recurring_interval: Option<i32>,
    ) -> UseCaseResult<TransactionEntity> {
        if amount_usd_minor < MINIMUM_PURCHASE_USD_MINOR {
            warn!(
                account_id,
                amount_usd_minor, "transactions: purchase below minimum rejected"
            );
            return Err(TransactionError::BelowMinimum);
        }

        let mut purchases: Vec<String> = Vec::new();

        let quoted = self
            .fulfillment
            .usd_to_account_currency(amount_usd_minor)
            .await
            .map_err(TransactionError::Internal)?;

        // The USD amount only counts toward account currency when a quote
        // came back; otherwise the purchase can still proceed on items alone.
        let (currency_quoted, currency_amount_usd_minor) = match quoted {
            Some(quoted) if quoted > 0 => {
                purchases.push(format!("{quoted} mako"));
                (quoted, amount_usd_minor)
            }
            _ => {
                warn!(
                    account_id,
                    amount_usd_minor, "transactions: no account currency quote available"
                );
                (0, 0)
            }
        };

        let mut items: Vec<TransactionItem> = Vec::new();
        let mut amount_usd_items_minor = 0;
        for item_code in item_codes {
            match self.catalogue.lookup(item_code) {
                None => {
                    error!(
                        item_code,
                        "transactions: attempt to purchase non-existent billing item"
                    );
                }
                Some(entry) => {
                    let currency_value = self
                        .fulfillment
                        .usd_to_account_currency(entry.amount_usd_minor)
                        .await
                        .map_err(TransactionError::Internal)?
                        .unwrap_or(0);

                    amount_usd_items_minor += entry.amount_usd_minor;
                    purchases.push(entry.name.clone());
                    items.push(TransactionItem {
                        code: item_code.clone(),
                        name: entry.name.clone(),
                        quantity: 1,
                        price_usd_minor: entry.amount_usd_minor,
                        currency_value,
                    });
                }
            }
        }

        if purchases.is_empty() {
            return Err(TransactionError::NothingToPurchase);
        }

        let items_json = if items.is_empty() {
            None
        } else {
            Some(serde_json::to_value(&items).map_err(|err| anyhow!(err))?)
        };

        let insert_transaction_entity = InsertTransactionEntity {
            id: Uuid::new_v4(),
            account_id,
            payment_method_kind: payment_method.kind().to_string(),
            payment_method_ref: payment_method.reference().map(str::to_string),
            amount_usd_minor: currency_amount_usd_minor,
            amount_usd_items_minor,
            currency_quoted,
            purchase_description: purchases.join(", "),
            recurring_interval,
            subscription_id: None,
            items_json,
        };

        let transaction_id = self
            .transaction_repo
            .create(insert_transaction_entity)
            .await
            .map_err(TransactionError::Internal)?;

        info!(
            %transaction_id,
            account_id,
            currency_quoted,
            item_count = items.len(),
            "transactions: created open transaction"
        );

        self.transaction_repo
            .find_by_id(transaction_id)
            .await
            .map_err(TransactionError::Internal)?
            .ok_or_else(|| {
                TransactionError::Internal(anyhow!(
                    "created transaction {transaction_id} could not be reloaded"
                ))
            })
    }

    pub async fn accept_transaction(
        &self,
        transaction_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<AcceptOutcome> {
        let transaction = self.load_owned(transaction_id, acting_account).await?;
        if !transaction.is_open() {
            return Err(TransactionError::NotOpen);
        }

        let profile_id = match transaction
            .payment_method()
            .map_err(TransactionError::Internal)?
        {
            PaymentMethod::Card { profile_id } => profile_id,
            // PayPal settlement is attributed by the vendor's own callback,
            // never by a direct charge from here.
            PaymentMethod::PayPal { .. } => {
                return Err(TransactionError::UnsupportedPaymentMethod);
            }
        };

        let receipt = match self
            .gateway
            .charge_stored_card(&profile_id, transaction.total_price_usd_minor())
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                info!(
                    %transaction_id,
                    acting_account,
                    error = %err,
                    "transactions: card charge did not go through; transaction stays open"
                );
                return Ok(AcceptOutcome::PaymentFailed {
                    message: "The payment didn't process correctly or wasn't accepted."
                        .to_string(),
                });
            }
        };

        self.transaction_repo
            .mark_paid(transaction_id, receipt.vendor_transaction_id)
            .await
            .map_err(TransactionError::Internal)?;

        // Charge has been taken: any failure past this point leaves the row
        // open (but paid) for manual reconciliation.
        let currency_rewarded = if transaction.currency_quoted > 0 {
            Some(
                self.fulfillment
                    .credit_account_currency(
                        transaction.account_id,
                        transaction.amount_usd_minor,
                        transaction.currency_quoted,
                        transaction.recurring_interval.is_some(),
                    )
                    .await
                    .map_err(TransactionError::Internal)?,
            )
        } else {
            None
        };

        let items = transaction.items().map_err(TransactionError::Internal)?;
        let mut currency_rewarded_items = None;
        for item in &items {
            let rewarded = self
                .fulfillment
                .reward_item(
                    transaction.account_id,
                    item.price_usd_minor,
                    item.currency_value,
                    &item.code,
                )
                .await
                .map_err(TransactionError::Internal)?;
            *currency_rewarded_items.get_or_insert(0) += rewarded;
        }

        let closed = self
            .transaction_repo
            .close_if_open(
                transaction_id,
                ClosureReason::Fulfilled,
                currency_rewarded,
                currency_rewarded_items,
            )
            .await
            .map_err(TransactionError::Internal)?;
        if !closed {
            warn!(
                %transaction_id,
                "transactions: row was closed concurrently after a successful charge"
            );
        }

        let total_rewarded =
            currency_rewarded.unwrap_or(0) + currency_rewarded_items.unwrap_or(0);
        info!(
            %transaction_id,
            acting_account,
            currency_quoted = transaction.currency_quoted,
            total_rewarded,
            "transactions: transaction fulfilled"
        );

        Ok(AcceptOutcome::Fulfilled {
            account_currency_rewarded: total_rewarded,
        })
    }

    pub async fn decline_transaction(
        &self,
        transaction_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<()> {
        let transaction = self.load_owned(transaction_id, acting_account).await?;
        if !transaction.is_open() {
            return Err(TransactionError::NotOpen);
        }

        let closed = self
            .transaction_repo
            .close_if_open(transaction_id, ClosureReason::UserDeclined, None, None)
            .await
            .map_err(TransactionError::Internal)?;
        if !closed {
            // Lost the race against the expiry sweep; the row is closed
            // either way.
            return Err(TransactionError::NotOpen);
        }

        info!(%transaction_id, acting_account, "transactions: transaction declined by user");
        Ok(())
    }

    pub async fn get_transaction(
        &self,
        transaction_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<TransactionEntity> {
        self.load_owned(transaction_id, acting_account).await
    }

    pub async fn list_transactions_for(
        &self,
        account_id: i64,
    ) -> UseCaseResult<Vec<TransactionEntity>> {
        self.transaction_repo
            .list_for_account(account_id)
            .await
            .map_err(TransactionError::Internal)
    }

    async fn load_owned(
        &self,
        transaction_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<TransactionEntity> {
        let transaction = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await
            .map_err(TransactionError::Internal)?
            .ok_or(TransactionError::NotFound)?;

        if transaction.account_id != acting_account {
            warn!(
                %transaction_id,
                acting_account,
                owner = transaction.account_id,
                "transactions: account tried to act on a transaction it does not own"
            );
            return Err(TransactionError::NotYours);
        }

        Ok(transaction)
    }
}
