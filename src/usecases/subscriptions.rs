use std::sync::Arc;

use anyhow::{Result as AnyResult, anyhow};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::{
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
        transactions::InsertTransactionEntity,
    },
    repositories::{
        subscriptions::SubscriptionRepository, transactions::TransactionRepository,
    },
    value_objects::{
        enums::subscription_statuses::{SubscriptionClosure, SubscriptionStatus},
        enums::transaction_statuses::ClosureReason,
        payment_methods::PaymentMethod,
    },
};
use crate::infrastructure::payments::card_gateway::GatewayError;
use crate::usecases::gateways::{CardGateway, FulfillmentService};
use crate::usecases::transactions::{AcceptOutcome, MINIMUM_PURCHASE_USD_MINOR};

/// Consecutive failed charges before a subscription is suspended.
pub const MAX_CHARGE_ATTEMPTS: i32 = 3;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscription not found")]
    NotFound,
    #[error("subscription belongs to another account")]
    NotYours,
    #[error("subscription is not awaiting acceptance")]
    NotNew,
    #[error("subscription is not active")]
    NotActive,
    #[error("amount is below the minimum purchase")]
    BelowMinimum,
    #[error("subscriptions require a stored card")]
    UnsupportedPaymentMethod,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::NotFound => StatusCode::NOT_FOUND,
            SubscriptionError::NotYours
            | SubscriptionError::NotNew
            | SubscriptionError::NotActive => StatusCode::FORBIDDEN,
            SubscriptionError::BelowMinimum | SubscriptionError::UnsupportedPaymentMethod => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

enum ChargeOutcome {
    Charged { account_currency_rewarded: i32 },
    /// The vendor refused the card. Counts toward suspension.
    Declined { message: String },
    /// Quote or gateway temporarily unreachable. Retried later without
    /// touching the failure counter.
    Unavailable { message: String },
}

pub struct SubscriptionUseCase<S, T, G, F>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    transaction_repo: Arc<T>,
    gateway: Arc<G>,
    fulfillment: Arc<F>,
}

impl<S, T, G, F> SubscriptionUseCase<S, T, G, F>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        transaction_repo: Arc<T>,
        gateway: Arc<G>,
        fulfillment: Arc<F>,
    ) -> Self {
        Self {
            subscription_repo,
            transaction_repo,
            gateway,
            fulfillment,
        }
    }

    pub async fn create_subscription(
        &self,
        account_id: i64,
        payment_method: PaymentMethod,
        vendor_profile_id: String,
        amount_usd_minor: i32,
        recurring_interval_days: i32,
    ) -> UseCaseResult<SubscriptionEntity> {
        if amount_usd_minor < MINIMUM_PURCHASE_USD_MINOR {
            warn!(
                account_id,
                amount_usd_minor, "subscriptions: amount below minimum rejected"
            );
            return Err(SubscriptionError::BelowMinimum);
        }
        if !matches!(payment_method, PaymentMethod::Card { .. }) {
            return Err(SubscriptionError::UnsupportedPaymentMethod);
        }

        let insert_subscription_entity = InsertSubscriptionEntity {
            id: Uuid::new_v4(),
            account_id,
            payment_method_kind: payment_method.kind().to_string(),
            payment_method_ref: payment_method.reference().map(str::to_string),
            vendor_profile_id,
            amount_usd_minor,
            recurring_interval_days,
            status: SubscriptionStatus::New.to_string(),
        };

        let subscription_id = self
            .subscription_repo
            .create(insert_subscription_entity)
            .await
            .map_err(SubscriptionError::Internal)?;

        info!(
            %subscription_id,
            account_id,
            amount_usd_minor,
            recurring_interval_days,
            "subscriptions: created subscription awaiting acceptance"
        );

        self.subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or_else(|| {
                SubscriptionError::Internal(anyhow!(
                    "created subscription {subscription_id} could not be reloaded"
                ))
            })
    }

    /// First charge. On success the subscription becomes active and its
    /// billing anchor is set; a decline leaves it new so the user can retry.
    pub async fn accept_subscription(
        &self,
        subscription_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<AcceptOutcome> {
        let subscription = self.load_owned(subscription_id, acting_account).await?;
        if subscription.status() != SubscriptionStatus::New {
            return Err(SubscriptionError::NotNew);
        }

        match self
            .charge_subscription(&subscription)
            .await
            .map_err(SubscriptionError::Internal)?
        {
            ChargeOutcome::Declined { message } | ChargeOutcome::Unavailable { message } => {
                Ok(AcceptOutcome::PaymentFailed { message })
            }
            ChargeOutcome::Charged {
                account_currency_rewarded,
            } => {
                let activated = self
                    .subscription_repo
                    .activate_if_new(subscription_id, Utc::now())
                    .await
                    .map_err(SubscriptionError::Internal)?;
                if !activated {
                    warn!(
                        %subscription_id,
                        "subscriptions: charged but row was no longer new at activation"
                    );
                }

                info!(
                    %subscription_id,
                    acting_account,
                    account_currency_rewarded,
                    "subscriptions: subscription activated"
                );
                Ok(AcceptOutcome::Fulfilled {
                    account_currency_rewarded,
                })
            }
        }
    }

    pub async fn decline_subscription(
        &self,
        subscription_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<()> {
        let subscription = self.load_owned(subscription_id, acting_account).await?;
        if subscription.status() != SubscriptionStatus::New {
            return Err(SubscriptionError::NotNew);
        }

        let closed = self
            .subscription_repo
            .close_if_status(
                subscription_id,
                SubscriptionStatus::New,
                SubscriptionClosure::UserDeclined,
            )
            .await
            .map_err(SubscriptionError::Internal)?;
        if !closed {
            return Err(SubscriptionError::NotNew);
        }

        info!(%subscription_id, acting_account, "subscriptions: offer declined");
        Ok(())
    }

    /// Cancels an active subscription. The vendor profile is torn down first;
    /// if that fails the row stays active so the cancel can be retried.
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<()> {
        let subscription = self.load_owned(subscription_id, acting_account).await?;
        if subscription.status() != SubscriptionStatus::Active {
            return Err(SubscriptionError::NotActive);
        }

        self.gateway
            .cancel_recurring_profile(&subscription.vendor_profile_id)
            .await
            .map_err(|err| {
                SubscriptionError::Internal(anyhow!(
                    "cancelling recurring profile for subscription {subscription_id} failed: {err}"
                ))
            })?;

        let closed = self
            .subscription_repo
            .close_if_status(
                subscription_id,
                SubscriptionStatus::Active,
                SubscriptionClosure::UserCancelled,
            )
            .await
            .map_err(SubscriptionError::Internal)?;
        if !closed {
            return Err(SubscriptionError::NotActive);
        }

        info!(%subscription_id, acting_account, "subscriptions: cancelled by user");
        Ok(())
    }

    pub async fn get_subscription(
        &self,
        subscription_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<SubscriptionEntity> {
        self.load_owned(subscription_id, acting_account).await
    }

    pub async fn list_subscriptions_for(
        &self,
        account_id: i64,
    ) -> UseCaseResult<Vec<SubscriptionEntity>> {
        self.subscription_repo
            .list_for_account(account_id)
            .await
            .map_err(SubscriptionError::Internal)
    }

    /// Charges every subscription whose interval has elapsed. One bad
    /// subscription never aborts the batch; returns the number charged.
    pub async fn charge_due_subscriptions(&self, now: DateTime<Utc>) -> AnyResult<usize> {
        let due = self.subscription_repo.list_due(now).await?;
        if due.is_empty() {
            debug!("subscriptions: nothing due for recurring billing");
            return Ok(0);
        }

        info!(due_count = due.len(), "subscriptions: running recurring billing");

        let mut charged = 0;
        for subscription in due {
            match self.process_due_subscription(&subscription, now).await {
                Ok(true) => charged += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(
                        subscription_id = %subscription.id,
                        error = ?err,
                        "subscriptions: recurring charge errored; will retry next sweep"
                    );
                }
            }
        }

        Ok(charged)
    }

    async fn process_due_subscription(
        &self,
        subscription: &SubscriptionEntity,
        now: DateTime<Utc>,
    ) -> AnyResult<bool> {
        match self.charge_subscription(subscription).await? {
            ChargeOutcome::Charged {
                account_currency_rewarded,
            } => {
                self.subscription_repo
                    .record_successful_charge(subscription.id, now)
                    .await?;
                info!(
                    subscription_id = %subscription.id,
                    account_id = subscription.account_id,
                    account_currency_rewarded,
                    "subscriptions: recurring charge fulfilled"
                );
                Ok(true)
            }
            ChargeOutcome::Unavailable { message } => {
                warn!(
                    subscription_id = %subscription.id,
                    message,
                    "subscriptions: recurring charge skipped; will retry next sweep"
                );
                Ok(false)
            }
            ChargeOutcome::Declined { message } => {
                let attempts = self
                    .subscription_repo
                    .record_failed_charge(subscription.id)
                    .await?;
                warn!(
                    subscription_id = %subscription.id,
                    attempts,
                    message,
                    "subscriptions: recurring charge declined"
                );

                if attempts >= MAX_CHARGE_ATTEMPTS {
                    warn!(
                        subscription_id = %subscription.id,
                        attempts,
                        "subscriptions: suspending after repeated declined charges"
                    );
                    // Best effort; the vendor may already have dropped the
                    // profile on its side.
                    if let Err(err) = self
                        .gateway
                        .cancel_recurring_profile(&subscription.vendor_profile_id)
                        .await
                    {
                        error!(
                            subscription_id = %subscription.id,
                            error = %err,
                            "subscriptions: vendor profile cancel failed during suspension"
                        );
                    }
                    self.subscription_repo
                        .close_if_status(
                            subscription.id,
                            SubscriptionStatus::Active,
                            SubscriptionClosure::VendorRefused,
                        )
                        .await?;
                }
                Ok(false)
            }
        }
    }

    /// Takes one charge for the subscription and records it as a linked
    /// transaction row, so recurring billing shows up in the same ledger as
    /// one-off purchases.
    async fn charge_subscription(
        &self,
        subscription: &SubscriptionEntity,
    ) -> AnyResult<ChargeOutcome> {
        let Some(currency_quoted) = self
            .fulfillment
            .usd_to_account_currency(subscription.amount_usd_minor)
            .await?
        else {
            warn!(
                subscription_id = %subscription.id,
                "subscriptions: no account currency quote available"
            );
            return Ok(ChargeOutcome::Unavailable {
                message: "No account currency quote is currently available.".to_string(),
            });
        };

        let receipt = match self
            .gateway
            .charge_stored_card(&subscription.vendor_profile_id, subscription.amount_usd_minor)
            .await
        {
            Ok(receipt) => receipt,
            Err(err @ GatewayError::Declined { .. }) => {
                info!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "subscriptions: card charge did not go through"
                );
                return Ok(ChargeOutcome::Declined {
                    message: "The payment didn't process correctly or wasn't accepted."
                        .to_string(),
                });
            }
            Err(err) => {
                warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "subscriptions: gateway unreachable for charge"
                );
                return Ok(ChargeOutcome::Unavailable {
                    message: "The payment could not be processed right now.".to_string(),
                });
            }
        };

        let transaction_id = self
            .transaction_repo
            .create(InsertTransactionEntity {
                id: Uuid::new_v4(),
                account_id: subscription.account_id,
                payment_method_kind: subscription.payment_method_kind.clone(),
                payment_method_ref: subscription.payment_method_ref.clone(),
                amount_usd_minor: subscription.amount_usd_minor,
                amount_usd_items_minor: 0,
                currency_quoted,
                purchase_description: format!("{currency_quoted} mako"),
                recurring_interval: Some(subscription.recurring_interval_days),
                subscription_id: Some(subscription.id),
                items_json: None,
            })
            .await?;
        self.transaction_repo
            .mark_paid(transaction_id, receipt.vendor_transaction_id)
            .await?;

        let account_currency_rewarded = self
            .fulfillment
            .credit_account_currency(
                subscription.account_id,
                subscription.amount_usd_minor,
                currency_quoted,
                true,
            )
            .await?;

        let closed = self
            .transaction_repo
            .close_if_open(
                transaction_id,
                ClosureReason::Fulfilled,
                Some(account_currency_rewarded),
                None,
            )
            .await?;
        if !closed {
            warn!(
                %transaction_id,
                subscription_id = %subscription.id,
                "subscriptions: charge record was closed concurrently"
            );
        }

        Ok(ChargeOutcome::Charged {
            account_currency_rewarded,
        })
    }

    async fn load_owned(
        &self,
        subscription_id: Uuid,
        acting_account: i64,
    ) -> UseCaseResult<SubscriptionEntity> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(SubscriptionError::Internal)?
            .ok_or(SubscriptionError::NotFound)?;

        if subscription.account_id != acting_account {
            warn!(
                %subscription_id,
                acting_account,
                owner = subscription.account_id,
                "subscriptions: account tried to act on a subscription it does not own"
            );
            return Err(SubscriptionError::NotYours);
        }

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mockall::predicate::eq;

    use crate::domain::repositories::subscriptions::MockSubscriptionRepository;
    use crate::domain::repositories::transactions::MockTransactionRepository;
    use crate::infrastructure::payments::card_gateway::ChargeReceipt;
    use crate::usecases::gateways::{MockCardGateway, MockFulfillmentService};

    fn sample_subscription(account_id: i64, status: SubscriptionStatus) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            account_id,
            payment_method_kind: "card".to_string(),
            payment_method_ref: Some("profile-1".to_string()),
            vendor_profile_id: "profile-1".to_string(),
            amount_usd_minor: 1000,
            recurring_interval_days: 30,
            status: status.to_string(),
            last_charge_at: None,
            charge_attempts: 0,
            closure_reason: None,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    fn usecase(
        subscription_repo: MockSubscriptionRepository,
        transaction_repo: MockTransactionRepository,
        gateway: MockCardGateway,
        fulfillment: MockFulfillmentService,
    ) -> SubscriptionUseCase<
        MockSubscriptionRepository,
        MockTransactionRepository,
        MockCardGateway,
        MockFulfillmentService,
    > {
        SubscriptionUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(transaction_repo),
            Arc::new(gateway),
            Arc::new(fulfillment),
        )
    }

    fn expect_successful_charge(
        transaction_repo: &mut MockTransactionRepository,
        gateway: &mut MockCardGateway,
        fulfillment: &mut MockFulfillmentService,
        rewarded: i32,
    ) {
        fulfillment
            .expect_usd_to_account_currency()
            .with(eq(1000))
            .returning(|_| Ok(Some(30)));
        gateway
            .expect_charge_stored_card()
            .withf(|profile_id, amount| profile_id == "profile-1" && *amount == 1000)
            .returning(|_, _| {
                Ok(ChargeReceipt {
                    vendor_transaction_id: "gw-tx-1".to_string(),
                })
            });
        transaction_repo
            .expect_create()
            .withf(|insert| {
                insert.subscription_id.is_some() && insert.recurring_interval == Some(30)
            })
            .returning(|insert| {
                let id = insert.id;
                Box::pin(async move { Ok(id) })
            });
        transaction_repo
            .expect_mark_paid()
            .returning(|_, _| Box::pin(async { Ok(()) }));
        fulfillment
            .expect_credit_account_currency()
            .withf(|_, _, _, recurring| *recurring)
            .returning(move |_, _, _, _| Ok(rewarded));
        transaction_repo
            .expect_close_if_open()
            .withf(move |_, reason, currency_rewarded, _| {
                *reason == ClosureReason::Fulfilled && *currency_rewarded == Some(rewarded)
            })
            .returning(|_, _, _, _| Box::pin(async { Ok(true) }));
    }

    #[tokio::test]
    async fn accept_charges_and_activates_new_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let subscription = sample_subscription(1, SubscriptionStatus::New);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        expect_successful_charge(&mut transaction_repo, &mut gateway, &mut fulfillment, 30);
        subscription_repo
            .expect_activate_if_new()
            .withf(move |id, _| *id == subscription_id)
            .returning(|_, _| Box::pin(async { Ok(true) }));

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let outcome = usecase.accept_subscription(subscription_id, 1).await.unwrap();
        assert_eq!(
            outcome,
            AcceptOutcome::Fulfilled {
                account_currency_rewarded: 30
            }
        );
    }

    #[tokio::test]
    async fn accept_declined_charge_leaves_subscription_new() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let subscription = sample_subscription(1, SubscriptionStatus::New);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        fulfillment
            .expect_usd_to_account_currency()
            .returning(|_| Ok(Some(30)));
        gateway.expect_charge_stored_card().returning(|_, _| {
            Err(GatewayError::Declined {
                code: None,
                message: "do not honor".to_string(),
            })
        });
        // No activate_if_new expectation: the mock panics if it happens.

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let outcome = usecase.accept_subscription(subscription_id, 1).await.unwrap();
        assert!(matches!(outcome, AcceptOutcome::PaymentFailed { .. }));
    }

    #[tokio::test]
    async fn decline_closes_new_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();

        let subscription = sample_subscription(1, SubscriptionStatus::New);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        subscription_repo
            .expect_close_if_status()
            .withf(move |id, status, closure| {
                *id == subscription_id
                    && *status == SubscriptionStatus::New
                    && *closure == SubscriptionClosure::UserDeclined
            })
            .returning(|_, _, _| Box::pin(async { Ok(true) }));

        let usecase = usecase(
            subscription_repo,
            MockTransactionRepository::new(),
            MockCardGateway::new(),
            MockFulfillmentService::new(),
        );

        usecase.decline_subscription(subscription_id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn active_subscription_cannot_be_declined() {
        let mut subscription_repo = MockSubscriptionRepository::new();

        let subscription = sample_subscription(1, SubscriptionStatus::Active);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let usecase = usecase(
            subscription_repo,
            MockTransactionRepository::new(),
            MockCardGateway::new(),
            MockFulfillmentService::new(),
        );

        let result = usecase.decline_subscription(subscription_id, 1).await;
        assert!(matches!(result, Err(SubscriptionError::NotNew)));
    }

    #[tokio::test]
    async fn cancel_tears_down_vendor_profile_then_closes() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut gateway = MockCardGateway::new();

        let subscription = sample_subscription(1, SubscriptionStatus::Active);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        gateway
            .expect_cancel_recurring_profile()
            .withf(|profile_id| profile_id == "profile-1")
            .returning(|_| Ok(()));
        subscription_repo
            .expect_close_if_status()
            .withf(move |id, status, closure| {
                *id == subscription_id
                    && *status == SubscriptionStatus::Active
                    && *closure == SubscriptionClosure::UserCancelled
            })
            .returning(|_, _, _| Box::pin(async { Ok(true) }));

        let usecase = usecase(
            subscription_repo,
            MockTransactionRepository::new(),
            gateway,
            MockFulfillmentService::new(),
        );

        usecase.cancel_subscription(subscription_id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_by_foreign_account_never_reaches_the_gateway() {
        let mut subscription_repo = MockSubscriptionRepository::new();

        let subscription = sample_subscription(2, SubscriptionStatus::Active);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let usecase = usecase(
            subscription_repo,
            MockTransactionRepository::new(),
            MockCardGateway::new(),
            MockFulfillmentService::new(),
        );

        let result = usecase.cancel_subscription(subscription_id, 1).await;
        assert!(matches!(result, Err(SubscriptionError::NotYours)));
    }

    #[tokio::test]
    async fn cancel_requires_an_active_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();

        let subscription = sample_subscription(1, SubscriptionStatus::New);
        let subscription_id = subscription.id;

        subscription_repo.expect_find_by_id().returning(move |_| {
            let entity = subscription.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let usecase = usecase(
            subscription_repo,
            MockTransactionRepository::new(),
            MockCardGateway::new(),
            MockFulfillmentService::new(),
        );

        let result = usecase.cancel_subscription(subscription_id, 1).await;
        assert!(matches!(result, Err(SubscriptionError::NotActive)));
    }

    #[tokio::test]
    async fn recurring_billing_charges_due_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let now = Utc::now();
        let mut subscription = sample_subscription(1, SubscriptionStatus::Active);
        subscription.last_charge_at = Some(now - Duration::days(31));
        let subscription_id = subscription.id;

        subscription_repo.expect_list_due().returning(move |_| {
            let due = vec![subscription.clone()];
            Box::pin(async move { Ok(due) })
        });
        expect_successful_charge(&mut transaction_repo, &mut gateway, &mut fulfillment, 30);
        subscription_repo
            .expect_record_successful_charge()
            .withf(move |id, _| *id == subscription_id)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let charged = usecase.charge_due_subscriptions(now).await.unwrap();
        assert_eq!(charged, 1);
    }

    #[tokio::test]
    async fn one_failing_subscription_does_not_abort_the_batch() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let now = Utc::now();
        let failing = sample_subscription(1, SubscriptionStatus::Active);
        let mut healthy = sample_subscription(2, SubscriptionStatus::Active);
        healthy.vendor_profile_id = "profile-2".to_string();
        healthy.payment_method_ref = Some("profile-2".to_string());
        let failing_id = failing.id;
        let healthy_id = healthy.id;

        subscription_repo.expect_list_due().returning(move |_| {
            let due = vec![failing.clone(), healthy.clone()];
            Box::pin(async move { Ok(due) })
        });
        fulfillment
            .expect_usd_to_account_currency()
            .returning(|_| Ok(Some(30)));
        gateway
            .expect_charge_stored_card()
            .withf(|profile_id, _| profile_id == "profile-1")
            .returning(|_, _| {
                Err(GatewayError::Declined {
                    code: None,
                    message: "do not honor".to_string(),
                })
            });
        subscription_repo
            .expect_record_failed_charge()
            .with(eq(failing_id))
            .returning(|_| Box::pin(async { Ok(1) }));

        gateway
            .expect_charge_stored_card()
            .withf(|profile_id, _| profile_id == "profile-2")
            .returning(|_, _| {
                Ok(ChargeReceipt {
                    vendor_transaction_id: "gw-tx-2".to_string(),
                })
            });
        transaction_repo.expect_create().returning(|insert| {
            let id = insert.id;
            Box::pin(async move { Ok(id) })
        });
        transaction_repo
            .expect_mark_paid()
            .returning(|_, _| Box::pin(async { Ok(()) }));
        fulfillment
            .expect_credit_account_currency()
            .returning(|_, _, _, _| Ok(30));
        transaction_repo
            .expect_close_if_open()
            .returning(|_, _, _, _| Box::pin(async { Ok(true) }));
        subscription_repo
            .expect_record_successful_charge()
            .withf(move |id, _| *id == healthy_id)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let charged = usecase.charge_due_subscriptions(now).await.unwrap();
        assert_eq!(charged, 1);
    }

    #[tokio::test]
    async fn repeated_declines_suspend_the_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let now = Utc::now();
        let mut subscription = sample_subscription(1, SubscriptionStatus::Active);
        subscription.charge_attempts = MAX_CHARGE_ATTEMPTS - 1;
        let subscription_id = subscription.id;

        subscription_repo.expect_list_due().returning(move |_| {
            let due = vec![subscription.clone()];
            Box::pin(async move { Ok(due) })
        });
        fulfillment
            .expect_usd_to_account_currency()
            .returning(|_| Ok(Some(30)));
        gateway.expect_charge_stored_card().returning(|_, _| {
            Err(GatewayError::Declined {
                code: None,
                message: "do not honor".to_string(),
            })
        });
        subscription_repo
            .expect_record_failed_charge()
            .with(eq(subscription_id))
            .returning(|_| Box::pin(async { Ok(MAX_CHARGE_ATTEMPTS) }));
        gateway
            .expect_cancel_recurring_profile()
            .withf(|profile_id| profile_id == "profile-1")
            .returning(|_| Ok(()));
        subscription_repo
            .expect_close_if_status()
            .withf(move |id, status, closure| {
                *id == subscription_id
                    && *status == SubscriptionStatus::Active
                    && *closure == SubscriptionClosure::VendorRefused
            })
            .returning(|_, _, _| Box::pin(async { Ok(true) }));

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let charged = usecase.charge_due_subscriptions(now).await.unwrap();
        assert_eq!(charged, 0);
    }

    #[tokio::test]
    async fn missing_quote_does_not_count_as_a_card_decline() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let transaction_repo = MockTransactionRepository::new();
        let gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let now = Utc::now();
        let mut subscription = sample_subscription(1, SubscriptionStatus::Active);
        subscription.charge_attempts = MAX_CHARGE_ATTEMPTS - 1;

        subscription_repo.expect_list_due().returning(move |_| {
            let due = vec![subscription.clone()];
            Box::pin(async move { Ok(due) })
        });
        fulfillment
            .expect_usd_to_account_currency()
            .returning(|_| Ok(None));
        // No charge, no record_failed_charge, no close_if_status, no profile
        // cancel: the mocks would panic on any of them.

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let charged = usecase.charge_due_subscriptions(now).await.unwrap();
        assert_eq!(charged, 0);
    }

    #[tokio::test]
    async fn gateway_outage_does_not_count_as_a_card_decline() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        let transaction_repo = MockTransactionRepository::new();
        let mut gateway = MockCardGateway::new();
        let mut fulfillment = MockFulfillmentService::new();

        let now = Utc::now();
        let mut subscription = sample_subscription(1, SubscriptionStatus::Active);
        subscription.charge_attempts = MAX_CHARGE_ATTEMPTS - 1;

        subscription_repo.expect_list_due().returning(move |_| {
            let due = vec![subscription.clone()];
            Box::pin(async move { Ok(due) })
        });
        fulfillment
            .expect_usd_to_account_currency()
            .returning(|_| Ok(Some(30)));
        gateway.expect_charge_stored_card().returning(|_, _| {
            Err(GatewayError::Unexpected(
                "charge_stored_card: HTTP 503".to_string(),
            ))
        });
        // The subscription stays active: no record_failed_charge, no
        // close_if_status, no profile cancel.

        let usecase = usecase(subscription_repo, transaction_repo, gateway, fulfillment);

        let charged = usecase.charge_due_subscriptions(now).await.unwrap();
        assert_eq!(charged, 0);
    }
}
