use std::sync::Arc;

use anyhow::Result as AnyResult;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};

use crate::domain::{
    repositories::{
        subscriptions::SubscriptionRepository, transactions::TransactionRepository,
    },
    value_objects::enums::transaction_statuses::ClosureReason,
};
use crate::usecases::gateways::{CardGateway, FulfillmentService};
use crate::usecases::subscriptions::SubscriptionUseCase;

/// Open transactions older than this are treated as abandoned.
pub const STALE_TRANSACTION_CUTOFF_MINUTES: i64 = 30;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub expired_transactions: usize,
    pub charged_subscriptions: usize,
}

pub struct ReconciliationUseCase<T, S, G, F>
where
    T: TransactionRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    transaction_repo: Arc<T>,
    subscriptions: Arc<SubscriptionUseCase<S, T, G, F>>,
}

impl<T, S, G, F> ReconciliationUseCase<T, S, G, F>
where
    T: TransactionRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    pub fn new(
        transaction_repo: Arc<T>,
        subscriptions: Arc<SubscriptionUseCase<S, T, G, F>>,
    ) -> Self {
        Self {
            transaction_repo,
            subscriptions,
        }
    }

    /// One sweep: close abandoned transactions, then take recurring charges
    /// that have come due. The two halves run independently.
    pub async fn run_once(&self, now: DateTime<Utc>) -> AnyResult<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        let cutoff = now - Duration::minutes(STALE_TRANSACTION_CUTOFF_MINUTES);
        let stale = self.transaction_repo.list_stale_open(cutoff).await?;
        for transaction in stale {
            match self
                .transaction_repo
                .close_if_open(transaction.id, ClosureReason::UserDeclined, None, None)
                .await
            {
                Ok(true) => {
                    info!(
                        transaction_id = %transaction.id,
                        account_id = transaction.account_id,
                        created_at = %transaction.created_at,
                        "reconciliation: closed abandoned transaction"
                    );
                    report.expired_transactions += 1;
                }
                Ok(false) => {
                    debug!(
                        transaction_id = %transaction.id,
                        "reconciliation: transaction closed by another writer"
                    );
                }
                Err(err) => {
                    error!(
                        transaction_id = %transaction.id,
                        error = ?err,
                        "reconciliation: failed to close abandoned transaction"
                    );
                }
            }
        }

        report.charged_subscriptions = match self.subscriptions.charge_due_subscriptions(now).await
        {
            Ok(charged) => charged,
            Err(err) => {
                error!(error = ?err, "reconciliation: recurring billing sweep failed");
                0
            }
        };

        Ok(report)
    }

    pub async fn run_loop(self: Arc<Self>, interval: std::time::Duration) {
        info!(interval_secs = interval.as_secs(), "reconciliation: worker started");
        loop {
            if let Err(err) = self.run_once(Utc::now()).await {
                error!(error = ?err, "reconciliation: sweep failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
