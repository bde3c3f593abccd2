pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod usecases;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::domain::value_objects::catalogue::ItemCatalogue;
use crate::infrastructure::{
    axum_http::http_serve,
    muck::http_muck::HttpMuckClient,
    payments::card_gateway::CardGatewayClient,
    postgres::{
        postgres_connection,
        repositories::{
            subscriptions::SubscriptionPostgres, transactions::TransactionPostgres,
        },
    },
};
use crate::usecases::{
    reconciliation::ReconciliationUseCase, subscriptions::SubscriptionUseCase,
};

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let catalogue_raw = std::fs::read_to_string(&dotenvy_env.billing.catalogue_path)
        .with_context(|| {
            format!(
                "failed to read item catalogue at {}",
                dotenvy_env.billing.catalogue_path
            )
        })?;
    let catalogue = Arc::new(ItemCatalogue::from_json(&catalogue_raw)?);
    info!(item_count = catalogue.len(), "Item catalogue has been loaded");

    let gateway = Arc::new(CardGatewayClient::new(
        dotenvy_env.gateway.base_url.clone(),
        dotenvy_env.gateway.login_id.clone(),
        dotenvy_env.gateway.transaction_key.clone(),
    ));
    let fulfillment = Arc::new(HttpMuckClient::new(
        dotenvy_env.muck.endpoint.clone(),
        dotenvy_env.muck.salt.clone(),
    ));

    let postgres_pool = Arc::new(postgres_pool);
    let subscriptions_usecase = Arc::new(SubscriptionUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&postgres_pool))),
        Arc::new(TransactionPostgres::new(Arc::clone(&postgres_pool))),
        Arc::clone(&gateway),
        Arc::clone(&fulfillment),
    ));
    let reconciliation_usecase = Arc::new(ReconciliationUseCase::new(
        Arc::new(TransactionPostgres::new(Arc::clone(&postgres_pool))),
        subscriptions_usecase,
    ));

    let interval =
        std::time::Duration::from_secs(dotenvy_env.billing.reconciliation_interval_secs);
    tokio::spawn(reconciliation_usecase.run_loop(interval));

    http_serve::start(
        Arc::new(dotenvy_env),
        postgres_pool,
        gateway,
        fulfillment,
        catalogue,
    )
    .await?;

    Ok(())
}
