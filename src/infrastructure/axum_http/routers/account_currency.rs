use crate::{
    domain::{
        repositories::transactions::TransactionRepository,
        value_objects::{
            billing_models::{InsertTransactionModel, QuoteModel, TransactionModel},
            catalogue::ItemCatalogue,
            payment_methods::PaymentMethod,
        },
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        muck::http_muck::HttpMuckClient,
        payments::card_gateway::CardGatewayClient,
        postgres::{
            postgres_connection::PgPoolSquad, repositories::transactions::TransactionPostgres,
        },
    },
    usecases::{
        gateways::{CardGateway, FulfillmentService},
        transactions::TransactionUseCase,
    },
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    amount_usd_minor: i32,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<CardGatewayClient>,
    fulfillment: Arc<HttpMuckClient>,
    catalogue: Arc<ItemCatalogue>,
) -> Router {
    let transaction_repository = TransactionPostgres::new(Arc::clone(&db_pool));
    let transactions_usecase = TransactionUseCase::new(
        Arc::new(transaction_repository),
        gateway,
        fulfillment,
        catalogue,
    );

    Router::new()
        .route("/quote", get(quote))
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/:transaction_id", get(get_transaction))
        .route(
            "/transactions/:transaction_id/accept",
            post(accept_transaction),
        )
        .route(
            "/transactions/:transaction_id/decline",
            post(decline_transaction),
        )
        .with_state(Arc::new(transactions_usecase))
}

pub async fn quote<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    _auth: AuthUser,
    Query(query): Query<QuoteQuery>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    match transactions_usecase
        .quote_account_currency(query.amount_usd_minor)
        .await
    {
        Ok(account_currency) => Json(QuoteModel {
            amount_usd_minor: query.amount_usd_minor,
            account_currency,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_transaction<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Json(body): Json<InsertTransactionModel>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(account_id, "account currency: create transaction request received");
    let payment_method = match body.payment_method.as_str() {
        "card" => match body.profile_id {
            Some(profile_id) => PaymentMethod::Card { profile_id },
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    "profile_id is required for card payments".to_string(),
                )
                    .into_response();
            }
        },
        "paypal" => PaymentMethod::PayPal { external_ref: None },
        other => {
            return (
                StatusCode::BAD_REQUEST,
                format!("unknown payment method: {other}"),
            )
                .into_response();
        }
    };

    match transactions_usecase
        .create_transaction(
            account_id,
            payment_method,
            body.amount_usd_minor,
            &body.items,
            body.recurring_interval,
        )
        .await
    {
        Ok(transaction) => Json(TransactionModel::from(transaction)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn accept_transaction<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(
        account_id,
        %transaction_id,
        "account currency: accept transaction request received"
    );
    match transactions_usecase
        .accept_transaction(transaction_id, account_id)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn decline_transaction<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(
        account_id,
        %transaction_id,
        "account currency: decline transaction request received"
    );
    match transactions_usecase
        .decline_transaction(transaction_id, account_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_transaction<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    match transactions_usecase
        .get_transaction(transaction_id, account_id)
        .await
    {
        Ok(transaction) => Json(TransactionModel::from(transaction)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_transactions<T, G, F>(
    State(transactions_usecase): State<Arc<TransactionUseCase<T, G, F>>>,
    AuthUser { account_id }: AuthUser,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    match transactions_usecase.list_transactions_for(account_id).await {
        Ok(transactions) => {
            let models: Vec<TransactionModel> =
                transactions.into_iter().map(TransactionModel::from).collect();
            Json(models).into_response()
        }
        Err(err) => err.into_response(),
    }
}
