use crate::{
    domain::{
        repositories::{
            subscriptions::SubscriptionRepository, transactions::TransactionRepository,
        },
        value_objects::{
            billing_models::{InsertSubscriptionModel, SubscriptionModel},
            payment_methods::PaymentMethod,
        },
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        muck::http_muck::HttpMuckClient,
        payments::card_gateway::CardGatewayClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                subscriptions::SubscriptionPostgres, transactions::TransactionPostgres,
            },
        },
    },
    usecases::{
        gateways::{CardGateway, FulfillmentService},
        subscriptions::SubscriptionUseCase,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<CardGatewayClient>,
    fulfillment: Arc<HttpMuckClient>,
) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let transaction_repository = TransactionPostgres::new(Arc::clone(&db_pool));
    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(transaction_repository),
        gateway,
        fulfillment,
    );

    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route("/:subscription_id", get(get_subscription))
        .route("/:subscription_id/accept", post(accept_subscription))
        .route("/:subscription_id/decline", post(decline_subscription))
        .route("/:subscription_id/cancel", post(cancel_subscription))
        .with_state(Arc::new(subscriptions_usecase))
}

pub async fn create_subscription<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Json(body): Json<InsertSubscriptionModel>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(account_id, "subscriptions: create request received");
    if body.recurring_interval_days <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            "recurring_interval_days must be a positive number".to_string(),
        )
            .into_response();
    }

    let payment_method = PaymentMethod::Card {
        profile_id: body.profile_id.clone(),
    };

    match subscriptions_usecase
        .create_subscription(
            account_id,
            payment_method,
            body.profile_id,
            body.amount_usd_minor,
            body.recurring_interval_days,
        )
        .await
    {
        Ok(subscription) => Json(SubscriptionModel::from(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn accept_subscription<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(
        account_id,
        %subscription_id,
        "subscriptions: accept request received"
    );
    match subscriptions_usecase
        .accept_subscription(subscription_id, account_id)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn decline_subscription<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(
        account_id,
        %subscription_id,
        "subscriptions: decline request received"
    );
    match subscriptions_usecase
        .decline_subscription(subscription_id, account_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_subscription<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    info!(
        account_id,
        %subscription_id,
        "subscriptions: cancel request received"
    );
    match subscriptions_usecase
        .cancel_subscription(subscription_id, account_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_subscription<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    match subscriptions_usecase
        .get_subscription(subscription_id, account_id)
        .await
    {
        Ok(subscription) => Json(SubscriptionModel::from(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_subscriptions<S, T, G, F>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<S, T, G, F>>>,
    AuthUser { account_id }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    G: CardGateway + Send + Sync + 'static,
    F: FulfillmentService + Send + Sync + 'static,
{
    match subscriptions_usecase
        .list_subscriptions_for(account_id)
        .await
    {
        Ok(subscriptions) => {
            let models: Vec<SubscriptionModel> = subscriptions
                .into_iter()
                .map(SubscriptionModel::from)
                .collect();
            Json(models).into_response()
        }
        Err(err) => err.into_response(),
    }
}
