use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::{
    subscriptions::SubscriptionError, transactions::TransactionError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

fn reply(status: StatusCode, message: String) -> Response {
    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

impl IntoResponse for TransactionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Don't leak internal error detail to client
            TransactionError::Internal(err) => {
                error!(error = ?err, "account currency: request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        reply(status, message)
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SubscriptionError::Internal(err) => {
                error!(error = ?err, "subscriptions: request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        reply(status, message)
    }
}
