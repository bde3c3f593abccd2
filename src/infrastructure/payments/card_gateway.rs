use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("charge declined by gateway: {message}")]
    Declined {
        code: Option<String>,
        message: String,
    },
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected gateway response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub vendor_transaction_id: String,
}

/// Minimal card-gateway client built on reqwest. Charges go against
/// tokenised customer profiles held by the gateway; raw card data never
/// passes through here.
pub struct CardGatewayClient {
    http: reqwest::Client,
    base_url: String,
    login_id: String,
    transaction_key: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    error: GatewayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetails {
    code: Option<String>,
    message: Option<String>,
}

impl CardGatewayClient {
    pub fn new(base_url: String, login_id: String, transaction_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            login_id,
            transaction_key,
        }
    }

    async fn decline_from_response(
        resp: reqwest::Response,
        context: &str,
    ) -> GatewayError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        // 401/403 means our merchant credentials are wrong, not that the
        // customer's card was refused.
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            error!(%status, context, "gateway rejected merchant credentials");
            return GatewayError::Unexpected(format!(
                "{context}: HTTP {status} (check gateway credentials)"
            ));
        }

        if status.is_client_error() {
            if let Ok(envelope) = serde_json::from_str::<GatewayErrorEnvelope>(&body) {
                return GatewayError::Declined {
                    code: envelope.error.code,
                    message: envelope
                        .error
                        .message
                        .unwrap_or_else(|| "charge was not accepted".to_string()),
                };
            }
        }

        error!(%status, context, body = %body, "gateway returned unexpected response");
        GatewayError::Unexpected(format!("{context}: HTTP {status}"))
    }

    /// Charges a stored customer profile. `reference` is a fresh idempotency
    /// token per attempt, so an explicit user retry is a new charge.
    pub async fn charge_stored_card(
        &self,
        profile_id: &str,
        amount_usd_minor: i32,
    ) -> Result<ChargeReceipt, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/charges", self.base_url))
            .basic_auth(&self.login_id, Some(&self.transaction_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({
                "profile_id": profile_id,
                "amount_minor": amount_usd_minor,
                "currency": "usd",
                "reference": Uuid::new_v4().to_string(),
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::decline_from_response(resp, "charge_stored_card").await);
        }

        let charge: ChargeResponse = resp.json().await?;
        match charge.id {
            Some(id) => Ok(ChargeReceipt {
                vendor_transaction_id: id,
            }),
            None => Err(GatewayError::Unexpected(format!(
                "charge response missing id (status {:?})",
                charge.status
            ))),
        }
    }

    /// Stops future billing against a recurring profile.
    pub async fn cancel_recurring_profile(&self, profile_id: &str) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/profiles/{}/cancel",
                self.base_url, profile_id
            ))
            .basic_auth(&self.login_id, Some(&self.transaction_key))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::decline_from_response(resp, "cancel_recurring_profile").await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_response(status: u16, body: &'static str) -> reqwest::Response {
        let response = axum::http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        reqwest::Response::from(response)
    }

    #[tokio::test]
    async fn client_error_envelope_is_a_decline() {
        let resp = gateway_response(
            402,
            r#"{"error":{"code":"card_declined","message":"insufficient funds"}}"#,
        );

        let err = CardGatewayClient::decline_from_response(resp, "charge_stored_card").await;
        assert!(matches!(
            err,
            GatewayError::Declined { code: Some(code), .. } if code == "card_declined"
        ));
    }

    #[tokio::test]
    async fn credential_rejection_is_not_a_decline() {
        let resp = gateway_response(
            401,
            r#"{"error":{"code":"invalid_credentials","message":"bad api key"}}"#,
        );

        let err = CardGatewayClient::decline_from_response(resp, "charge_stored_card").await;
        assert!(matches!(err, GatewayError::Unexpected(_)));
    }

    #[tokio::test]
    async fn server_error_is_not_a_decline() {
        let resp = gateway_response(503, "service unavailable");

        let err = CardGatewayClient::decline_from_response(resp, "charge_stored_card").await;
        assert!(matches!(err, GatewayError::Unexpected(_)));
    }
}
