use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Client for the MUCK game server's web-interface endpoint. Currency
/// crediting stays on the MUCK side because in-game triggers fire there;
/// this client only asks and reports.
pub struct HttpMuckClient {
    http: reqwest::Client,
    endpoint: String,
    salt: String,
}

impl HttpMuckClient {
    pub fn new(endpoint: String, salt: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            salt,
        }
    }

    fn sign(&self, body: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.salt.as_bytes())
            .map_err(|_| anyhow!("failed to initialise muck signing key"))?;
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn request(&self, request_name: &str, mut payload: Value) -> Result<Value> {
        let fields = payload
            .as_object_mut()
            .ok_or_else(|| anyhow!("muck request payload must be a JSON object"))?;
        fields.insert("mwi_request".to_string(), json!(request_name));
        // Timestamp keeps repeated requests from producing identical
        // signed bodies.
        fields.insert("mwi_timestamp".to_string(), json!(Utc::now().timestamp()));

        let body = serde_json::to_string(&payload)?;
        let signature = self.sign(&body)?;

        debug!(request = request_name, "muck: sending signed request");
        let resp = self
            .http
            .post(&self.endpoint)
            .header("Signature", signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("muck request {request_name} failed to send"))?
            .error_for_status()
            .with_context(|| format!("muck request {request_name} was rejected"))?;

        let parsed: Value = resp
            .json()
            .await
            .with_context(|| format!("muck request {request_name} returned malformed JSON"))?;

        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("muck request {request_name} response missing result"))
    }

    /// Quote: how much account currency the given USD amount buys right now.
    /// `None` means the MUCK reported no quote available.
    pub async fn usd_to_account_currency(&self, amount_usd_minor: i32) -> Result<Option<i32>> {
        let result = self
            .request(
                "usdToAccountCurrency",
                json!({ "amount_usd_minor": amount_usd_minor }),
            )
            .await?;

        match result {
            Value::Null => Ok(None),
            other => Ok(Some(
                serde_json::from_value(other).context("muck quote was not an integer")?,
            )),
        }
    }

    /// Credits purchased account currency; the MUCK applies bonuses and
    /// returns the amount actually granted, which may exceed the quote.
    pub async fn credit_account_currency(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        is_recurring: bool,
    ) -> Result<i32> {
        let result = self
            .request(
                "fulfillAccountCurrencyPurchase",
                json!({
                    "account": account_id,
                    "amount_usd_minor": amount_usd_minor,
                    "account_currency": currency_quoted,
                    "recurring": is_recurring,
                }),
            )
            .await?;

        serde_json::from_value(result).context("muck credit response was not an integer")
    }

    /// Grants a purchased item in-game; returns any account currency awarded
    /// alongside it.
    pub async fn reward_item(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        item_code: &str,
    ) -> Result<i32> {
        let result = self
            .request(
                "rewardItem",
                json!({
                    "account": account_id,
                    "amount_usd_minor": amount_usd_minor,
                    "account_currency": currency_quoted,
                    "item_code": item_code,
                }),
            )
            .await?;

        serde_json::from_value(result).context("muck reward response was not an integer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_for_identical_bodies() {
        let client = HttpMuckClient::new("http://muck.test/mwi".to_string(), "salt".to_string());
        let first = client.sign(r#"{"mwi_request":"x"}"#).unwrap();
        let second = client.sign(r#"{"mwi_request":"x"}"#).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn signature_depends_on_salt() {
        let a = HttpMuckClient::new("http://muck.test/mwi".to_string(), "salt-a".to_string());
        let b = HttpMuckClient::new("http://muck.test/mwi".to_string(), "salt-b".to_string());
        assert_ne!(a.sign("body").unwrap(), b.sign("body").unwrap());
    }
}
