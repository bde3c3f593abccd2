use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::infrastructure::{
    muck::http_muck::HttpMuckClient,
    payments::card_gateway::{CardGatewayClient, ChargeReceipt, GatewayError},
};

/// Charging capability of the external card gateway, as the use cases see it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn charge_stored_card(
        &self,
        profile_id: &str,
        amount_usd_minor: i32,
    ) -> Result<ChargeReceipt, GatewayError>;

    async fn cancel_recurring_profile(&self, profile_id: &str) -> Result<(), GatewayError>;
}

#[async_trait]
impl CardGateway for CardGatewayClient {
    async fn charge_stored_card(
        &self,
        profile_id: &str,
        amount_usd_minor: i32,
    ) -> Result<ChargeReceipt, GatewayError> {
        self.charge_stored_card(profile_id, amount_usd_minor).await
    }

    async fn cancel_recurring_profile(&self, profile_id: &str) -> Result<(), GatewayError> {
        self.cancel_recurring_profile(profile_id).await
    }
}

/// Currency conversion and crediting on the game backend. Quotes are
/// non-binding; crediting returns the amount actually granted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfillmentService: Send + Sync {
    async fn usd_to_account_currency(&self, amount_usd_minor: i32) -> AnyResult<Option<i32>>;

    async fn credit_account_currency(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        is_recurring: bool,
    ) -> AnyResult<i32>;

    async fn reward_item(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        item_code: &str,
    ) -> AnyResult<i32>;
}

#[async_trait]
impl FulfillmentService for HttpMuckClient {
    async fn usd_to_account_currency(&self, amount_usd_minor: i32) -> AnyResult<Option<i32>> {
        self.usd_to_account_currency(amount_usd_minor).await
    }

    async fn credit_account_currency(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        is_recurring: bool,
    ) -> AnyResult<i32> {
        self.credit_account_currency(account_id, amount_usd_minor, currency_quoted, is_recurring)
            .await
    }

    async fn reward_item(
        &self,
        account_id: i64,
        amount_usd_minor: i32,
        currency_quoted: i32,
        item_code: &str,
    ) -> AnyResult<i32> {
        self.reward_item(account_id, amount_usd_minor, currency_quoted, item_code)
            .await
    }
}
