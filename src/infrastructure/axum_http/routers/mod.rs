pub mod account_currency;
pub mod subscriptions;
