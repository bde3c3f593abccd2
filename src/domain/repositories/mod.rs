pub mod subscriptions;
pub mod transactions;
