pub mod gateways;
pub mod reconciliation;
pub mod subscriptions;
pub mod transactions;
