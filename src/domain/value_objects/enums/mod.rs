pub mod subscription_statuses;
pub mod transaction_statuses;
