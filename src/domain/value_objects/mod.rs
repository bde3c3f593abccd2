pub mod billing_models;
pub mod catalogue;
pub mod enums;
pub mod payment_methods;
pub mod transaction_items;
