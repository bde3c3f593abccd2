use serde::{Deserialize, Serialize};

/// Line item bundled into a transaction. Owned by exactly one transaction and
/// persisted inside its `items_json` column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionItem {
    pub code: String,
    pub name: String,
    pub quantity: i32,
    pub price_usd_minor: i32,
    pub currency_value: i32,
}
