use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a billing transaction. `Open` is the only non-terminal
/// state; it is represented in storage by a NULL `result` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Open,
    Fulfilled,
    UserDeclined,
    VendorRefused,
    Expired,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Open => "open",
            TransactionStatus::Fulfilled => "fulfilled",
            TransactionStatus::UserDeclined => "user_declined",
            TransactionStatus::VendorRefused => "vendor_refused",
            TransactionStatus::Expired => "expired",
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("closure reason is unrecognised: {0}")]
pub struct UnrecognisedClosureReason(pub String);

/// Terminal result written to a transaction's `result` column. The set is
/// fixed by the storage layer; anything else is a programming error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClosureReason {
    Fulfilled,
    UserDeclined,
    VendorRefused,
    Expired,
}

impl ClosureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureReason::Fulfilled => "fulfilled",
            ClosureReason::UserDeclined => "user_declined",
            ClosureReason::VendorRefused => "vendor_refused",
            ClosureReason::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnrecognisedClosureReason> {
        match value {
            "fulfilled" => Ok(ClosureReason::Fulfilled),
            "user_declined" => Ok(ClosureReason::UserDeclined),
            "vendor_refused" => Ok(ClosureReason::VendorRefused),
            "expired" => Ok(ClosureReason::Expired),
            other => Err(UnrecognisedClosureReason(other.to_string())),
        }
    }

    pub fn as_status(&self) -> TransactionStatus {
        match self {
            ClosureReason::Fulfilled => TransactionStatus::Fulfilled,
            ClosureReason::UserDeclined => TransactionStatus::UserDeclined,
            ClosureReason::VendorRefused => TransactionStatus::VendorRefused,
            ClosureReason::Expired => TransactionStatus::Expired,
        }
    }
}

impl Display for ClosureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_reason_parses_accepted_values() {
        assert_eq!(ClosureReason::parse("fulfilled"), Ok(ClosureReason::Fulfilled));
        assert_eq!(
            ClosureReason::parse("user_declined"),
            Ok(ClosureReason::UserDeclined)
        );
        assert_eq!(
            ClosureReason::parse("vendor_refused"),
            Ok(ClosureReason::VendorRefused)
        );
        assert_eq!(ClosureReason::parse("expired"), Ok(ClosureReason::Expired));
    }

    #[test]
    fn closure_reason_rejects_anything_else() {
        assert!(ClosureReason::parse("open").is_err());
        assert!(ClosureReason::parse("refunded").is_err());
        assert!(ClosureReason::parse("").is_err());
    }
}
