use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A subscription starts as `New` (offered, not yet accepted), becomes
/// `Active` after the first successful charge and ends up `Closed` with a
/// closure reason. `Closed` is terminal.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    #[default]
    New,
    Active,
    Closed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::New => "new",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Closed => "closed",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "new" => SubscriptionStatus::New,
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Closed,
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a subscription was closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionClosure {
    UserDeclined,
    UserCancelled,
    VendorRefused,
}

impl SubscriptionClosure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionClosure::UserDeclined => "user_declined",
            SubscriptionClosure::UserCancelled => "user_cancelled",
            SubscriptionClosure::VendorRefused => "vendor_refused",
        }
    }
}

impl Display for SubscriptionClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
