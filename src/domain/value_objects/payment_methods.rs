use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown payment method kind: {0}")]
pub struct UnknownPaymentMethod(pub String);

/// How a purchase is paid. Card purchases charge a tokenised gateway profile;
/// PayPal purchases are settled externally and only carry the vendor's
/// reference once one is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Card { profile_id: String },
    PayPal { external_ref: Option<String> },
}

impl PaymentMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentMethod::Card { .. } => "card",
            PaymentMethod::PayPal { .. } => "paypal",
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            PaymentMethod::Card { profile_id } => Some(profile_id.as_str()),
            PaymentMethod::PayPal { external_ref } => external_ref.as_deref(),
        }
    }

    /// Rebuilds the method from its two storage columns.
    pub fn from_columns(
        kind: &str,
        reference: Option<String>,
    ) -> Result<Self, UnknownPaymentMethod> {
        match kind {
            "card" => Ok(PaymentMethod::Card {
                profile_id: reference.unwrap_or_default(),
            }),
            "paypal" => Ok(PaymentMethod::PayPal {
                external_ref: reference,
            }),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_round_trips_through_columns() {
        let method = PaymentMethod::Card {
            profile_id: "profile-7".to_string(),
        };
        let rebuilt =
            PaymentMethod::from_columns(method.kind(), method.reference().map(String::from))
                .unwrap();
        assert_eq!(rebuilt, method);
    }

    #[test]
    fn unattributed_paypal_is_allowed() {
        let rebuilt = PaymentMethod::from_columns("paypal", None).unwrap();
        assert_eq!(rebuilt, PaymentMethod::PayPal { external_ref: None });
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(PaymentMethod::from_columns("wire", None).is_err());
    }
}
