//! Payment source and charge status enums.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The payment processor an order's payment details belong to.
///
/// Only one processor is supported; the tag is stored with every order so
/// that rows remain self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    #[default]
    Stripe,
}

impl PaymentSource {
    /// The tag stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown payment source tag.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid payment source: {0}")]
pub struct ParsePaymentSourceError(pub String);

impl FromStr for PaymentSource {
    type Err = ParsePaymentSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            _ => Err(ParsePaymentSourceError(s.to_owned())),
        }
    }
}

/// Status of a charge as reported by the payment processor.
///
/// Statuses the processor may add in the future are kept verbatim in
/// [`ChargeStatus::Other`] instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChargeStatus {
    Succeeded,
    Pending,
    Failed,
    Other(String),
}

impl ChargeStatus {
    /// The processor's wire value for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ChargeStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "succeeded" => Self::Succeeded,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for ChargeStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<ChargeStatus> for String {
    fn from(status: ChargeStatus) -> Self {
        match status {
            ChargeStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_source_roundtrip() {
        assert_eq!(PaymentSource::Stripe.as_str(), "stripe");
        assert_eq!("stripe".parse::<PaymentSource>().unwrap(), PaymentSource::Stripe);
        let err = "paypal".parse::<PaymentSource>().unwrap_err();
        assert_eq!(err, ParsePaymentSourceError("paypal".to_owned()));
        assert_eq!(err.to_string(), "invalid payment source: paypal");
    }

    #[test]
    fn test_charge_status_known_values() {
        let status: ChargeStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, ChargeStatus::Pending);
        assert_eq!(ChargeStatus::from("succeeded"), ChargeStatus::Succeeded);
        assert_eq!(ChargeStatus::from("failed"), ChargeStatus::Failed);
    }

    #[test]
    fn test_charge_status_keeps_unknown_values() {
        let status: ChargeStatus = serde_json::from_str("\"requires_review\"").unwrap();
        assert_eq!(status, ChargeStatus::Other("requires_review".to_owned()));
        assert_eq!(status.to_string(), "requires_review");
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"requires_review\"");
    }
}
