//! Payment processor integration.
//!
//! Handlers talk to the processor through the [`PaymentProcessor`] trait so
//! that tests can substitute a fake. [`StripeClient`] is the production
//! implementation.

pub mod stripe;

use async_trait::async_trait;
use thiserror::Error;

use swag_core::{Cents, ChargeStatus};

pub use stripe::StripeClient;

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor rejected the request and returned a message meant for
    /// the buyer (declined card, invalid token, ...).
    #[error("{message}")]
    Processor { kind: String, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response without a processor error body.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl PaymentError {
    /// The processor's own message, if it is safe to show to the buyer.
    #[must_use]
    pub fn processor_message(&self) -> Option<&str> {
        match self {
            Self::Processor { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A customer record created at the processor from a card token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCustomer {
    pub id: String,
}

/// A charge as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub id: String,
    pub status: ChargeStatus,
}

/// Operations the checkout flow needs from a payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync + 'static {
    /// Create a customer from a single-use card token.
    async fn create_customer(
        &self,
        token: &str,
        email: &str,
    ) -> Result<PaymentCustomer, PaymentError>;

    /// Look up an existing charge.
    async fn charge(&self, charge_id: &str) -> Result<Charge, PaymentError>;

    /// Charge a customer's default card.
    ///
    /// Requests carrying the same `idempotency_key` are charged at most once.
    async fn create_charge(
        &self,
        customer_id: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError>;
}
