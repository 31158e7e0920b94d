//! Stripe REST API client.
//!
//! Uses the form-encoded v1 API directly over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use swag_core::{Cents, ChargeStatus};

use super::{Charge, PaymentCustomer, PaymentError, PaymentProcessor};
use crate::config::StripeConfig;

/// Request timeout for all Stripe calls.
const TIMEOUT: Duration = Duration::from_secs(30);

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Deserialize)]
struct ChargeResponse {
    id: String,
    status: ChargeStatus,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    currency: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            currency: config.currency.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

/// Decode a successful response, or turn an error response into a [`PaymentError`].
async fn decode<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await?;
        return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(ErrorEnvelope {
                error: ErrorBody {
                    kind,
                    message: Some(message),
                },
            }) => PaymentError::Processor { kind, message },
            _ => PaymentError::Api {
                status: status.as_u16(),
                message: body,
            },
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(skip(self, token, email))]
    async fn create_customer(
        &self,
        token: &str,
        email: &str,
    ) -> Result<PaymentCustomer, PaymentError> {
        let response = self
            .client
            .post(self.url("/customers"))
            .form(&[("source", token), ("email", email)])
            .send()
            .await?;

        let customer: CustomerResponse = decode(response).await?;
        tracing::debug!(customer_id = %customer.id, "Created payment customer");
        Ok(PaymentCustomer { id: customer.id })
    }

    #[tracing::instrument(skip(self))]
    async fn charge(&self, charge_id: &str) -> Result<Charge, PaymentError> {
        let url = self.url(&format!("/charges/{}", urlencoding::encode(charge_id)));
        let response = self.client.get(url).send().await?;

        let charge: ChargeResponse = decode(response).await?;
        Ok(Charge {
            id: charge.id,
            status: charge.status,
        })
    }

    #[tracing::instrument(skip(self, amount), fields(cents = amount.minor_units()))]
    async fn create_charge(
        &self,
        customer_id: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError> {
        let amount = amount.minor_units().to_string();
        let response = self
            .client
            .post(self.url("/charges"))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", self.currency.as_str()),
                ("customer", customer_id),
            ])
            .send()
            .await?;

        let charge: ChargeResponse = decode(response).await?;
        tracing::info!(charge_id = %charge.id, status = %charge.status, "Created charge");
        Ok(Charge {
            id: charge.id,
            status: charge.status,
        })
    }
}
