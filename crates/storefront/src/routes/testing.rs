//! Fakes and fixtures shared by the route and middleware tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Router, body::Body, extract::Request, http, response::Response};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tower::ServiceExt;

use swag_core::Cents;

use crate::clock::FixedClock;
use crate::db::MemoryStorage;
use crate::models::Campaign;
use crate::payments::{Charge, PaymentCustomer, PaymentError, PaymentProcessor};
use crate::state::{AppState, SiteSettings};

pub const SUPPORT_EMAIL: &str = "help@swag.test";

type CustomerFn = dyn Fn(&str, &str) -> Result<PaymentCustomer, PaymentError> + Send + Sync;
type ChargeFn = dyn Fn(&str) -> Result<Charge, PaymentError> + Send + Sync;
type CreateChargeFn = dyn Fn(&str, Cents, &str) -> Result<Charge, PaymentError> + Send + Sync;

/// A payment processor whose answers are scripted per test.
///
/// Unscripted operations fail with a parse error. Every call is recorded.
#[derive(Default)]
pub struct FakePayments {
    create_customer: Option<Box<CustomerFn>>,
    charge: Option<Box<ChargeFn>>,
    create_charge: Option<Box<CreateChargeFn>>,
    calls: Mutex<Vec<String>>,
}

impl FakePayments {
    pub fn on_create_customer(
        mut self,
        f: impl Fn(&str, &str) -> Result<PaymentCustomer, PaymentError> + Send + Sync + 'static,
    ) -> Self {
        self.create_customer = Some(Box::new(f));
        self
    }

    pub fn on_charge(
        mut self,
        f: impl Fn(&str) -> Result<Charge, PaymentError> + Send + Sync + 'static,
    ) -> Self {
        self.charge = Some(Box::new(f));
        self
    }

    pub fn on_create_charge(
        mut self,
        f: impl Fn(&str, Cents, &str) -> Result<Charge, PaymentError> + Send + Sync + 'static,
    ) -> Self {
        self.create_charge = Some(Box::new(f));
        self
    }

    /// Calls made so far, formatted as `operation(args)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unscripted() -> PaymentError {
    PaymentError::Parse("unscripted payment call".to_owned())
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    async fn create_customer(
        &self,
        token: &str,
        email: &str,
    ) -> Result<PaymentCustomer, PaymentError> {
        self.record(format!("create_customer({token}, {email})"));
        self.create_customer
            .as_ref()
            .map_or_else(|| Err(unscripted()), |f| f(token, email))
    }

    async fn charge(&self, charge_id: &str) -> Result<Charge, PaymentError> {
        self.record(format!("charge({charge_id})"));
        self.charge
            .as_ref()
            .map_or_else(|| Err(unscripted()), |f| f(charge_id))
    }

    async fn create_charge(
        &self,
        customer_id: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError> {
        self.record(format!(
            "create_charge({customer_id}, {amount}, {idempotency_key})"
        ));
        self.create_charge
            .as_ref()
            .map_or_else(|| Err(unscripted()), |f| f(customer_id, amount, idempotency_key))
    }
}

/// Fixed "now" used by every fixture.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

pub fn settings() -> SiteSettings {
    SiteSettings {
        stripe_public_key: "pk_test_pfEqL5GDjl8h4pXjv8CWpi80".to_owned(),
        support_email: SUPPORT_EMAIL.to_owned(),
    }
}

/// Storage frozen at [`now`] holding one campaign that is active for another hour.
pub async fn storage_with_campaign() -> (Arc<MemoryStorage>, Campaign) {
    let storage = Arc::new(MemoryStorage::with_clock(Arc::new(FixedClock(now()))));
    let campaign = storage
        .create_campaign(
            now() - TimeDelta::hours(1),
            now() + TimeDelta::hours(1),
            Cents::new(1200),
        )
        .await;
    (storage, campaign)
}

pub fn state(storage: Arc<MemoryStorage>, payments: Arc<FakePayments>) -> AppState {
    AppState::new(storage, payments, Arc::new(FixedClock(now())), settings())
}

/// Send `request` through `router` and collect the body as text.
pub async fn send(router: Router, request: Request) -> Response<String> {
    let (parts, body) = router.oneshot(request).await.unwrap().into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    Response::from_parts(parts, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request {
    http::Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, fields: &[(&str, &str)]) -> Request {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    http::Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}
