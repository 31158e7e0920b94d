//! Order checkout route handlers.
//!
//! An order moves through three states:
//!
//! ```text
//! New ──create_order──▶ Created ──confirm_order──▶ Charged
//! ```
//!
//! `show_order` renders the review page for a created order and the charge
//! status for a charged one.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use swag_core::{CampaignId, ChargeStatus, OrderId, PaymentSource};

use super::render;
use crate::error::AppError;
use crate::middleware::{CampaignContext, OrderContext};
use crate::models::{Address, Campaign, Customer, NewOrder, Order, Payment};
use crate::state::AppState;

const CHARGE_SUCCEEDED: &str =
    "Your order has been completed successfully! You will be contacted when it ships.";
const CHARGE_PENDING: &str = "Your payment is still pending.";
const CHARGE_FAILED: &str =
    "Your payment failed. :( Please create a new order with a new card if you want to try again.";

/// Order form template.
#[derive(Template)]
#[template(path = "orders/new.html")]
pub struct NewOrderTemplate {
    pub campaign_id: CampaignId,
    /// Price in major currency units.
    pub price: i64,
    pub stripe_public_key: String,
}

/// Review page shown before the buyer confirms the charge.
#[derive(Template)]
#[template(path = "orders/review.html")]
pub struct ReviewTemplate {
    /// Public order ID (the payment customer ID).
    pub order_id: String,
    pub confirm_path: String,
    /// Editable shipping label.
    pub address: String,
    /// Price in major currency units.
    pub price: i64,
    /// Charge attempt this rendering of the form submits.
    pub attempt: Uuid,
}

/// Fields posted by the order form.
///
/// Capitalized field names are accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct OrderForm {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Street1")]
    pub street1: String,
    #[serde(default, alias = "Street2")]
    pub street2: String,
    #[serde(default, alias = "City")]
    pub city: String,
    #[serde(default, alias = "State")]
    pub state: String,
    #[serde(default, alias = "Zip")]
    pub zip: String,
    #[serde(default, alias = "Country")]
    pub country: String,
    /// Single-use card token produced by Stripe.js.
    #[serde(default, rename = "stripe-token")]
    pub stripe_token: String,
}

impl OrderForm {
    fn into_new_order(self, campaign_id: CampaignId, payment_customer_id: String) -> NewOrder {
        let mut address = Address {
            street1: self.street1,
            street2: self.street2,
            city: self.city,
            state: self.state,
            zip: self.zip,
            country: self.country,
            raw: String::new(),
        };
        address.raw = address.label(&self.name);

        NewOrder {
            campaign_id,
            customer: Customer {
                name: self.name,
                email: self.email,
            },
            address,
            payment: Payment {
                source: PaymentSource::Stripe,
                customer_id: payment_customer_id,
                charge_id: None,
            },
        }
    }
}

/// Fields posted by the review page.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmForm {
    /// Shipping label as edited by the buyer.
    #[serde(default, rename = "address-raw")]
    pub address_raw: String,
    /// Charge attempt issued with the review page.
    #[serde(default)]
    pub attempt: String,
}

impl ConfirmForm {
    /// The submitted charge attempt, or a fresh one if it is missing or malformed.
    fn attempt(&self) -> Uuid {
        Uuid::parse_str(&self.attempt).unwrap_or_else(|_| {
            tracing::debug!(attempt = %self.attempt, "No usable charge attempt submitted");
            Uuid::new_v4()
        })
    }
}

/// Key under which the processor de-duplicates one charge attempt for an order.
///
/// Every rendering of the review page issues a new attempt, so a repeated
/// submit of the same form is de-duplicated while a retry after a failed
/// charge is sent as a new request.
#[must_use]
pub fn charge_idempotency_key(id: OrderId, attempt: Uuid) -> String {
    format!("order-{id}-charge-{attempt}")
}

/// `302 Found` pointing at `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

/// Load the campaign an order was placed against.
async fn order_campaign(state: &AppState, order: &Order) -> Result<Campaign, AppError> {
    state
        .storage()
        .campaign(order.campaign_id)
        .await
        .map_err(|e| {
            tracing::debug!(
                order_id = %order.id,
                campaign_id = %order.campaign_id,
                error = %e,
                "Failed to load the order's campaign"
            );
            AppError::Database(e)
        })
}

/// Render the order form for a campaign.
#[instrument(skip(state, campaign), fields(campaign_id = %campaign.id))]
pub async fn new_order(
    State(state): State<AppState>,
    CampaignContext(campaign): CampaignContext,
) -> Response {
    render(&NewOrderTemplate {
        campaign_id: campaign.id,
        price: campaign.price.major_units(),
        stripe_public_key: state.settings().stripe_public_key.clone(),
    })
}

/// Create the payment customer and the order, then send the buyer to review it.
///
/// # Errors
///
/// Returns a 500 if the form carries no email or the payment customer cannot
/// be created, and a 400 if the order cannot be stored.
#[instrument(skip(state, campaign, form), fields(campaign_id = %campaign.id))]
pub async fn create_order(
    State(state): State<AppState>,
    CampaignContext(campaign): CampaignContext,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    if form.email.is_empty() {
        return Err(AppError::Internal(
            "order form submitted without an email".to_owned(),
        ));
    }

    let customer = state
        .payments()
        .create_customer(&form.stripe_token, &form.email)
        .await
        .map_err(|e| {
            tracing::error!(email = %form.email, error = %e, "Failed to create payment customer");
            AppError::support(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Something went wrong processing your payment information. Try again, or contact me - {} - if the problem persists.",
                    state.settings().support_email
                ),
            )
        })?;

    let order = state
        .storage()
        .create_order(form.into_new_order(campaign.id, customer.id))
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to store order: {e}")))?;

    tracing::info!(
        order_id = %order.id,
        payment_customer_id = %order.payment.customer_id,
        "Order created"
    );
    Ok(found(&order.path()))
}

/// Show the review page, or the charge status once the order was charged.
///
/// # Errors
///
/// Returns a 500 if the order's campaign cannot be loaded.
#[instrument(skip(state, order), fields(order_id = %order.id))]
pub async fn show_order(
    State(state): State<AppState>,
    OrderContext(order): OrderContext,
) -> Result<Response, AppError> {
    let campaign = order_campaign(&state, &order).await?;

    let Some(charge_id) = &order.payment.charge_id else {
        let page = render(&ReviewTemplate {
            confirm_path: format!("{}/confirm/", order.path()),
            order_id: order.payment.customer_id.clone(),
            address: order.address.raw.clone(),
            price: campaign.price.major_units(),
            attempt: Uuid::new_v4(),
        });
        return Ok(([(header::CACHE_CONTROL, "no-store")], page).into_response());
    };

    let support_email = &state.settings().support_email;
    let charge = match state.payments().charge(charge_id).await {
        Ok(charge) => charge,
        Err(e) => {
            tracing::error!(charge_id = %charge_id, error = %e, "Failed to look up charge");
            return Ok(format!(
                "Failed to lookup the status of your order. Please try again, or contact me if this persists - {support_email}"
            )
            .into_response());
        }
    };

    let message = match &charge.status {
        ChargeStatus::Succeeded => CHARGE_SUCCEEDED.to_owned(),
        ChargeStatus::Pending => CHARGE_PENDING.to_owned(),
        ChargeStatus::Failed => CHARGE_FAILED.to_owned(),
        ChargeStatus::Other(status) => {
            tracing::warn!(charge_id = %charge_id, status = %status, "Unexpected charge status");
            format!(
                "We could not determine the status of your payment. Please contact me for support - {support_email}"
            )
        }
    };
    Ok(message.into_response())
}

/// Charge the order with the confirmed shipping label and record the charge.
///
/// # Errors
///
/// Returns the processor's message with a 200 for declined cards, and a 500
/// if the charge fails otherwise or cannot be recorded.
#[instrument(skip(state, order, form), fields(order_id = %order.id))]
pub async fn confirm_order(
    State(state): State<AppState>,
    OrderContext(order): OrderContext,
    Form(form): Form<ConfirmForm>,
) -> Result<Response, AppError> {
    let campaign = order_campaign(&state, &order).await?;

    if order.is_charged() {
        tracing::info!("Order already charged, skipping charge");
        return Ok(found(&order.path()));
    }

    let support_email = &state.settings().support_email;
    let charge = state
        .payments()
        .create_charge(
            &order.payment.customer_id,
            campaign.price,
            &charge_idempotency_key(order.id, form.attempt()),
        )
        .await
        .map_err(|e| match e.processor_message() {
            Some(message) => {
                tracing::info!(error = %e, "Charge declined by processor");
                AppError::support(StatusCode::OK, message)
            }
            None => {
                tracing::error!(error = %e, "Failed to create charge");
                AppError::support(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!(
                        "Something went wrong processing your card. Please contact me for support - {support_email}"
                    ),
                )
            }
        })?;

    state
        .storage()
        .confirm_order(order.id, &form.address_raw, &charge.id)
        .await
        .map_err(|e| {
            tracing::error!(charge_id = %charge.id, error = %e, "Charged but failed to record the charge");
            AppError::support(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "You were charged, but something went wrong saving your data. Please contact me for support - {support_email}"
                ),
            )
        })?;

    tracing::info!(charge_id = %charge.id, "Order confirmed");
    Ok(found(&order.path()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::Router;

    use swag_core::Cents;

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::{MemoryStorage, RepositoryError, Storage};
    use crate::payments::{Charge, PaymentCustomer, PaymentError};
    use crate::routes::app;
    use crate::routes::testing::{self, FakePayments, SUPPORT_EMAIL};

    fn router(storage: &Arc<MemoryStorage>, payments: &Arc<FakePayments>) -> Router {
        app(
            testing::state(storage.clone(), payments.clone()),
            Path::new("assets"),
        )
    }

    fn order_fields(email: &str) -> Vec<(&str, &str)> {
        vec![
            ("name", "Chris Greene"),
            ("email", email),
            ("street1", "PO Box 295"),
            ("street2", ""),
            ("city", "Bedford"),
            ("state", "PA"),
            ("zip", "15522"),
            ("country", "United States"),
            ("stripe-token", "tok_visa"),
        ]
    }

    async fn created_order(storage: &Arc<MemoryStorage>, campaign: &Campaign) -> Order {
        let form = OrderForm {
            name: "Jane Doe".to_owned(),
            email: "jane@doe.com".to_owned(),
            street1: "123 Sticker St".to_owned(),
            city: "San Francisco".to_owned(),
            state: "CA".to_owned(),
            zip: "94139".to_owned(),
            country: "United States".to_owned(),
            ..OrderForm::default()
        };
        storage
            .create_order(form.into_new_order(campaign.id, "cus_X".to_owned()))
            .await
            .unwrap()
    }

    fn charge(id: &str, status: ChargeStatus) -> Charge {
        Charge {
            id: id.to_owned(),
            status,
        }
    }

    #[tokio::test]
    async fn test_new_renders_form_for_get_and_post() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default());

        for request in [
            testing::get(&format!("/campaigns/{}/orders/new", campaign.id)),
            testing::post_form(&format!("/campaigns/{}/orders/new/", campaign.id), &[]),
        ] {
            let response = testing::send(router(&storage, &payments), request).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = response.body();
            assert!(body.contains("pk_test_pfEqL5GDjl8h4pXjv8CWpi80"), "{body}");
            assert!(body.contains("$12"), "{body}");
            assert!(
                body.contains(&format!("action=\"/campaigns/{}/orders/\"", campaign.id)),
                "{body}"
            );
        }
        assert!(payments.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_redirects_to_order_page() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default().on_create_customer(|token, email| {
            assert_eq!(token, "tok_visa");
            assert_eq!(email, "a@b.com");
            Ok(PaymentCustomer {
                id: "cus_X".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form(
                &format!("/campaigns/{}/orders", campaign.id),
                &order_fields("a@b.com"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/orders/cus_X");

        let order = storage.order_by_payment_customer_id("cus_X").await.unwrap();
        assert_eq!(order.campaign_id, campaign.id);
        assert_eq!(order.payment.source, PaymentSource::Stripe);
        assert_eq!(order.payment.charge_id, None);
        assert_eq!(order.customer.email, "a@b.com");
        assert_eq!(
            order.address.raw,
            "CHRIS GREENE\nPO BOX 295\nBEDFORD PA  15522\nUNITED STATES"
        );
    }

    #[tokio::test]
    async fn test_create_accepts_capitalized_field_names() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default().on_create_customer(|_, _| {
            Ok(PaymentCustomer {
                id: "cus_Y".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form(
                &format!("/campaigns/{}/orders/", campaign.id),
                &[
                    ("Name", "Jon Calhoun"),
                    ("Email", "jon@calhoun.io"),
                    ("Street1", "123 Sticker St"),
                    ("stripe-token", "tok_visa"),
                ],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let order = storage.order_by_payment_customer_id("cus_Y").await.unwrap();
        assert_eq!(order.customer.name, "Jon Calhoun");
    }

    #[tokio::test]
    async fn test_create_without_email_is_a_server_error() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default());

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form(
                &format!("/campaigns/{}/orders/", campaign.id),
                &order_fields(""),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(payments.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_payment_failure_asks_to_retry() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default().on_create_customer(|_, _| {
            Err(PaymentError::Api {
                status: 500,
                message: "boom".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form(
                &format!("/campaigns/{}/orders/", campaign.id),
                &order_fields("a@b.com"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().contains("processing your payment information"));
        assert!(response.body().contains(SUPPORT_EMAIL));
        assert!(storage.order_by_payment_customer_id("cus_X").await.is_err());
    }

    #[tokio::test]
    async fn test_create_storage_failure_is_a_bad_request() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_customer(|_, _| {
            Ok(PaymentCustomer {
                id: "cus_X".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form(
                &format!("/campaigns/{}/orders/", campaign.id),
                &order_fields("a@b.com"),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), "Something went wrong...");
    }

    #[tokio::test]
    async fn test_unknown_campaign_is_not_found() {
        let (storage, _) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default());

        for uri in ["/campaigns/999/orders/new/", "/campaigns/abc/orders/new/"] {
            let response = testing::send(router(&storage, &payments), testing::get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_show_renders_review_for_uncharged_order() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default());

        let response =
            testing::send(router(&storage, &payments), testing::get("/orders/cus_X")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.body();
        assert!(body.contains("cus_X"), "{body}");
        assert!(body.contains("JANE DOE\n123 STICKER ST\nSAN FRANCISCO CA  94139"), "{body}");
        assert!(body.contains("action=\"/orders/cus_X/confirm/\""), "{body}");
        assert!(body.contains("$12"), "{body}");
        assert!(payments.calls().is_empty());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    /// The charge attempt embedded in a rendered review page.
    fn attempt_in(body: &str) -> Uuid {
        let marker = "name=\"attempt\" value=\"";
        let start = body.find(marker).unwrap() + marker.len();
        let len = body[start..].find('"').unwrap();
        Uuid::parse_str(&body[start..start + len]).unwrap()
    }

    #[tokio::test]
    async fn test_review_page_issues_new_attempt_per_render() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default());

        let first =
            testing::send(router(&storage, &payments), testing::get("/orders/cus_X/")).await;
        let second =
            testing::send(router(&storage, &payments), testing::get("/orders/cus_X/")).await;

        assert_ne!(attempt_in(first.body()), attempt_in(second.body()));
    }

    #[tokio::test]
    async fn test_show_maps_charge_status_to_message() {
        let cases = [
            (ChargeStatus::Succeeded, CHARGE_SUCCEEDED),
            (ChargeStatus::Pending, CHARGE_PENDING),
            (ChargeStatus::Failed, CHARGE_FAILED),
            (
                ChargeStatus::Other("requires_review".to_owned()),
                "could not determine the status",
            ),
        ];

        for (status, expected) in cases {
            let (storage, campaign) = testing::storage_with_campaign().await;
            let order = created_order(&storage, &campaign).await;
            storage.confirm_order(order.id, "LABEL", "chg_Y").await.unwrap();
            let payments = Arc::new(FakePayments::default().on_charge(move |id| {
                assert_eq!(id, "chg_Y");
                Ok(charge(id, status.clone()))
            }));

            let response =
                testing::send(router(&storage, &payments), testing::get("/orders/cus_X/")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.body().contains(expected), "{}", response.body());
        }
    }

    #[tokio::test]
    async fn test_show_charge_lookup_failure_is_reported_in_body() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let order = created_order(&storage, &campaign).await;
        storage.confirm_order(order.id, "LABEL", "chg_Y").await.unwrap();
        let payments = Arc::new(FakePayments::default().on_charge(|_| {
            Err(PaymentError::Parse("timeout".to_owned()))
        }));

        let response =
            testing::send(router(&storage, &payments), testing::get("/orders/cus_X/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().contains("Failed to lookup the status of your order"));
        assert!(response.body().contains(SUPPORT_EMAIL));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (storage, _) = testing::storage_with_campaign().await;
        let payments = Arc::new(FakePayments::default());
        let response =
            testing::send(router(&storage, &payments), testing::get("/orders/cus_nope/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_charges_and_stores_submitted_address() {
        let attempt = Uuid::new_v4().to_string();
        for submitted in [
            "JANE DOE\n123 STICKER ST\nSAN FRANCISCO CA  94139\nUNITED STATES",
            "Jane Doe\nc/o Swag Desk\n1 Other Rd",
        ] {
            let (storage, campaign) = testing::storage_with_campaign().await;
            let order = created_order(&storage, &campaign).await;
            let payments = Arc::new(FakePayments::default().on_create_charge(
                |customer_id, amount, _| {
                    assert_eq!(customer_id, "cus_X");
                    assert_eq!(amount, Cents::new(1200));
                    Ok(charge("chg_Y", ChargeStatus::Succeeded))
                },
            ));

            let response = testing::send(
                router(&storage, &payments),
                testing::post_form(
                    "/orders/cus_X/confirm",
                    &[("address-raw", submitted), ("attempt", &attempt)],
                ),
            )
            .await;

            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[header::LOCATION], "/orders/cus_X");
            let stored = storage.order(order.id).await.unwrap();
            assert_eq!(stored.payment.charge_id.as_deref(), Some("chg_Y"));
            assert_eq!(stored.address.raw, submitted);
            assert_eq!(
                payments.calls(),
                vec![format!("create_charge(cus_X, 1200, order-{}-charge-{attempt})", order.id)]
            );
        }
    }

    #[tokio::test]
    async fn test_confirm_processor_error_is_shown_verbatim() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let order = created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_charge(|_, _, _| {
            Err(PaymentError::Processor {
                kind: "card_error".to_owned(),
                message: "Your card was declined.".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form("/orders/cus_X/confirm/", &[("address-raw", "X")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "Your card was declined.");
        assert!(!storage.order(order.id).await.unwrap().is_charged());
    }

    #[tokio::test]
    async fn test_confirm_other_payment_error_is_a_server_error() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_charge(|_, _, _| {
            Err(PaymentError::Api {
                status: 502,
                message: "bad gateway".to_owned(),
            })
        }));

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form("/orders/cus_X/confirm/", &[("address-raw", "X")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().contains("processing your card"));
        assert!(!response.body().contains("bad gateway"));
    }

    #[tokio::test]
    async fn test_confirm_does_not_charge_twice() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let order = created_order(&storage, &campaign).await;
        storage.confirm_order(order.id, "LABEL", "chg_Y").await.unwrap();
        let payments = Arc::new(FakePayments::default());

        let response = testing::send(
            router(&storage, &payments),
            testing::post_form("/orders/cus_X/confirm/", &[("address-raw", "NEW")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(payments.calls().is_empty());
        assert_eq!(storage.order(order.id).await.unwrap().address.raw, "LABEL");
    }

    #[tokio::test]
    async fn test_retry_after_failed_charge_sends_new_key() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let order = created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_charge(|_, _, _| {
            Err(PaymentError::Api {
                status: 500,
                message: "api_error".to_owned(),
            })
        }));

        let mut attempts = Vec::new();
        for _ in 0..2 {
            let review =
                testing::send(router(&storage, &payments), testing::get("/orders/cus_X/")).await;
            let attempt = attempt_in(review.body()).to_string();
            let response = testing::send(
                router(&storage, &payments),
                testing::post_form(
                    "/orders/cus_X/confirm/",
                    &[("address-raw", "X"), ("attempt", &attempt)],
                ),
            )
            .await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            attempts.push(attempt);
        }

        let calls = payments.calls();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0], calls[1]);
        for (call, attempt) in calls.iter().zip(&attempts) {
            assert_eq!(
                call,
                &format!("create_charge(cus_X, 1200, order-{}-charge-{attempt})", order.id)
            );
        }
    }

    #[tokio::test]
    async fn test_repeated_submit_of_one_form_reuses_key() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_charge(|_, _, _| {
            Err(PaymentError::Api {
                status: 500,
                message: "api_error".to_owned(),
            })
        }));
        let attempt = Uuid::new_v4().to_string();

        for _ in 0..2 {
            testing::send(
                router(&storage, &payments),
                testing::post_form(
                    "/orders/cus_X/confirm/",
                    &[("address-raw", "X"), ("attempt", &attempt)],
                ),
            )
            .await;
        }

        let calls = payments.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn test_missing_attempt_gets_a_fresh_key() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default().on_create_charge(|_, _, _| {
            Err(PaymentError::Api {
                status: 500,
                message: "api_error".to_owned(),
            })
        }));

        for attempt in ["", "not-a-uuid"] {
            testing::send(
                router(&storage, &payments),
                testing::post_form(
                    "/orders/cus_X/confirm/",
                    &[("address-raw", "X"), ("attempt", attempt)],
                ),
            )
            .await;
        }

        let calls = payments.calls();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0], calls[1]);
        assert!(!calls[1].contains("not-a-uuid"));
    }

    /// Delegates to [`MemoryStorage`] but fails the selected operations.
    struct FailingStorage {
        inner: Arc<MemoryStorage>,
        fail_campaign: bool,
        fail_confirm: bool,
    }

    #[async_trait::async_trait]
    impl Storage for FailingStorage {
        async fn active_campaign(&self) -> Result<Campaign, RepositoryError> {
            self.inner.active_campaign().await
        }

        async fn campaign(&self, id: CampaignId) -> Result<Campaign, RepositoryError> {
            if self.fail_campaign {
                return Err(RepositoryError::Internal("connection reset".to_owned()));
            }
            self.inner.campaign(id).await
        }

        async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
            self.inner.create_order(order).await
        }

        async fn order_by_payment_customer_id(
            &self,
            payment_customer_id: &str,
        ) -> Result<Order, RepositoryError> {
            self.inner
                .order_by_payment_customer_id(payment_customer_id)
                .await
        }

        async fn confirm_order(
            &self,
            id: OrderId,
            address_raw: &str,
            charge_id: &str,
        ) -> Result<(), RepositoryError> {
            if self.fail_confirm {
                return Err(RepositoryError::Internal("disk full".to_owned()));
            }
            self.inner.confirm_order(id, address_raw, charge_id).await
        }
    }

    fn failing_router(storage: FailingStorage, payments: &Arc<FakePayments>) -> Router {
        let state = AppState::new(
            Arc::new(storage),
            payments.clone(),
            Arc::new(FixedClock(testing::now())),
            testing::settings(),
        );
        app(state, Path::new("assets"))
    }

    #[tokio::test]
    async fn test_confirm_reports_charge_that_could_not_be_saved() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        let order = created_order(&storage, &campaign).await;
        let payments = Arc::new(
            FakePayments::default()
                .on_create_charge(|_, _, _| Ok(charge("chg_Y", ChargeStatus::Succeeded))),
        );
        let failing = FailingStorage {
            inner: storage.clone(),
            fail_campaign: false,
            fail_confirm: true,
        };

        let response = testing::send(
            failing_router(failing, &payments),
            testing::post_form("/orders/cus_X/confirm/", &[("address-raw", "X")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body(),
            &format!(
                "You were charged, but something went wrong saving your data. Please contact me for support - {SUPPORT_EMAIL}"
            )
        );
        assert_eq!(payments.calls().len(), 1);
        assert!(payments.calls()[0].starts_with("create_charge(cus_X, 1200, "));
        assert!(!storage.order(order.id).await.unwrap().is_charged());
    }

    #[tokio::test]
    async fn test_campaign_lookup_failure_is_a_server_error() {
        let (storage, campaign) = testing::storage_with_campaign().await;
        created_order(&storage, &campaign).await;
        let payments = Arc::new(FakePayments::default());

        for request in [
            testing::get("/orders/cus_X/"),
            testing::post_form("/orders/cus_X/confirm/", &[("address-raw", "X")]),
        ] {
            let failing = FailingStorage {
                inner: storage.clone(),
                fail_campaign: true,
                fail_confirm: false,
            };
            let response = testing::send(failing_router(failing, &payments), request).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(response.body(), crate::error::GENERIC_MESSAGE);
        }
        assert!(payments.calls().is_empty());
    }
}
