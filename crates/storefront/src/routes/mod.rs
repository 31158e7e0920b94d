//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Health check
//! GET  /img/*, /css/*, /favicon.ico          - Static assets
//!
//! # Resource routes (canonical paths, trailing slash optional)
//! GET  /                                     - Active campaign or ended page
//! GET  /campaigns/:id/orders/new/            - Order form
//! POST /campaigns/:id/orders/new/            - Order form
//! POST /campaigns/:id/orders/                - Create order
//! GET  /orders/:payment_customer_id/         - Review or charge status
//! POST /orders/:payment_customer_id/confirm/ - Charge order
//! ```
//!
//! Everything outside the static prefixes goes through
//! [`canonical_path`](crate::middleware::canonical_path) first, so resource
//! routes are declared with a trailing slash.

pub mod campaigns;
pub mod orders;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use askama::Template;
use axum::{
    Router,
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower::Layer;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::middleware::{canonical_path, request_id_middleware, resolve_campaign, resolve_order};
use crate::state::AppState;

/// Render a template into an HTML response.
///
/// Render failures are logged and answered with an empty 200.
pub(crate) fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render template");
            ().into_response()
        }
    }
}

/// Liveness health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

/// Routes below a resolved campaign.
pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders/new/",
            get(orders::new_order).post(orders::new_order),
        )
        .route("/orders/", post(orders::create_order))
}

/// Routes below a resolved order.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::show_order))
        .route("/confirm/", post(orders::confirm_order))
}

/// Campaign page plus the resolver-wrapped campaign and order hierarchies.
pub fn resource_routes(state: AppState) -> Router {
    let campaign_service = from_fn_with_state(state.clone(), resolve_campaign)
        .layer(campaign_routes().with_state(state.clone()));
    let order_service = from_fn_with_state(state.clone(), resolve_order)
        .layer(order_routes().with_state(state.clone()));

    Router::new()
        .route("/", get(campaigns::show_active))
        .nest_service("/campaigns", campaign_service)
        .nest_service("/orders", order_service)
        .with_state(state)
}

/// The full storefront application, minus the Sentry layers.
pub fn app(state: AppState, assets_dir: &Path) -> Router {
    let img_dir = assets_dir.join("img");

    Router::new()
        .route("/health", get(health))
        .nest_service("/img", ServeDir::new(&img_dir))
        .nest_service("/css", ServeDir::new(assets_dir.join("css")))
        .route_service("/favicon.ico", ServeFile::new(img_dir.join("favicon.ico")))
        .fallback_service(from_fn(canonical_path).layer(resource_routes(state)))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
}
