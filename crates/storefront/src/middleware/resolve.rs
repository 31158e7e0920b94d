//! Entity-resolving middleware and the extractors that read its results.
//!
//! A resolver peels the first segment off the request path, loads the entity
//! it names, stores that entity in the request extensions and hands the rest
//! of the path to the wrapped router:
//!
//! ```text
//! /campaigns/3/orders/new/  --nest-->  /3/orders/new/  --resolve_campaign-->  /orders/new/
//! /orders/cus_abc/confirm/  --nest-->  /cus_abc/confirm/  --resolve_order-->  /confirm/
//! ```
//!
//! Resolvers must wrap a whole router as a service rather than be added with
//! `Router::layer`, since the path they rewrite is the one the inner router
//! matches on.
//!
//! Handlers read the entity back with [`CampaignContext`] or [`OrderContext`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use swag_core::CampaignId;

use super::canonical_path::set_request_path;
use crate::error::AppError;
use crate::models::{Campaign, Order};
use crate::state::AppState;
use crate::urlpath;

/// Resolve the leading campaign ID segment.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the segment is not an integer or no
/// campaign can be loaded for it.
pub async fn resolve_campaign(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (head, tail) = urlpath::split(request.uri().path());

    let id = head.parse::<CampaignId>().map_err(|e| {
        tracing::debug!(segment = %head, error = %e, "Invalid campaign id");
        AppError::NotFound
    })?;

    let campaign = state.storage().campaign(id).await.map_err(|e| {
        tracing::debug!(campaign_id = %id, error = %e, "Campaign lookup failed");
        AppError::NotFound
    })?;

    set_request_path(&mut request, &tail)?;
    request.extensions_mut().insert(campaign);
    Ok(next.run(request).await)
}

/// Resolve the leading payment customer ID segment.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the segment does not decode or no order
/// uses that payment customer ID.
pub async fn resolve_order(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (head, tail) = urlpath::split(request.uri().path());

    let customer_id = urlencoding::decode(&head).map_err(|e| {
        tracing::debug!(segment = %head, error = %e, "Invalid payment customer id");
        AppError::NotFound
    })?;

    let order = state
        .storage()
        .order_by_payment_customer_id(&customer_id)
        .await
        .map_err(|e| {
            tracing::debug!(payment_customer_id = %customer_id, error = %e, "Order lookup failed");
            AppError::NotFound
        })?;

    set_request_path(&mut request, &tail)?;
    request.extensions_mut().insert(order);
    Ok(next.run(request).await)
}

/// The campaign resolved from the request path.
///
/// Rejects with a 500 when the route was not wrapped in [`resolve_campaign`].
#[derive(Debug, Clone)]
pub struct CampaignContext(pub Campaign);

impl<S> FromRequestParts<S> for CampaignContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Campaign>()
            .cloned()
            .map(Self)
            .ok_or(AppError::MissingContext("Campaign not provided"))
    }
}

/// The order resolved from the request path.
///
/// Rejects with a 500 when the route was not wrapped in [`resolve_order`].
#[derive(Debug, Clone)]
pub struct OrderContext(pub Order);

impl<S> FromRequestParts<S> for OrderContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Order>()
            .cloned()
            .map(Self)
            .ok_or(AppError::MissingContext("Order not provided"))
    }
}
