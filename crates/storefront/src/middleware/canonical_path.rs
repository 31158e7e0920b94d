//! Path canonicalization for resource routes.
//!
//! Every resource URL is run through [`urlpath::clean`] before dispatch, so
//! `/orders/cus_1`, `/orders//cus_1/` and `/orders/./cus_1` all reach the
//! same handler. Routes are therefore declared with a trailing slash.

use axum::{
    extract::Request,
    http::{Uri, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::urlpath;

/// Middleware that replaces the request path with its cleaned form.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the cleaned path cannot form a valid URI.
pub async fn canonical_path(mut request: Request, next: Next) -> Result<Response, AppError> {
    let path = urlpath::clean(request.uri().path());
    set_request_path(&mut request, &path)?;
    Ok(next.run(request).await)
}

/// Swap the path component of the request URI, keeping the query string.
pub(crate) fn set_request_path(request: &mut Request, path: &str) -> Result<(), AppError> {
    let uri = with_path(request.uri(), path).map_err(|e| {
        tracing::debug!(path, error = %e, "Rejected unroutable path");
        AppError::NotFound
    })?;
    *request.uri_mut() = uri;
    Ok(())
}

fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}
