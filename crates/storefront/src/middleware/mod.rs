//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Canonical path (resource routes only)
//! 5. Campaign / order resolvers (nested under `/campaigns` and `/orders`)

pub mod canonical_path;
pub mod request_id;
pub mod resolve;

pub use canonical_path::canonical_path;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use resolve::{CampaignContext, OrderContext, resolve_campaign, resolve_order};
