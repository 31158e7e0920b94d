//! Swag Storefront library.
//!
//! This crate provides the campaign page and the order checkout flow as a
//! library, allowing the binary, the CLI and the tests to share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
pub mod urlpath;
