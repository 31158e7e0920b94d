//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Storage owns them; handlers receive fresh copies per request.

pub mod campaign;
pub mod order;

pub use campaign::Campaign;
pub use order::{Address, Customer, NewOrder, Order, Payment};
