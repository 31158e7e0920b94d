//! Persistence for campaigns and orders.
//!
//! # Database
//!
//! ## Tables
//!
//! - `campaigns` - Fundraising campaigns (price and active window)
//! - `orders` - Buyer orders with shipping address and payment references
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p swag-cli -- migrate
//! ```
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`PgStorage`] | Production |
//! | [`MemoryStorage`] | Tests and local development without a database |

pub mod campaigns;
pub mod memory;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use swag_core::{CampaignId, OrderId};

use crate::models::{Campaign, NewOrder, Order};

pub use campaigns::CampaignRepository;
pub use memory::MemoryStorage;
pub use orders::OrderRepository;

/// Errors returned by storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be turned back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The database driver failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-database backend failed.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// The persistence contract used by the HTTP handlers.
///
/// Implementations must be safe for concurrent use; handlers share a single
/// `Arc<dyn Storage>` and add no locking of their own.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// The campaign active right now.
    ///
    /// Returns [`RepositoryError::NotFound`] when no campaign is active.
    async fn active_campaign(&self) -> Result<Campaign, RepositoryError>;

    /// Load a campaign by ID.
    async fn campaign(&self, id: CampaignId) -> Result<Campaign, RepositoryError>;

    /// Persist a new order and return it with its assigned ID.
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Find the order whose payment customer ID equals `payment_customer_id`.
    async fn order_by_payment_customer_id(
        &self,
        payment_customer_id: &str,
    ) -> Result<Order, RepositoryError>;

    /// Record the charge and the confirmed shipping label in one write.
    async fn confirm_order(
        &self,
        id: OrderId,
        address_raw: &str,
        charge_id: &str,
    ) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`Storage`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn active_campaign(&self) -> Result<Campaign, RepositoryError> {
        CampaignRepository::new(&self.pool).get_active().await
    }

    async fn campaign(&self, id: CampaignId) -> Result<Campaign, RepositoryError> {
        CampaignRepository::new(&self.pool).get_by_id(id).await
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(order).await
    }

    async fn order_by_payment_customer_id(
        &self,
        payment_customer_id: &str,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool)
            .get_by_payment_customer_id(payment_customer_id)
            .await
    }

    async fn confirm_order(
        &self,
        id: OrderId,
        address_raw: &str,
        charge_id: &str,
    ) -> Result<(), RepositoryError> {
        OrderRepository::new(&self.pool)
            .confirm(id, address_raw, charge_id)
            .await
    }
}
