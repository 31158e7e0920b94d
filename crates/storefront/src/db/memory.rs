//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests and local development without `PostgreSQL`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use swag_core::{CampaignId, Cents, OrderId};

use super::{RepositoryError, Storage};
use crate::clock::{Clock, SystemClock};
use crate::models::{Campaign, NewOrder, Order};

#[derive(Default)]
struct Inner {
    campaigns: BTreeMap<CampaignId, Campaign>,
    orders: BTreeMap<OrderId, Order>,
    next_campaign_id: i32,
    next_order_id: i32,
}

/// Thread-safe, in-memory implementation of [`Storage`].
///
/// The active campaign is judged against the injected [`Clock`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorage {
    /// Empty storage using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty storage that decides which campaign is active using `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            clock,
        }
    }

    /// Add a campaign and return it with its assigned ID.
    pub async fn create_campaign(
        &self,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        price: Cents,
    ) -> Campaign {
        let mut inner = self.inner.write().await;
        inner.next_campaign_id += 1;
        let campaign = Campaign {
            id: CampaignId::new(inner.next_campaign_id),
            price,
            starts_at,
            ends_at,
        };
        inner.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    /// Snapshot of a stored order by its internal ID.
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.inner.read().await.orders.get(&id).cloned()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn active_campaign(&self) -> Result<Campaign, RepositoryError> {
        let now = self.clock.now();
        let inner = self.inner.read().await;
        inner
            .campaigns
            .values()
            .filter(|c| c.is_active_at(now))
            .min_by_key(|c| c.ends_at)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn campaign(&self, id: CampaignId) -> Result<Campaign, RepositoryError> {
        let inner = self.inner.read().await;
        inner
            .campaigns
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write().await;

        if !inner.campaigns.contains_key(&order.campaign_id) {
            return Err(RepositoryError::Conflict(format!(
                "campaign {} does not exist",
                order.campaign_id
            )));
        }
        if order.payment.customer_id.is_empty() {
            return Err(RepositoryError::Conflict(
                "payment customer id is required".to_owned(),
            ));
        }
        if inner
            .orders
            .values()
            .any(|o| o.payment.customer_id == order.payment.customer_id)
        {
            return Err(RepositoryError::Conflict(
                "payment customer id already used".to_owned(),
            ));
        }

        inner.next_order_id += 1;
        let order = order.into_order(OrderId::new(inner.next_order_id));
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order_by_payment_customer_id(
        &self,
        payment_customer_id: &str,
    ) -> Result<Order, RepositoryError> {
        let inner = self.inner.read().await;
        inner
            .orders
            .values()
            .find(|o| o.payment.customer_id == payment_customer_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn confirm_order(
        &self,
        id: OrderId,
        address_raw: &str,
        charge_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if let Some(existing) = &order.payment.charge_id
            && existing != charge_id
        {
            return Err(RepositoryError::Conflict(format!(
                "order {id} already has a different charge"
            )));
        }

        address_raw.clone_into(&mut order.address.raw);
        order.payment.charge_id = Some(charge_id.to_owned());
        Ok(())
    }
}
