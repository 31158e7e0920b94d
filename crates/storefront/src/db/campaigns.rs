//! Campaign repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use swag_core::{CampaignId, Cents};

use super::RepositoryError;
use crate::models::Campaign;

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: i32,
    price: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl From<CampaignRow> for Campaign {
    fn from(row: CampaignRow) -> Self {
        Self {
            id: CampaignId::new(row.id),
            price: Cents::new(row.price),
            starts_at: row.starts_at,
            ends_at: row.ends_at,
        }
    }
}

/// Repository for campaign database operations.
pub struct CampaignRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CampaignRepository<'a> {
    /// Create a new campaign repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the campaign whose window contains the database's current time.
    ///
    /// If windows overlap, the campaign ending soonest wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no campaign is active.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self) -> Result<Campaign, RepositoryError> {
        let row = sqlx::query_as::<_, CampaignRow>(
            r"
            SELECT id, price, starts_at, ends_at
            FROM campaigns
            WHERE starts_at <= now() AND ends_at > now()
            ORDER BY ends_at ASC
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;

        row.map(Campaign::from).ok_or(RepositoryError::NotFound)
    }

    /// Get a campaign by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the campaign does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CampaignId) -> Result<Campaign, RepositoryError> {
        let row = sqlx::query_as::<_, CampaignRow>(
            r"
            SELECT id, price, starts_at, ends_at
            FROM campaigns
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Campaign::from).ok_or(RepositoryError::NotFound)
    }

    /// Create a campaign.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `ends_at` is not after `starts_at`.
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        price: Cents,
    ) -> Result<Campaign, RepositoryError> {
        if ends_at <= starts_at {
            return Err(RepositoryError::Conflict(
                "campaign must end after it starts".to_owned(),
            ));
        }

        let row = sqlx::query_as::<_, CampaignRow>(
            r"
            INSERT INTO campaigns (starts_at, ends_at, price)
            VALUES ($1, $2, $3)
            RETURNING id, price, starts_at, ends_at
            ",
        )
        .bind(starts_at)
        .bind(ends_at)
        .bind(price)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
