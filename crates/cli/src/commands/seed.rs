//! Seed the database with a campaign.
//!
//! # Usage
//!
//! ```bash
//! # A one-hour, $12 campaign starting now
//! swag-cli seed campaign
//!
//! # A three-day, $15 campaign starting in 30 minutes
//! swag-cli seed campaign --price 1500 --duration-minutes 4320 --starts-in-minutes 30
//! ```

use chrono::{DateTime, TimeDelta, Utc};

use swag_core::Cents;
use swag_storefront::config::{ConfigError, get_database_url};
use swag_storefront::db::{CampaignRepository, RepositoryError, create_pool};

/// Errors from seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid campaign: {0}")]
    Invalid(String),
}

/// Compute a campaign's `(starts_at, ends_at)` window relative to `now`.
///
/// # Errors
///
/// Returns `SeedError::Invalid` if the duration is not positive or the
/// offsets overflow.
pub fn campaign_window(
    now: DateTime<Utc>,
    starts_in_minutes: i64,
    duration_minutes: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SeedError> {
    if duration_minutes <= 0 {
        return Err(SeedError::Invalid(
            "duration must be at least one minute".to_owned(),
        ));
    }

    let offset = |minutes: i64| {
        TimeDelta::try_minutes(minutes)
            .ok_or_else(|| SeedError::Invalid(format!("{minutes} minutes is out of range")))
    };

    let starts_at = now
        .checked_add_signed(offset(starts_in_minutes)?)
        .ok_or_else(|| SeedError::Invalid("start time is out of range".to_owned()))?;
    let ends_at = starts_at
        .checked_add_signed(offset(duration_minutes)?)
        .ok_or_else(|| SeedError::Invalid("end time is out of range".to_owned()))?;

    Ok((starts_at, ends_at))
}

/// Create a campaign priced at `price_cents`.
///
/// # Errors
///
/// Returns `SeedError` if the arguments are invalid, the database URL is
/// missing or the insert fails.
pub async fn campaign(
    price_cents: i64,
    duration_minutes: i64,
    starts_in_minutes: i64,
) -> Result<(), SeedError> {
    if price_cents < 0 {
        return Err(SeedError::Invalid("price cannot be negative".to_owned()));
    }
    let (starts_at, ends_at) = campaign_window(Utc::now(), starts_in_minutes, duration_minutes)?;

    dotenvy::dotenv().ok();
    let database_url = get_database_url("SWAG_DATABASE_URL")?;
    let pool = create_pool(&database_url).await?;
    tracing::info!("Connected to database");

    let campaign = CampaignRepository::new(&pool)
        .create(starts_at, ends_at, Cents::new(price_cents))
        .await?;

    tracing::info!(
        campaign_id = %campaign.id,
        price = %campaign.price,
        starts_at = %campaign.starts_at,
        ends_at = %campaign.ends_at,
        "Campaign created"
    );
    Ok(())
}
