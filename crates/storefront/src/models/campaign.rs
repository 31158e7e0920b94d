//! Campaign domain type.

use chrono::{DateTime, TimeDelta, Utc};

use swag_core::{CampaignId, Cents};

/// A time-boxed fundraising offer at a fixed unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    /// Unique campaign ID.
    pub id: CampaignId,
    /// Price of one unit, in minor currency units.
    pub price: Cents,
    /// First instant at which the campaign is active.
    pub starts_at: DateTime<Utc>,
    /// First instant at which the campaign is no longer active.
    pub ends_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether `now` falls within `[starts_at, ends_at)`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// Time remaining until the campaign ends. Negative once it has ended.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        self.ends_at - now
    }
}
