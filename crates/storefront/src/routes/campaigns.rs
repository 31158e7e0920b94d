//! Campaign page route handler.

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::TimeDelta;
use tracing::instrument;

use swag_core::CampaignId;

use super::render;
use crate::db::RepositoryError;
use crate::error::AppError;
use crate::state::AppState;

/// Unit of a [`TimeLeft`] countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// Label rendered next to the value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Days => "day(s)",
            Self::Hours => "hour(s)",
            Self::Minutes => "minute(s)",
            Self::Seconds => "second(s)",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Remaining campaign time, expressed in the largest whole unit that fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    pub value: i64,
    pub unit: TimeUnit,
}

impl TimeLeft {
    /// Bucket `left` into days, hours, minutes or seconds, truncating.
    #[must_use]
    pub fn from_delta(left: TimeDelta) -> Self {
        if left >= TimeDelta::days(1) {
            Self {
                value: left.num_days(),
                unit: TimeUnit::Days,
            }
        } else if left >= TimeDelta::hours(1) {
            Self {
                value: left.num_hours(),
                unit: TimeUnit::Hours,
            }
        } else if left >= TimeDelta::minutes(1) {
            Self {
                value: left.num_minutes(),
                unit: TimeUnit::Minutes,
            }
        } else {
            Self {
                value: left.num_seconds(),
                unit: TimeUnit::Seconds,
            }
        }
    }
}

/// Active campaign page template.
#[derive(Template)]
#[template(path = "campaigns/show.html")]
pub struct ShowTemplate {
    pub id: CampaignId,
    /// Price in major currency units.
    pub price: i64,
    pub left: TimeLeft,
}

/// Page shown once no campaign is running.
#[derive(Template)]
#[template(path = "campaigns/ended.html")]
pub struct EndedTemplate;

/// Show the active campaign with its countdown, or the ended page.
#[instrument(skip(state))]
pub async fn show_active(State(state): State<AppState>) -> Response {
    let campaign = match state.storage().active_campaign().await {
        Ok(campaign) => campaign,
        Err(RepositoryError::NotFound) => return render(&EndedTemplate),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load the active campaign");
            return AppError::Database(e).into_response();
        }
    };

    let left = TimeLeft::from_delta(campaign.remaining_at(state.clock().now()));
    tracing::debug!(campaign_id = %campaign.id, ?left, "Showing active campaign");

    render(&ShowTemplate {
        id: campaign.id,
        price: campaign.price.major_units(),
        left,
    })
}
