//! Application state shared across handlers.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::StorefrontConfig;
use crate::db::Storage;
use crate::payments::PaymentProcessor;

/// Site-wide values rendered into pages and error messages.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Publishable key handed to the browser-side tokenizer.
    pub stripe_public_key: String,
    /// Address buyers are told to contact when something fails.
    pub support_email: String,
}

impl From<&StorefrontConfig> for SiteSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            stripe_public_key: config.stripe.public_key.clone(),
            support_email: config.support_email.clone(),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// storage, the payment processor and the clock.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storage: Arc<dyn Storage>,
    payments: Arc<dyn PaymentProcessor>,
    clock: Arc<dyn Clock>,
    settings: SiteSettings,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `storage` - Campaign and order persistence
    /// * `payments` - Payment processor client
    /// * `clock` - Time source for countdowns
    /// * `settings` - Values rendered into pages
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        payments: Arc<dyn PaymentProcessor>,
        clock: Arc<dyn Clock>,
        settings: SiteSettings,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                storage,
                payments,
                clock,
                settings,
            }),
        }
    }

    /// Get a reference to campaign and order storage.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }

    /// Get a reference to the payment processor.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProcessor {
        self.inner.payments.as_ref()
    }

    /// Get a reference to the clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Get a reference to the site settings.
    #[must_use]
    pub fn settings(&self) -> &SiteSettings {
        &self.inner.settings
    }
}
