//! Order domain types.

use swag_core::{CampaignId, OrderId, PaymentSource};

/// One buyer's purchase against a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Internal sequential ID. Never shown to buyers.
    pub id: OrderId,
    /// Campaign the order was placed against.
    pub campaign_id: CampaignId,
    pub customer: Customer,
    pub address: Address,
    pub payment: Payment,
}

impl Order {
    /// Whether a charge has already been created for this order.
    #[must_use]
    pub const fn is_charged(&self) -> bool {
        self.payment.charge_id.is_some()
    }

    /// Public path of the order page, keyed by the payment customer ID.
    #[must_use]
    pub fn path(&self) -> String {
        order_path(&self.payment.customer_id)
    }
}

/// Public path of the order page for a payment customer ID.
#[must_use]
pub fn order_path(payment_customer_id: &str) -> String {
    format!("/orders/{}", urlencoding::encode(payment_customer_id))
}

/// Buyer contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

/// Shipping address.
///
/// `raw` starts out derived from the structured fields but is edited
/// independently at confirmation; the structured fields are not re-synced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street1: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    /// Upper-cased address block printed on the shipping label.
    pub raw: String,
}

impl Address {
    /// Build the label block for `name` from the structured fields.
    ///
    /// An empty second street line leaves a blank line, which is collapsed.
    #[must_use]
    pub fn label(&self, name: &str) -> String {
        let block = format!(
            "{name}\n{}\n{}\n{} {}  {}\n{}",
            self.street1, self.street2, self.city, self.state, self.zip, self.country
        );
        block.replacen("\n\n", "\n", 1).to_uppercase()
    }
}

/// Payment processor references for an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payment {
    pub source: PaymentSource,
    /// Processor customer ID. Unique across orders and used as the public order key.
    pub customer_id: String,
    /// Processor charge ID, set once the buyer confirmed and was charged.
    pub charge_id: Option<String>,
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub campaign_id: CampaignId,
    pub customer: Customer,
    pub address: Address,
    pub payment: Payment,
}

impl NewOrder {
    /// Attach the ID assigned by storage.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            campaign_id: self.campaign_id,
            customer: self.customer,
            address: self.address,
            payment: self.payment,
        }
    }
}
