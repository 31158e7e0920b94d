//! Order repository for database operations.

use sqlx::PgPool;

use swag_core::{CampaignId, OrderId, PaymentSource};

use super::RepositoryError;
use crate::models::{Address, Customer, NewOrder, Order, Payment};

const ORDER_COLUMNS: &str = "id, campaign_id, cus_name, cus_email, \
     adr_street1, adr_street2, adr_city, adr_state, adr_zip, adr_country, adr_raw, \
     pay_source, pay_customer_id, pay_charge_id";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    campaign_id: i32,
    cus_name: String,
    cus_email: String,
    adr_street1: String,
    adr_street2: String,
    adr_city: String,
    adr_state: String,
    adr_zip: String,
    adr_country: String,
    adr_raw: String,
    pay_source: String,
    pay_customer_id: String,
    pay_charge_id: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let source = row.pay_source.parse::<PaymentSource>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            campaign_id: CampaignId::new(row.campaign_id),
            customer: Customer {
                name: row.cus_name,
                email: row.cus_email,
            },
            address: Address {
                street1: row.adr_street1,
                street2: row.adr_street2,
                city: row.adr_city,
                state: row.adr_state,
                zip: row.adr_zip,
                country: row.adr_country,
                raw: row.adr_raw,
            },
            payment: Payment {
                source,
                customer_id: row.pay_customer_id,
                charge_id: row.pay_charge_id.filter(|id| !id.is_empty()),
            },
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and return it with the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the payment customer ID is already used.
    /// Returns `RepositoryError::Database` for other database errors, including
    /// a campaign ID that does not reference an existing campaign.
    pub async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO orders (
                campaign_id, cus_name, cus_email,
                adr_street1, adr_street2, adr_city, adr_state, adr_zip, adr_country, adr_raw,
                pay_source, pay_customer_id, pay_charge_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            ",
        )
        .bind(order.campaign_id)
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.address.street1)
        .bind(&order.address.street2)
        .bind(&order.address.city)
        .bind(&order.address.state)
        .bind(&order.address.zip)
        .bind(&order.address.country)
        .bind(&order.address.raw)
        .bind(order.payment.source.as_str())
        .bind(&order.payment.customer_id)
        .bind(order.payment.charge_id.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("payment customer id already used".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(order.into_order(OrderId::new(id)))
    }

    /// Get the order placed with the given payment customer ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order uses that ID.
    /// Returns `RepositoryError::DataCorruption` if the stored payment source is unknown.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_customer_id(
        &self,
        payment_customer_id: &str,
    ) -> Result<Order, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE pay_customer_id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(payment_customer_id)
            .fetch_optional(self.pool)
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Store the charge ID and the confirmed shipping label.
    ///
    /// Re-confirming with the charge ID already on record is accepted, so a
    /// replayed confirmation that the processor de-duplicated still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if a different charge is already recorded.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn confirm(
        &self,
        id: OrderId,
        address_raw: &str,
        charge_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET adr_raw = $2, pay_charge_id = $3
            WHERE id = $1 AND (pay_charge_id IS NULL OR pay_charge_id = $3)
            ",
        )
        .bind(id)
        .bind(address_raw)
        .bind(charge_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        if exists {
            Err(RepositoryError::Conflict(format!(
                "order {id} already has a different charge"
            )))
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}
