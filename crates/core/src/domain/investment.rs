use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored investment position as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub current_price: Option<Decimal>,
    pub purchase_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    pub fn holding(&self) -> Holding {
        Holding {
            id: self.id,
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            purchase_price: self.purchase_price,
            current_price: self.current_price,
        }
    }
}

/// The subset of an investment the price refresh and risk code care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub current_price: Option<Decimal>,
}

impl Holding {
    /// Fractional return `(current - purchase) / purchase`.
    ///
    /// `None` when the holding has not been priced yet or its purchase price is not positive.
    pub fn return_observation(&self) -> Option<f64> {
        let current = self.current_price?;
        if self.purchase_price <= Decimal::ZERO {
            return None;
        }
        let current = current.to_f64()?;
        let purchase = self.purchase_price.to_f64()?;
        Some((current - purchase) / purchase)
    }

    pub fn cost(&self) -> Decimal {
        self.purchase_price * self.quantity
    }

    pub fn market_value(&self) -> Option<Decimal> {
        self.current_price.map(|p| p * self.quantity)
    }
}

/// A new current price for one holding, produced by a refresh pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub investment_id: Uuid,
    pub symbol: String,
    pub price: Decimal,
}
