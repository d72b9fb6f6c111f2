//! Request payloads accepted by the API, with their validation rules.
//!
//! Every payload exposes `validate(self) -> anyhow::Result<Self>`, returning a normalized copy
//! (trimmed strings, upper-cased tickers) or the first rule it violates.

use anyhow::ensure;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const INCOME_FREQUENCIES: [&str; 3] = ["monthly", "weekly", "one-time"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub budget: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub budget: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    pub name: String,
    pub amount: Decimal,
    pub frequency: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomePatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub frequency: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestment {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPatch {
    pub symbol: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub quantity: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavingsGoal {
    pub title: String,
    pub target_amount: Decimal,
    pub target_date: NaiveDate,
    pub category: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalPatch {
    pub title: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSavings {
    pub amount: Decimal,
}

impl NewCategory {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            name: non_empty("name", self.name)?,
            color: hex_color(self.color)?,
            budget: non_negative("budget", self.budget)?,
        })
    }
}

impl CategoryPatch {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            name: self.name.map(|v| non_empty("name", v)).transpose()?,
            color: self.color.map(hex_color).transpose()?,
            budget: self.budget.map(|v| non_negative("budget", v)).transpose()?,
        })
    }
}

impl NewIncome {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            name: non_empty("name", self.name)?,
            amount: positive("amount", self.amount)?,
            frequency: frequency(self.frequency)?,
            date: self.date,
        })
    }
}

impl IncomePatch {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            name: self.name.map(|v| non_empty("name", v)).transpose()?,
            amount: self.amount.map(|v| positive("amount", v)).transpose()?,
            frequency: self.frequency.map(frequency).transpose()?,
            date: self.date,
        })
    }
}

impl NewExpense {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            description: non_empty("description", self.description)?,
            amount: positive("amount", self.amount)?,
            category_id: self.category_id,
            date: self.date,
        })
    }
}

impl ExpensePatch {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            description: self
                .description
                .map(|v| non_empty("description", v))
                .transpose()?,
            amount: self.amount.map(|v| positive("amount", v)).transpose()?,
            category_id: self.category_id,
            date: self.date,
        })
    }
}

impl NewInvestment {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            symbol: ticker(self.symbol)?,
            name: non_empty("name", self.name)?,
            kind: non_empty("type", self.kind)?,
            quantity: non_negative("quantity", self.quantity)?,
            purchase_price: positive("purchasePrice", self.purchase_price)?,
            purchase_date: self.purchase_date,
        })
    }
}

impl InvestmentPatch {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            symbol: self.symbol.map(ticker).transpose()?,
            name: self.name.map(|v| non_empty("name", v)).transpose()?,
            kind: self.kind.map(|v| non_empty("type", v)).transpose()?,
            quantity: self
                .quantity
                .map(|v| non_negative("quantity", v))
                .transpose()?,
            purchase_price: self
                .purchase_price
                .map(|v| positive("purchasePrice", v))
                .transpose()?,
            purchase_date: self.purchase_date,
        })
    }
}

impl NewSavingsGoal {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            title: non_empty("title", self.title)?,
            target_amount: positive("targetAmount", self.target_amount)?,
            target_date: self.target_date,
            category: non_empty("category", self.category)?,
            color: hex_color(self.color)?,
        })
    }
}

impl SavingsGoalPatch {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            title: self.title.map(|v| non_empty("title", v)).transpose()?,
            target_amount: self
                .target_amount
                .map(|v| positive("targetAmount", v))
                .transpose()?,
            current_amount: self
                .current_amount
                .map(|v| non_negative("currentAmount", v))
                .transpose()?,
            target_date: self.target_date,
            category: self.category.map(|v| non_empty("category", v)).transpose()?,
            color: self.color.map(hex_color).transpose()?,
            is_completed: self.is_completed,
        })
    }
}

impl AddSavings {
    pub fn validate(self) -> anyhow::Result<Self> {
        Ok(Self {
            amount: positive("amount", self.amount)?,
        })
    }
}

fn non_empty(field: &str, value: String) -> anyhow::Result<String> {
    let value = value.trim().to_string();
    ensure!(!value.is_empty(), "{field} must be non-empty");
    Ok(value)
}

fn positive(field: &str, value: Decimal) -> anyhow::Result<Decimal> {
    ensure!(value > Decimal::ZERO, "{field} must be greater than 0 (got {value})");
    Ok(value)
}

fn non_negative(field: &str, value: Decimal) -> anyhow::Result<Decimal> {
    ensure!(value >= Decimal::ZERO, "{field} must be >= 0 (got {value})");
    Ok(value)
}

fn hex_color(value: String) -> anyhow::Result<String> {
    let value = value.trim().to_string();
    let digits = value.strip_prefix('#').unwrap_or_default();
    ensure!(
        digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        "color must be a #RRGGBB hex code (got {value:?})"
    );
    Ok(value)
}

fn frequency(value: String) -> anyhow::Result<String> {
    let value = value.trim().to_ascii_lowercase();
    ensure!(
        INCOME_FREQUENCIES.contains(&value.as_str()),
        "frequency must be one of {INCOME_FREQUENCIES:?} (got {value:?})"
    );
    Ok(value)
}

// Exchange suffixes (`7203.T`), share classes (`BRK-B`), indices (`^GSPC`) and FX pairs
// (`EURUSD=X`) are the only punctuation tickers carry.
pub fn ticker(value: String) -> anyhow::Result<String> {
    let value = non_empty("symbol", value)?.to_ascii_uppercase();
    ensure!(
        value.len() <= 20
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
        "symbol must be at most 20 letters, digits or . - ^ = (got {value:?})"
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn category_is_trimmed_and_checked() {
        let cat = NewCategory {
            name: "  Food ".to_string(),
            color: "#A1b2C3".to_string(),
            budget: dec!(0),
        }
        .validate()
        .unwrap();
        assert_eq!(cat.name, "Food");

        let bad_color = NewCategory {
            name: "Food".to_string(),
            color: "red".to_string(),
            budget: dec!(10),
        };
        assert!(bad_color.validate().is_err());

        let empty_name = NewCategory {
            name: "   ".to_string(),
            color: "#000000".to_string(),
            budget: dec!(10),
        };
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let expense = NewExpense {
            description: "Coffee".to_string(),
            amount: dec!(0),
            category_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert!(expense.validate().is_err());
        assert!(AddSavings { amount: dec!(-5) }.validate().is_err());
        assert!(AddSavings { amount: dec!(5) }.validate().is_ok());
    }

    #[test]
    fn investment_symbol_is_uppercased_and_price_must_be_positive() {
        let inv: NewInvestment = serde_json::from_value(json!({
            "symbol": " msft ",
            "name": "Microsoft",
            "type": "stock",
            "quantity": 3,
            "purchasePrice": 250.5,
            "purchaseDate": "2025-06-01",
        }))
        .unwrap();
        let inv = inv.validate().unwrap();
        assert_eq!(inv.symbol, "MSFT");
        assert_eq!(inv.purchase_price, dec!(250.5));

        let mut zero = inv.clone();
        zero.purchase_price = dec!(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn symbols_reject_url_punctuation() {
        for ok in ["brk-b", "^GSPC", "EURUSD=X", "7203.t"] {
            assert!(ticker(ok.to_string()).is_ok(), "{ok} rejected");
        }
        for bad in ["AAPL/../x", "A?B", "A#B", "A B", "A%2F", "ABCDEFGHIJKLMNOPQRSTU"] {
            assert!(ticker(bad.to_string()).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn income_frequency_must_be_known() {
        let income = NewIncome {
            name: "Salary".to_string(),
            amount: dec!(1000),
            frequency: "Monthly".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        };
        assert_eq!(income.clone().validate().unwrap().frequency, "monthly");

        let mut yearly = income;
        yearly.frequency = "yearly".to_string();
        assert!(yearly.validate().is_err());
    }

    #[test]
    fn patch_only_checks_present_fields() {
        let patch: CategoryPatch = serde_json::from_value(json!({"budget": 120})).unwrap();
        let patch = patch.validate().unwrap();
        assert_eq!(patch.budget, Some(dec!(120)));
        assert!(patch.name.is_none());

        let bad: SavingsGoalPatch = serde_json::from_value(json!({"color": "#12345"})).unwrap();
        assert!(bad.validate().is_err());
    }
}
