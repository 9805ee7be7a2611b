use crate::fx::MonetaryRecord;
use crate::model::CurrencyCode;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single recorded expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    pub id: String,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub category_id: String,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Reduces the expense to what the conversion engine needs. An expense without a currency is
    /// treated as being in `base_currency`.
    pub fn to_record(&self, base_currency: &CurrencyCode) -> MonetaryRecord {
        let currency = if self.currency.is_empty() {
            base_currency.clone()
        } else {
            self.currency.clone()
        };
        MonetaryRecord {
            amount: self.amount,
            currency,
            category_id: self.category_id.clone(),
            category_name: self.category_name.clone(),
            date: self.date,
        }
    }
}

/// The fields needed to create an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub category_id: String,
}

/// Field changes for an existing expense. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub currency: Option<CurrencyCode>,
    pub category_id: Option<String>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.currency.is_none()
            && self.category_id.is_none()
    }
}

/// Narrows which expenses are listed or totalled. Both date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub category_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expense(currency: &str) -> Expense {
        Expense {
            id: "e1".to_string(),
            amount: dec!(12.5),
            description: "Kettlebells".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            currency: CurrencyCode::new(currency),
            category_id: "c1".to_string(),
            category_name: "Equipment".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_to_record_keeps_currency() {
        let record = expense("usd").to_record(&CurrencyCode::new("UYU"));
        assert_eq!(record.currency.as_str(), "USD");
        assert_eq!(record.amount, dec!(12.5));
        assert_eq!(record.category_name, "Equipment");
    }

    #[test]
    fn test_to_record_defaults_to_base_currency() {
        let record = expense("").to_record(&CurrencyCode::new("UYU"));
        assert_eq!(record.currency.as_str(), "UYU");
    }

    #[test]
    fn test_update_is_empty() {
        assert!(ExpenseUpdate::default().is_empty());
        let update = ExpenseUpdate {
            description: Some("x".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
