//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::{Category, CurrencyCode, ExchangeRate, Expense, NewExpense};
use crate::utils::parse_date;
use crate::Config;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

/// Test environment that sets up a home directory with Config and database.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with the default config (base currency UYU, built-in fallback
    /// rates) and an initialized database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("gym-expenses");
        let config = Config::create(&root, None).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub async fn insert_category(&self, name: &str) -> Category {
        self.config.db().insert_category(name, None).await.unwrap()
    }

    /// Inserts an expense directly into the database. `date` is `YYYY-MM-DD`.
    pub async fn insert_expense(
        &self,
        amount: &str,
        currency: &str,
        category_id: &str,
        date: &str,
    ) -> Expense {
        let expense = NewExpense {
            amount: Decimal::from_str(amount).unwrap(),
            description: String::new(),
            date: parse_date(date).unwrap(),
            currency: CurrencyCode::new(currency),
            category_id: category_id.to_string(),
        };
        self.config.db().insert_expense(&expense).await.unwrap()
    }

    /// Stores a rate. `date` is `YYYY-MM-DD`.
    pub async fn set_rate(&self, from: &str, to: &str, rate: Decimal, date: &str) {
        let rate = ExchangeRate::new(from, to, rate, parse_date(date).unwrap()).unwrap();
        self.config.db().upsert_rate(&rate).await.unwrap();
    }
}
