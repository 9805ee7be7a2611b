//! In-memory `RateStore` implementations for tests.

use crate::fx::RateStore;
use crate::model::{CurrencyCode, ExchangeRate};
use crate::Result;
use anyhow::bail;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Holds rates in a `Vec` and counts how many lookups were made.
#[derive(Debug, Default)]
pub(crate) struct MemoryRates {
    rates: Mutex<Vec<ExchangeRate>>,
    lookups: AtomicUsize,
}

impl MemoryRates {
    /// Rates are stored as given, without validation, so that tests can seed invariant
    /// violations such as a zero rate.
    pub(crate) fn with_rates(rates: &[(&str, &str, Decimal, NaiveDate)]) -> Self {
        let rates = rates
            .iter()
            .map(|(from, to, rate, date)| {
                ExchangeRate::from_parts((*from).into(), (*to).into(), *rate, *date)
            })
            .collect();
        Self {
            rates: Mutex::new(rates),
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RateStore for MemoryRates {
    async fn find_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<ExchangeRate>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let rates = self.rates.lock().unwrap();
        Ok(rates
            .iter()
            .filter(|r| r.from_currency() == from && r.to_currency() == to)
            .max_by_key(|r| r.date())
            .cloned())
    }

    async fn upsert_rate(&self, rate: &ExchangeRate) -> Result<ExchangeRate> {
        let mut rates = self.rates.lock().unwrap();
        rates.retain(|r| {
            !(r.from_currency() == rate.from_currency()
                && r.to_currency() == rate.to_currency()
                && r.date() == rate.date())
        });
        rates.push(rate.clone());
        Ok(rate.clone())
    }
}

/// Fails every operation, like a datastore whose connection has gone away.
#[derive(Debug, Default)]
pub(crate) struct FailingRates;

#[async_trait::async_trait]
impl RateStore for FailingRates {
    async fn find_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<ExchangeRate>> {
        bail!("connection refused while reading {from}->{to}")
    }

    async fn upsert_rate(&self, _rate: &ExchangeRate) -> Result<ExchangeRate> {
        bail!("connection refused")
    }
}

#[tokio::test]
async fn test_memory_rates_upsert_replaces_same_day() {
    use rust_decimal_macros::dec;
    let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let store = MemoryRates::default();
    let usd = CurrencyCode::new("USD");
    let uyu = CurrencyCode::new("UYU");
    store
        .upsert_rate(&ExchangeRate::new("USD", "UYU", dec!(40), day).unwrap())
        .await
        .unwrap();
    store
        .upsert_rate(&ExchangeRate::new("USD", "UYU", dec!(41), day).unwrap())
        .await
        .unwrap();
    let found = store.find_rate(&usd, &uyu).await.unwrap().unwrap();
    assert_eq!(found.rate(), dec!(41));
    assert_eq!(store.lookups(), 1);
}
