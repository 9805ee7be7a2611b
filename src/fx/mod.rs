//! The multi-currency conversion and aggregation engine.
//!
//! - `RateResolver` finds the multiplier that converts an amount from one currency to another
//!   using stored rates: identity, then the most recent direct rate, then the reciprocal of the
//!   most recent inverse rate.
//! - `Converter` applies resolved rates to amounts, batches and category groups. When no stored
//!   rate exists it degrades to the static `FallbackRates` table and finally to an identity rate,
//!   so that a missing rate never fails a report. Every degraded conversion is logged as a
//!   `conversion_degraded` event and reported back to the caller.

mod converter;
mod fallback;
#[cfg(test)]
pub(crate) mod memory;
mod resolver;

pub use converter::{
    AppliedRate, BatchConversion, CategoryReport, CategoryTotal, ConversionResult, Converter,
    Degradation,
};
pub use fallback::FallbackRates;
pub use resolver::{RateError, RateResolver, RateSource, ResolvedRate};

use crate::model::{CurrencyCode, ExchangeRate};
use crate::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The storage seam used by the resolver. Implemented by the SQLite datastore.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync {
    /// Returns the most recent stored rate, by date, for exactly `from -> to`, if any.
    async fn find_rate(&self, from: &CurrencyCode, to: &CurrencyCode)
        -> Result<Option<ExchangeRate>>;

    /// Inserts `rate`, or replaces the rate stored for the same `(from, to, date)`.
    async fn upsert_rate(&self, rate: &ExchangeRate) -> Result<ExchangeRate>;
}

/// An expense reduced to what the conversion engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonetaryRecord {
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub category_id: String,
    pub category_name: String,
    pub date: NaiveDate,
}
