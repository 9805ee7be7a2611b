use crate::model::CurrencyCode;
use crate::Result;
use anyhow::ensure;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored, directional exchange rate: `1 from_currency == rate to_currency` on `date`.
///
/// At most one rate exists per `(from_currency, to_currency, date)`. The inverse direction is
/// computed when needed and never stored, so `A->B` and `B->A` rates may drift from reciprocity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExchangeRate {
    from_currency: CurrencyCode,
    to_currency: CurrencyCode,
    rate: Decimal,
    date: NaiveDate,
}

impl ExchangeRate {
    /// Fails if `rate` is not strictly positive or if both currencies are the same.
    pub fn new(
        from_currency: impl Into<CurrencyCode>,
        to_currency: impl Into<CurrencyCode>,
        rate: Decimal,
        date: NaiveDate,
    ) -> Result<Self> {
        let from_currency = from_currency.into();
        let to_currency = to_currency.into();
        ensure!(
            rate > Decimal::ZERO,
            "Exchange rate for {from_currency} to {to_currency} must be greater than zero, got {rate}"
        );
        ensure!(
            from_currency != to_currency,
            "Cannot store an exchange rate from {from_currency} to itself"
        );
        ensure!(
            !from_currency.is_empty() && !to_currency.is_empty(),
            "Currency codes cannot be empty"
        );
        Ok(Self {
            from_currency,
            to_currency,
            rate,
            date,
        })
    }

    /// Builds a rate from trusted storage without validation.
    pub(crate) fn from_parts(
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        rate: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
            date,
        }
    }

    pub fn from_currency(&self) -> &CurrencyCode {
        &self.from_currency
    }

    pub fn to_currency(&self) -> &CurrencyCode {
        &self.to_currency
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}
