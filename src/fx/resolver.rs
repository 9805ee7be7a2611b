use crate::fx::RateStore;
use crate::model::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Where the rate applied to a conversion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Source and target currencies are the same, the rate is exactly 1.
    Same,
    /// The most recent stored rate for `from -> to`.
    Direct,
    /// The reciprocal of the most recent stored rate for `to -> from`.
    Inverse,
    /// An approximate rate from the static fallback table.
    Fallback,
    /// No rate could be found at all, the amount is passed through unchanged.
    Identity,
}

serde_plain::derive_display_from_serialize!(RateSource);
serde_plain::derive_fromstr_from_deserialize!(RateSource);

impl RateSource {
    /// True when the rate is not backed by stored data.
    pub fn is_degraded(&self) -> bool {
        matches!(self, RateSource::Fallback | RateSource::Identity)
    }
}

/// A rate found by the `RateResolver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResolvedRate {
    pub rate: Decimal,
    pub source: RateSource,
}

/// Errors raised while resolving a rate. Only `RateResolver` produces these; the `Converter`
/// absorbs all of them.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("No exchange rate found for {from} to {to}")]
    NotFound { from: CurrencyCode, to: CurrencyCode },

    #[error("The stored exchange rate for {from} to {to} is zero and cannot be inverted")]
    ZeroRate { from: CurrencyCode, to: CurrencyCode },

    #[error("Unable to read exchange rates for {from} to {to}")]
    Storage {
        from: CurrencyCode,
        to: CurrencyCode,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Resolves the multiplier that converts an amount in one currency into another, such that
/// `amount_in_to = amount_in_from * rate`.
#[derive(Clone)]
pub struct RateResolver {
    store: Arc<dyn RateStore>,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    /// Returns only the rate. See `resolve`.
    pub async fn resolve_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, RateError> {
        self.resolve(from, to).await.map(|resolved| resolved.rate)
    }

    /// Tries, in order:
    /// - identity, without touching storage, when `from == to`
    /// - the most recent stored `from -> to` rate
    /// - `1 / rate` of the most recent stored `to -> from` rate
    ///
    /// # Errors
    /// - `RateError::NotFound` when neither direction is stored
    /// - `RateError::ZeroRate` when the inverse rate is stored as zero
    /// - `RateError::Storage` when the store cannot be read
    pub async fn resolve(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ResolvedRate, RateError> {
        if from == to {
            return Ok(ResolvedRate {
                rate: Decimal::ONE,
                source: RateSource::Same,
            });
        }

        if let Some(direct) = self.find(from, to).await? {
            trace!("Direct rate {from}->{to} from {}: {}", direct.date(), direct.rate());
            return Ok(ResolvedRate {
                rate: direct.rate(),
                source: RateSource::Direct,
            });
        }

        if let Some(inverse) = self.find(to, from).await? {
            trace!("Inverse rate {to}->{from} from {}: {}", inverse.date(), inverse.rate());
            let rate = Decimal::ONE
                .checked_div(inverse.rate())
                .ok_or_else(|| RateError::ZeroRate {
                    from: to.clone(),
                    to: from.clone(),
                })?;
            return Ok(ResolvedRate {
                rate,
                source: RateSource::Inverse,
            });
        }

        Err(RateError::NotFound {
            from: from.clone(),
            to: to.clone(),
        })
    }

    async fn find(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<crate::model::ExchangeRate>, RateError> {
        self.store
            .find_rate(from, to)
            .await
            .map_err(|e| RateError::Storage {
                from: from.clone(),
                to: to.clone(),
                source: e.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::memory::{FailingRates, MemoryRates};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_same_currency_is_one_without_lookup() {
        let store = Arc::new(MemoryRates::default());
        let resolver = RateResolver::new(store.clone());
        for c in ["USD", "UYU", "XYZ"] {
            let resolved = resolver.resolve(&code(c), &code(c)).await.unwrap();
            assert_eq!(resolved.rate, Decimal::ONE);
            assert_eq!(resolved.source, RateSource::Same);
        }
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_direct_rate() {
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", dec!(42.5), day(1))]));
        let resolver = RateResolver::new(store);
        let rate = resolver.resolve_rate(&code("USD"), &code("UYU")).await.unwrap();
        assert_eq!(rate, dec!(42.5));
    }

    #[tokio::test]
    async fn test_inverse_rate() {
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", dec!(42.5), day(1))]));
        let resolver = RateResolver::new(store);
        let resolved = resolver.resolve(&code("UYU"), &code("USD")).await.unwrap();
        assert_eq!(resolved.source, RateSource::Inverse);
        assert_eq!(resolved.rate.round_dp(6), dec!(0.023529));
        assert_eq!(resolved.rate, Decimal::ONE / dec!(42.5));
    }

    #[tokio::test]
    async fn test_direct_wins_over_inverse_even_if_not_reciprocal() {
        let store = Arc::new(MemoryRates::with_rates(&[
            ("USD", "UYU", dec!(42.5), day(1)),
            ("UYU", "USD", dec!(0.03), day(1)),
        ]));
        let resolver = RateResolver::new(store);
        let usd_uyu = resolver.resolve(&code("USD"), &code("UYU")).await.unwrap();
        let uyu_usd = resolver.resolve(&code("UYU"), &code("USD")).await.unwrap();
        assert_eq!(usd_uyu.rate, dec!(42.5));
        assert_eq!(usd_uyu.source, RateSource::Direct);
        assert_eq!(uyu_usd.rate, dec!(0.03));
        assert_eq!(uyu_usd.source, RateSource::Direct);
    }

    #[tokio::test]
    async fn test_most_recent_rate_wins() {
        let store = Arc::new(MemoryRates::with_rates(&[
            ("USD", "UYU", dec!(40), day(1)),
            ("USD", "UYU", dec!(43), day(20)),
            ("USD", "UYU", dec!(41), day(10)),
        ]));
        let resolver = RateResolver::new(store);
        let rate = resolver.resolve_rate(&code("USD"), &code("UYU")).await.unwrap();
        assert_eq!(rate, dec!(43));
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", dec!(42.5), day(1))]));
        let resolver = RateResolver::new(store);
        let e = resolver
            .resolve_rate(&code("USD"), &code("XYZ"))
            .await
            .unwrap_err();
        assert!(matches!(e, RateError::NotFound { .. }));
        assert_eq!(e.to_string(), "No exchange rate found for USD to XYZ");
    }

    #[tokio::test]
    async fn test_zero_inverse_rate() {
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", Decimal::ZERO, day(1))]));
        let resolver = RateResolver::new(store);
        let e = resolver
            .resolve_rate(&code("UYU"), &code("USD"))
            .await
            .unwrap_err();
        assert!(matches!(e, RateError::ZeroRate { .. }));
    }

    #[tokio::test]
    async fn test_storage_error() {
        let resolver = RateResolver::new(Arc::new(FailingRates));
        let e = resolver
            .resolve_rate(&code("USD"), &code("UYU"))
            .await
            .unwrap_err();
        assert!(matches!(e, RateError::Storage { .. }));
        // Same-currency requests never reach storage.
        let rate = resolver
            .resolve_rate(&code("USD"), &code("USD"))
            .await
            .unwrap();
        assert_eq!(rate, Decimal::ONE);
    }
}
