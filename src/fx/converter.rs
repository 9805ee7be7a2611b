use crate::fx::{FallbackRates, MonetaryRecord, RateError, RateResolver, RateSource, RateStore};
use crate::model::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The rate that was actually applied to a conversion, after the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppliedRate {
    pub rate: Decimal,
    pub source: RateSource,
}

/// The outcome of converting a single amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversionResult {
    pub original_amount: Decimal,
    pub original_currency: CurrencyCode,
    pub converted_amount: Decimal,
    pub target_currency: CurrencyCode,
    pub rate: Decimal,
    pub source: RateSource,
}

/// A currency pair whose conversion did not use a stored rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Degradation {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub source: RateSource,
    pub rate: Decimal,
    pub reason: String,
}

/// Every record of a batch converted, plus their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConversion {
    pub results: Vec<ConversionResult>,
    pub total: Decimal,
    pub target_currency: CurrencyCode,
    pub degraded: Vec<Degradation>,
}

/// The converted total of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryTotal {
    pub category_id: String,
    pub category_name: String,
    pub total: Decimal,
}

/// Grand total and per-category totals in a single target currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryReport {
    pub total: Decimal,
    /// In the order each category was first seen in the input.
    pub by_category: Vec<CategoryTotal>,
    pub target_currency: CurrencyCode,
    pub degraded: Vec<Degradation>,
}

/// Converts amounts between currencies and aggregates them.
///
/// Conversion never fails. When the resolver cannot produce a rate, whether because none is
/// stored, the store is unreadable or a stored rate is zero, the converter uses the fallback
/// table and then an identity rate. A multiplication that overflows is also converted 1:1. Each
/// degradation is logged with a `conversion_degraded` event so that data problems, e.g. a
/// mistyped currency code silently converted 1:1, stay visible even though the request succeeds.
#[derive(Clone)]
pub struct Converter {
    resolver: RateResolver,
    fallback: FallbackRates,
}

impl Converter {
    pub fn new(store: Arc<dyn RateStore>, fallback: FallbackRates) -> Self {
        Self {
            resolver: RateResolver::new(store),
            fallback,
        }
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    pub fn fallback(&self) -> &FallbackRates {
        &self.fallback
    }

    /// Converts `amount` from `from` into `to`. Never fails.
    pub async fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Decimal {
        self.convert_detailed(amount, from, to)
            .await
            .converted_amount
    }

    /// Like `convert`, but also reports which rate was applied and where it came from.
    pub async fn convert_detailed(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> ConversionResult {
        let (applied, _) = self.applied_rate(from, to).await;
        apply(amount, from, to, applied).0
    }

    /// Converts each record independently into `target` and returns the sum. A record whose rate
    /// cannot be found is counted at an identity rate; the batch is never aborted.
    pub async fn convert_batch(&self, records: &[MonetaryRecord], target: &CurrencyCode) -> Decimal {
        self.convert_records(records, target).await.total
    }

    /// Converts each record into `target`, resolving each distinct currency pair once.
    pub async fn convert_records(
        &self,
        records: &[MonetaryRecord],
        target: &CurrencyCode,
    ) -> BatchConversion {
        let mut cache = RateCache::default();
        let mut results = Vec::with_capacity(records.len());
        let mut total = Decimal::ZERO;
        for record in records {
            let result = self.convert_cached(&mut cache, record, target).await;
            total = add_to_total(total, result.converted_amount, target);
            results.push(result);
        }
        BatchConversion {
            results,
            total,
            target_currency: target.clone(),
            degraded: cache.into_degraded(),
        }
    }

    /// Converts every record into `target` and sums them per category and overall.
    ///
    /// Categories are grouped by `category_id` in first-seen order. Each group total is
    /// recomputed from that group's records using the rates memoized for this call, so a pair is
    /// converted at the same rate in every group and in the grand total. The grand total is the
    /// sum of the group totals.
    pub async fn aggregate_by_category(
        &self,
        records: &[MonetaryRecord],
        target: &CurrencyCode,
    ) -> CategoryReport {
        let mut cache = RateCache::default();

        // Resolve every pair up front.
        for record in records {
            self.convert_cached(&mut cache, record, target).await;
        }

        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&MonetaryRecord>> = HashMap::new();
        for record in records {
            let id = record.category_id.as_str();
            groups
                .entry(id)
                .or_insert_with(|| {
                    order.push(id);
                    Vec::new()
                })
                .push(record);
        }

        let mut by_category = Vec::with_capacity(order.len());
        let mut total = Decimal::ZERO;
        for id in order {
            let members = groups.remove(id).unwrap_or_default();
            let category_name = members
                .first()
                .map(|r| r.category_name.clone())
                .unwrap_or_default();
            let mut group_total = Decimal::ZERO;
            for record in members {
                let result = self.convert_cached(&mut cache, record, target).await;
                group_total = add_to_total(group_total, result.converted_amount, target);
            }
            total = add_to_total(total, group_total, target);
            by_category.push(CategoryTotal {
                category_id: id.to_string(),
                category_name,
                total: group_total,
            });
        }

        debug!(
            "Aggregated {} records into {} categories, total {total} {target}",
            records.len(),
            by_category.len()
        );

        CategoryReport {
            total,
            by_category,
            target_currency: target.clone(),
            degraded: cache.into_degraded(),
        }
    }

    async fn convert_cached(
        &self,
        cache: &mut RateCache,
        record: &MonetaryRecord,
        target: &CurrencyCode,
    ) -> ConversionResult {
        let key = (record.currency.clone(), target.clone());
        let applied = match cache.rates.get(&key) {
            Some(applied) => *applied,
            None => {
                let (applied, degradation) = self.applied_rate(&record.currency, target).await;
                if let Some(degradation) = degradation {
                    cache.degraded.push(degradation);
                }
                cache.rates.insert(key.clone(), applied);
                applied
            }
        };
        let (result, overflow) = apply(record.amount, &record.currency, target, applied);
        if let Some(degradation) = overflow {
            // Reported once per pair, like resolution failures.
            if cache.overflowed.insert(key) {
                cache.degraded.push(degradation);
            }
        }
        result
    }

    /// Resolves a rate and applies the fallback policy.
    async fn applied_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> (AppliedRate, Option<Degradation>) {
        let error = match self.resolver.resolve(from, to).await {
            Ok(resolved) => {
                let applied = AppliedRate {
                    rate: resolved.rate,
                    source: resolved.source,
                };
                return (applied, None);
            }
            Err(e) => e,
        };

        let fallback = self.fallback.get(from, to);
        match &error {
            RateError::NotFound { .. } => match fallback {
                Some(rate) => warn!(
                    event = "conversion_degraded",
                    %from,
                    %to,
                    %rate,
                    source = %RateSource::Fallback,
                    "No exchange rate stored for {from} to {to}, using fallback rate {rate}"
                ),
                None => warn!(
                    event = "conversion_degraded",
                    %from,
                    %to,
                    source = %RateSource::Identity,
                    "No exchange rate or fallback for {from} to {to}, using a 1:1 rate"
                ),
            },
            RateError::ZeroRate { .. } | RateError::Storage { .. } => match fallback {
                Some(rate) => error!(
                    event = "conversion_degraded",
                    %from,
                    %to,
                    %rate,
                    source = %RateSource::Fallback,
                    "Error converting {from} to {to}, using fallback rate {rate}: {}",
                    error_chain(&error)
                ),
                None => error!(
                    event = "conversion_degraded",
                    %from,
                    %to,
                    source = %RateSource::Identity,
                    "Error converting {from} to {to}, using a 1:1 rate: {}",
                    error_chain(&error)
                ),
            },
        }
        let applied = match fallback {
            Some(rate) => AppliedRate {
                rate,
                source: RateSource::Fallback,
            },
            None => identity(),
        };

        let degradation = Degradation {
            from: from.clone(),
            to: to.clone(),
            source: applied.source,
            rate: applied.rate,
            reason: error.to_string(),
        };
        (applied, Some(degradation))
    }
}

/// Resolved rates for a single conversion call, keyed by `(from, to)`.
#[derive(Default)]
struct RateCache {
    rates: HashMap<(CurrencyCode, CurrencyCode), AppliedRate>,
    overflowed: HashSet<(CurrencyCode, CurrencyCode)>,
    degraded: Vec<Degradation>,
}

impl RateCache {
    fn into_degraded(self) -> Vec<Degradation> {
        self.degraded
    }
}

fn identity() -> AppliedRate {
    AppliedRate {
        rate: Decimal::ONE,
        source: RateSource::Identity,
    }
}

/// Multiplies `amount` by the applied rate. On overflow the amount is kept 1:1 and the returned
/// degradation says so.
fn apply(
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
    applied: AppliedRate,
) -> (ConversionResult, Option<Degradation>) {
    let (converted_amount, used, overflow) = if applied.source == RateSource::Same {
        (amount, applied, None)
    } else {
        match amount.checked_mul(applied.rate) {
            Some(converted) => (converted, applied, None),
            None => {
                error!(
                    event = "conversion_degraded",
                    %from,
                    %to,
                    source = %RateSource::Identity,
                    "Converting {amount} {from} to {to} at {} overflows, using a 1:1 rate",
                    applied.rate
                );
                let used = identity();
                let degradation = Degradation {
                    from: from.clone(),
                    to: to.clone(),
                    source: used.source,
                    rate: used.rate,
                    reason: format!(
                        "Converting {amount} {from} to {to} at {} overflowed",
                        applied.rate
                    ),
                };
                (amount, used, Some(degradation))
            }
        }
    };
    let result = ConversionResult {
        original_amount: amount,
        original_currency: from.clone(),
        converted_amount,
        target_currency: to.clone(),
        rate: used.rate,
        source: used.source,
    };
    (result, overflow)
}

/// Adds `amount` to a running total, capping at the `Decimal` bounds when the sum overflows.
fn add_to_total(total: Decimal, amount: Decimal, target: &CurrencyCode) -> Decimal {
    match total.checked_add(amount) {
        Some(sum) => sum,
        None => {
            error!(
                event = "conversion_degraded",
                %target,
                "Adding {amount} {target} to a total of {total} {target} overflows, capping the total"
            );
            total.saturating_add(amount)
        }
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
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

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn record(amount: Decimal, currency: &str, category: &str) -> MonetaryRecord {
        MonetaryRecord {
            amount,
            currency: code(currency),
            category_id: category.to_string(),
            category_name: format!("Category {category}"),
            date: day(),
        }
    }

    fn converter(rates: &[(&str, &str, Decimal)]) -> (Arc<MemoryRates>, Converter) {
        let rates: Vec<_> = rates.iter().map(|(f, t, r)| (*f, *t, *r, day())).collect();
        let store = Arc::new(MemoryRates::with_rates(&rates));
        let converter = Converter::new(store.clone(), FallbackRates::default());
        (store, converter)
    }

    #[tokio::test]
    async fn test_convert_direct() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let converted = converter.convert(dec!(100), &code("USD"), &code("UYU")).await;
        assert_eq!(converted, dec!(4250));
    }

    #[tokio::test]
    async fn test_convert_inverse() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let result = converter
            .convert_detailed(dec!(4250), &code("UYU"), &code("USD"))
            .await;
        assert_eq!(result.source, RateSource::Inverse);
        assert_eq!(result.converted_amount.round_dp(6), dec!(100));
    }

    #[tokio::test]
    async fn test_convert_same_currency_is_exact() {
        let (store, converter) = converter(&[]);
        let amount = dec!(0.1234567890123456789);
        let result = converter
            .convert_detailed(amount, &code("UYU"), &code("UYU"))
            .await;
        assert_eq!(result.converted_amount, amount);
        assert_eq!(result.converted_amount.scale(), amount.scale());
        assert_eq!(result.source, RateSource::Same);
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_convert_unknown_currency_is_identity() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let result = converter
            .convert_detailed(dec!(50), &code("USD"), &code("XYZ"))
            .await;
        assert_eq!(result.converted_amount, dec!(50));
        assert_eq!(result.source, RateSource::Identity);
        assert!(result.source.is_degraded());
    }

    #[tokio::test]
    async fn test_convert_uses_fallback_when_nothing_stored() {
        let (_, converter) = converter(&[]);
        let result = converter
            .convert_detailed(dec!(10), &code("USD"), &code("MXN"))
            .await;
        assert_eq!(result.converted_amount, dec!(175));
        assert_eq!(result.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_stored_inverse_beats_fallback() {
        // EUR->USD is in the fallback table at 1.08, but USD->EUR is stored.
        let (_, converter) = converter(&[("USD", "EUR", dec!(0.8))]);
        let result = converter
            .convert_detailed(dec!(8), &code("EUR"), &code("USD"))
            .await;
        assert_eq!(result.source, RateSource::Inverse);
        assert_eq!(result.converted_amount, dec!(10));
    }

    #[tokio::test]
    async fn test_convert_storage_failure_uses_fallback() {
        let converter = Converter::new(Arc::new(FailingRates), FallbackRates::default());
        let result = converter
            .convert_detailed(dec!(100), &code("USD"), &code("UYU"))
            .await;
        assert_eq!(result.converted_amount, dec!(4250));
        assert_eq!(result.rate, dec!(42.5));
        assert_eq!(result.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_convert_storage_failure_without_fallback_is_identity() {
        let converter = Converter::new(Arc::new(FailingRates), FallbackRates::default());
        let result = converter
            .convert_detailed(dec!(100), &code("USD"), &code("XYZ"))
            .await;
        assert_eq!(result.converted_amount, dec!(100));
        assert_eq!(result.source, RateSource::Identity);
    }

    #[tokio::test]
    async fn test_convert_zero_rate_uses_fallback() {
        // The stored USD->UYU rate is zero, so its inverse cannot be taken.
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", Decimal::ZERO, day())]));
        let converter = Converter::new(store, FallbackRates::default());
        let result = converter
            .convert_detailed(dec!(7), &code("UYU"), &code("USD"))
            .await;
        assert_eq!(result.converted_amount, dec!(0.1645));
        assert_eq!(result.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_convert_zero_rate_without_fallback_is_identity() {
        let store = Arc::new(MemoryRates::with_rates(&[("USD", "UYU", Decimal::ZERO, day())]));
        let converter = Converter::new(store, FallbackRates::empty());
        let converted = converter.convert(dec!(7), &code("UYU"), &code("USD")).await;
        assert_eq!(converted, dec!(7));
    }

    #[tokio::test]
    async fn test_convert_survives_overflow() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(1000))]);
        let result = converter
            .convert_detailed(Decimal::MAX, &code("USD"), &code("UYU"))
            .await;
        assert_eq!(result.converted_amount, Decimal::MAX);
        assert_eq!(result.source, RateSource::Identity);
    }

    #[tokio::test]
    async fn test_overflow_is_reported_as_degraded() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(1000))]);
        let records = [
            record(dec!(1), "USD", "a"),
            record(Decimal::MAX, "USD", "b"),
            record(Decimal::MAX, "USD", "b"),
        ];
        let batch = converter.convert_records(&records, &code("UYU")).await;
        assert_eq!(batch.results[0].source, RateSource::Direct);
        assert_eq!(batch.results[1].source, RateSource::Identity);
        assert_eq!(batch.degraded.len(), 1);
        assert_eq!(batch.degraded[0].from, code("USD"));
        assert_eq!(batch.degraded[0].source, RateSource::Identity);
        assert!(batch.degraded[0].reason.contains("overflowed"));

        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        assert_eq!(report.degraded.len(), 1);
        assert!(report.degraded[0].reason.contains("overflowed"));
    }

    #[tokio::test]
    async fn test_totals_cap_on_overflow() {
        let (_, converter) = converter(&[]);
        let records = [
            record(Decimal::MAX, "UYU", "a"),
            record(dec!(1), "UYU", "a"),
            record(Decimal::MAX, "UYU", "b"),
        ];
        let batch = converter.convert_records(&records, &code("UYU")).await;
        assert_eq!(batch.total, Decimal::MAX);
        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        assert_eq!(report.by_category[0].total, Decimal::MAX);
        assert_eq!(report.by_category[1].total, Decimal::MAX);
        assert_eq!(report.total, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_convert_is_idempotent() {
        let (_, converter) = converter(&[("EUR", "UYU", dec!(45.7))]);
        let a = converter.convert(dec!(19.99), &code("EUR"), &code("UYU")).await;
        let b = converter.convert(dec!(19.99), &code("EUR"), &code("UYU")).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_convert_batch_mixed() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let records = [
            record(dec!(100), "USD", "c1"),
            record(dec!(200), "UYU", "c1"),
            record(dec!(5), "XYZ", "c2"),
        ];
        let total = converter.convert_batch(&records, &code("UYU")).await;
        assert_eq!(total, dec!(4455));
    }

    #[tokio::test]
    async fn test_convert_batch_empty() {
        let (_, converter) = converter(&[]);
        let total = converter.convert_batch(&[], &code("UYU")).await;
        assert_eq!(total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_convert_records_resolves_each_pair_once() {
        let (store, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let records = [
            record(dec!(1), "USD", "c1"),
            record(dec!(2), "USD", "c2"),
            record(dec!(3), "USD", "c1"),
        ];
        let batch = converter.convert_records(&records, &code("UYU")).await;
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.total, dec!(255));
        assert!(batch.degraded.is_empty());
        // One direct lookup for USD->UYU, which succeeded.
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_by_category_scenario() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5))]);
        let records = [record(dec!(100), "USD", "c1"), record(dec!(200), "UYU", "c1")];
        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        assert_eq!(report.total, dec!(4450));
        assert_eq!(report.target_currency, code("UYU"));
        assert_eq!(
            report.by_category,
            vec![CategoryTotal {
                category_id: "c1".to_string(),
                category_name: "Category c1".to_string(),
                total: dec!(4450),
            }]
        );
        assert!(report.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_preserves_first_seen_order() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(40))]);
        let records = [
            record(dec!(1), "UYU", "rent"),
            record(dec!(1), "USD", "equipment"),
            record(dec!(2), "UYU", "rent"),
            record(dec!(1), "UYU", "cleaning"),
            record(dec!(3), "USD", "equipment"),
        ];
        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        let ids: Vec<&str> = report
            .by_category
            .iter()
            .map(|c| c.category_id.as_str())
            .collect();
        assert_eq!(ids, vec!["rent", "equipment", "cleaning"]);
        assert_eq!(report.by_category[0].total, dec!(3));
        assert_eq!(report.by_category[1].total, dec!(160));
        assert_eq!(report.by_category[2].total, dec!(1));
    }

    #[tokio::test]
    async fn test_aggregate_total_equals_sum_of_categories() {
        let (_, converter) = converter(&[("USD", "UYU", dec!(42.5)), ("EUR", "USD", dec!(1.1))]);
        let records = [
            record(dec!(19.99), "USD", "a"),
            record(dec!(250), "UYU", "b"),
            record(dec!(3.33), "EUR", "a"),
            record(dec!(7), "XYZ", "c"),
            record(dec!(1000), "UYU", "b"),
        ];
        for target in ["UYU", "USD", "EUR"] {
            let report = converter
                .aggregate_by_category(&records, &code(target))
                .await;
            let sum: Decimal = report.by_category.iter().map(|c| c.total).sum();
            assert_eq!(report.total, sum, "target {target}");
            let batch = converter.convert_batch(&records, &code(target)).await;
            assert_eq!(report.total.round_dp(10), batch.round_dp(10), "target {target}");
        }
    }

    #[tokio::test]
    async fn test_aggregate_reports_degraded_pairs_once() {
        let (_, converter) = converter(&[]);
        let records = [
            record(dec!(10), "XYZ", "a"),
            record(dec!(10), "XYZ", "b"),
            record(dec!(1), "USD", "a"),
        ];
        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        assert_eq!(report.degraded.len(), 2);
        assert_eq!(report.degraded[0].from, code("XYZ"));
        assert_eq!(report.degraded[0].source, RateSource::Identity);
        assert_eq!(report.degraded[1].from, code("USD"));
        assert_eq!(report.degraded[1].source, RateSource::Fallback);
        assert_eq!(report.total, dec!(62.5));
    }

    #[tokio::test]
    async fn test_aggregate_empty() {
        let (_, converter) = converter(&[]);
        let report = converter.aggregate_by_category(&[], &code("UYU")).await;
        assert_eq!(report.total, Decimal::ZERO);
        assert!(report.by_category.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_never_fails_on_storage_errors() {
        let converter = Converter::new(Arc::new(FailingRates), FallbackRates::empty());
        let records = [record(dec!(100), "USD", "c1"), record(dec!(200), "UYU", "c1")];
        let report = converter
            .aggregate_by_category(&records, &code("UYU"))
            .await;
        assert_eq!(report.total, dec!(300));
        assert_eq!(report.degraded.len(), 1);
        assert!(report.degraded[0].reason.contains("Unable to read exchange rates"));
    }
}
