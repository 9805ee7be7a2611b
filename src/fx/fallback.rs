use crate::model::CurrencyCode;
use crate::Result;
use anyhow::ensure;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Approximate rates used when no stored rate exists for a pair, keyed `from -> to -> rate`.
///
/// The table is loaded from `config.json` at startup and never changes while the program runs.
/// It is not kept reciprocal with itself or with the stored rates.
///
/// Serialized form:
/// ```json
/// { "USD": { "UYU": "42.5", "EUR": "0.93" }, "EUR": { "USD": "1.08" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackRates(BTreeMap<CurrencyCode, BTreeMap<CurrencyCode, Decimal>>);

impl FallbackRates {
    /// An empty table: every missing rate degrades straight to identity.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a table from `(from, to, rate)` triples. Later duplicates replace earlier ones.
    pub fn from_pairs<F, T>(pairs: impl IntoIterator<Item = (F, T, Decimal)>) -> Result<Self>
    where
        F: Into<CurrencyCode>,
        T: Into<CurrencyCode>,
    {
        let mut map: BTreeMap<CurrencyCode, BTreeMap<CurrencyCode, Decimal>> = BTreeMap::new();
        for (from, to, rate) in pairs {
            map.entry(from.into()).or_default().insert(to.into(), rate);
        }
        let rates = Self(map);
        rates.validate()?;
        Ok(rates)
    }

    /// Every rate must be strictly positive.
    pub fn validate(&self) -> Result<()> {
        for (from, to, rate) in self.iter() {
            ensure!(
                rate > Decimal::ZERO,
                "Fallback rate for {from} to {to} must be greater than zero, got {rate}"
            );
        }
        Ok(())
    }

    pub fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal> {
        self.0.get(from).and_then(|targets| targets.get(to)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &CurrencyCode, Decimal)> {
        self.0
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |(to, rate)| (from, to, *rate)))
    }
}

impl Default for FallbackRates {
    /// The approximate rates written to a new `config.json`.
    fn default() -> Self {
        let pairs = [
            ("USD", "UYU", Decimal::new(425, 1)),
            ("USD", "EUR", Decimal::new(93, 2)),
            ("USD", "ARS", Decimal::new(870, 0)),
            ("USD", "CLP", Decimal::new(920, 0)),
            ("USD", "MXN", Decimal::new(175, 1)),
            ("USD", "COP", Decimal::new(4000, 0)),
            ("EUR", "UYU", Decimal::new(457, 1)),
            ("EUR", "USD", Decimal::new(108, 2)),
            ("UYU", "USD", Decimal::new(235, 4)),
            ("UYU", "EUR", Decimal::new(219, 4)),
        ];
        let mut map: BTreeMap<CurrencyCode, BTreeMap<CurrencyCode, Decimal>> = BTreeMap::new();
        for (from, to, rate) in pairs {
            map.entry(from.into()).or_default().insert(to.into(), rate);
        }
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_table() {
        let rates = FallbackRates::default();
        assert_eq!(rates.len(), 10);
        assert_eq!(rates.get(&"USD".into(), &"UYU".into()), Some(dec!(42.5)));
        assert_eq!(rates.get(&"UYU".into(), &"EUR".into()), Some(dec!(0.0219)));
        assert_eq!(rates.get(&"USD".into(), &"XYZ".into()), None);
        assert_eq!(rates.get(&"XYZ".into(), &"USD".into()), None);
        assert!(rates.validate().is_ok());
    }

    #[test]
    fn test_lookup_is_directional() {
        let rates = FallbackRates::from_pairs([("USD", "MXN", dec!(17.5))]).unwrap();
        assert_eq!(rates.get(&"USD".into(), &"MXN".into()), Some(dec!(17.5)));
        assert_eq!(rates.get(&"MXN".into(), &"USD".into()), None);
    }

    #[test]
    fn test_from_pairs_rejects_zero() {
        let e = FallbackRates::from_pairs([("USD", "UYU", Decimal::ZERO)]).unwrap_err();
        assert!(e.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_serde_shape() {
        let rates = FallbackRates::from_pairs([("usd", "uyu", dec!(42.5))]).unwrap();
        let json = serde_json::to_string(&rates).unwrap();
        assert_eq!(json, r#"{"USD":{"UYU":"42.5"}}"#);
        let back: FallbackRates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rates);
    }

    #[test]
    fn test_empty() {
        let rates = FallbackRates::empty();
        assert!(rates.is_empty());
        assert_eq!(rates.iter().count(), 0);
    }
}
