//! Exchange rate command handlers.

use crate::args::{RateConvertArgs, RateLatestArgs, RateSetArgs, RatesOnArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::fx::{ConversionResult, RateError, RateSource};
use crate::model::{Amount, CurrencyCode, ExchangeRate};
use crate::{Config, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The answer to `rate latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LatestRate {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub rate: Decimal,
    pub source: RateSource,
}

/// Stores the rate for a pair on a date, replacing any rate already stored for the same pair and
/// date. The date defaults to today (UTC).
///
/// # Errors
///
/// - Returns a request error if the rate is not positive or both currencies are the same.
/// - Returns a database error if the rate cannot be written.
pub async fn rate_set(config: Config, args: RateSetArgs) -> Result<Out<ExchangeRate>> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let rate = ExchangeRate::new(args.from, args.to, args.rate, date).pub_result(ErrorType::Request)?;
    let saved = config
        .db()
        .upsert_rate(&rate)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Set {} -> {} to {} on {}",
        saved.from_currency(),
        saved.to_currency(),
        saved.rate(),
        saved.date()
    );
    Ok(Out::new(message, saved))
}

/// Looks up the stored rate for a pair: the most recent direct rate, else the reciprocal of the
/// most recent inverse rate. The fallback table is never consulted here.
///
/// # Errors
///
/// - Returns a request error if no rate is stored in either direction.
/// - Returns a database error if the stored rates cannot be read or the inverse rate is zero.
pub async fn rate_latest(config: Config, args: RateLatestArgs) -> Result<Out<LatestRate>> {
    let converter = config.converter();
    let result = converter.resolver().resolve(&args.from, &args.to).await;
    let error_type = match &result {
        Err(RateError::NotFound { .. }) => ErrorType::Request,
        _ => ErrorType::Database,
    };
    let resolved = result.pub_result(error_type)?;
    let latest = LatestRate {
        from_currency: args.from,
        to_currency: args.to,
        rate: resolved.rate,
        source: resolved.source,
    };
    let message = format!(
        "1 {} = {} {} ({})",
        latest.from_currency, latest.rate, latest.to_currency, latest.source
    );
    Ok(Out::new(message, latest))
}

/// Converts an amount between two currencies. This never fails for lack of a rate: it falls back
/// to the configured table and then to an identity rate, and says so in the result.
pub async fn rate_convert(config: Config, args: RateConvertArgs) -> Result<Out<ConversionResult>> {
    let result = config
        .converter()
        .convert_detailed(args.amount.value(), &args.from, &args.to)
        .await;
    let mut message = format!(
        "{} {} = {} {}",
        args.amount,
        result.original_currency,
        Amount::new(result.converted_amount),
        result.target_currency
    );
    if result.source.is_degraded() {
        message.push_str(&format!(
            " (no stored rate, used {} rate {})",
            result.source, result.rate
        ));
    }
    Ok(Out::new(message, result))
}

/// Lists every rate stored for a date.
pub async fn rates_on(config: Config, args: RatesOnArgs) -> Result<Out<Vec<ExchangeRate>>> {
    let rates = config
        .db()
        .rates_on(args.date)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!("Found {} rate(s) for {}", rates.len(), args.date);
    Ok(Out::new(message, rates))
}
