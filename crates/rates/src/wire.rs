//! Exchange rate API response models and their mapping to ledger types.
//!
//! Every payload carries a `success` flag. Unsuccessful payloads carry an
//! `error` object, while gateway level failures only carry a `message`. The
//! envelope is checked before the payload itself is decoded.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use fxledger_core::rates::{
    CurrencySymbols, Fluctuation, FluctuationSeries, Quote, RateError,
};
use fxledger_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::warn;

// =============================================================================
// API Response Models
// =============================================================================

/// Error object of an unsuccessful payload.
#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<JsonValue>,
    #[serde(default, alias = "type")]
    info: Option<String>,
}

/// Fields shared by every payload.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    fn ensure_success(self) -> Result<(), RateError> {
        if self.success {
            return Ok(());
        }
        let reason = match (self.error, self.message) {
            (Some(ApiError { code, info }), _) => format!(
                "{} ({})",
                info.unwrap_or_else(|| "unknown error".to_string()),
                code.map_or_else(|| "no code".to_string(), |c| c.to_string())
            ),
            (None, Some(message)) => message,
            (None, None) => "success flag not set".to_string(),
        };
        Err(RateError::Rejected(reason))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ConvertQuery {
    from: String,
    to: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
struct ConvertInfo {
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    rate: Option<Decimal>,
}

/// `GET /convert` payload.
#[derive(Debug, Clone, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    query: Option<ConvertQuery>,
    #[serde(default)]
    info: Option<ConvertInfo>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    result: Option<Decimal>,
}

/// `GET /symbols` payload.
#[derive(Debug, Clone, Deserialize)]
struct SymbolsResponse {
    #[serde(default)]
    symbols: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FluctuationRate {
    #[serde(deserialize_with = "deserialize_decimal")]
    start_rate: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    end_rate: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    change: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    change_pct: Decimal,
}

/// `GET /fluctuation` payload.
#[derive(Debug, Clone, Deserialize)]
struct FluctuationResponse {
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, FluctuationRate>,
}

// =============================================================================
// Decimal deserialization
// =============================================================================

fn parse_decimal(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("invalid decimal {text:?}: {e}"))
}

/// Deserialize a decimal from a JSON number or string, using the literal text.
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => parse_decimal(&n.to_string()).map_err(D::Error::custom),
        JsonValue::String(s) => parse_decimal(&s).map_err(D::Error::custom),
        _ => Err(D::Error::custom("expected number or string for decimal")),
    }
}

/// Deserialize an optional decimal; `null` maps to `None`.
fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => parse_decimal(&n.to_string())
            .map(Some)
            .map_err(D::Error::custom),
        Some(JsonValue::String(s)) => parse_decimal(&s).map(Some).map_err(D::Error::custom),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for decimal")),
    }
}

// =============================================================================
// Mapping
// =============================================================================

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, RateError> {
    serde_json::from_str(body).map_err(|e| RateError::Malformed(e.to_string()))
}

fn decode_successful<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, RateError> {
    decode::<Envelope>(body)?.ensure_success()?;
    decode(body)
}

fn currency(code: &str) -> Result<CurrencyCode, RateError> {
    CurrencyCode::new(code).map_err(|e| RateError::Malformed(e.to_string()))
}

/// Parses a `/convert` body into a quote for the requested pair.
pub(crate) fn parse_quote(
    body: &str,
    from: &CurrencyCode,
    to: &CurrencyCode,
    amount: Decimal,
) -> Result<Quote, RateError> {
    let response: ConvertResponse = decode_successful(body)?;

    if let Some(query) = &response.query {
        if currency(&query.from)? != *from || currency(&query.to)? != *to {
            return Err(RateError::Malformed(format!(
                "asked for {from}/{to}, upstream answered {}/{}",
                query.from, query.to
            )));
        }
        if query.amount != amount {
            return Err(RateError::Malformed(format!(
                "asked for amount {amount}, upstream converted {}",
                query.amount
            )));
        }
    }

    let result = response
        .result
        .ok_or_else(|| RateError::Malformed("missing result".to_string()))?;

    Ok(Quote {
        from: from.clone(),
        to: to.clone(),
        amount,
        result,
        rate: response.info.and_then(|info| info.rate),
        date: response.date,
    })
}

/// Parses a `/symbols` body. Codes that are not three letters are skipped.
pub(crate) fn parse_symbols(body: &str) -> Result<CurrencySymbols, RateError> {
    let response: SymbolsResponse = decode_successful(body)?;

    let mut symbols = CurrencySymbols::new();
    for (code, name) in response.symbols {
        match CurrencyCode::new(&code) {
            Ok(code) => {
                symbols.insert(code, name);
            }
            Err(e) => warn!(code = %code, error = %e, "Skipping unusable currency symbol"),
        }
    }

    if symbols.is_empty() {
        return Err(RateError::Malformed("empty symbols listing".to_string()));
    }
    Ok(symbols)
}

/// Parses a `/fluctuation` body.
pub(crate) fn parse_fluctuation(body: &str) -> Result<FluctuationSeries, RateError> {
    let response: FluctuationResponse = decode_successful(body)?;

    let missing = |field: &str| RateError::Malformed(format!("missing {field}"));
    let start_date = response.start_date.ok_or_else(|| missing("start_date"))?;
    let end_date = response.end_date.ok_or_else(|| missing("end_date"))?;
    let base = currency(&response.base.ok_or_else(|| missing("base"))?)?;

    let rates = response
        .rates
        .into_iter()
        .map(|(code, rate)| {
            Ok((
                currency(&code)?,
                Fluctuation {
                    start_rate: rate.start_rate,
                    end_rate: rate.end_rate,
                    change: rate.change,
                    change_pct: rate.change_pct,
                },
            ))
        })
        .collect::<Result<_, RateError>>()?;

    Ok(FluctuationSeries {
        start_date,
        end_date,
        base,
        rates,
    })
}
