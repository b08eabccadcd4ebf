//! Serde helpers for the quantity-style hex strings execution nodes and
//! relays put on the wire, plus a tolerant accessor for JSON trees.
use crate::units::WeiNewtype;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn parse_hex_u128(raw: &str) -> Result<u128, std::num::ParseIntError> {
    u128::from_str_radix(raw.trim_start_matches("0x"), 16)
}

pub fn u64_from_hex_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let quantity = parse_hex_u128(&raw).map_err(serde::de::Error::custom)?;
    u64::try_from(quantity).map_err(serde::de::Error::custom)
}

pub fn wei_from_hex_string<'de, D>(deserializer: D) -> Result<WeiNewtype, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let quantity = parse_hex_u128(&raw).map_err(serde::de::Error::custom)?;
    i128::try_from(quantity)
        .map(WeiNewtype)
        .map_err(serde::de::Error::custom)
}

/// For fields that may be missing entirely, like pre-London base fees.
pub fn wei_opt_from_hex_string<'de, D>(
    deserializer: D,
) -> Result<Option<WeiNewtype>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => {
            let quantity =
                parse_hex_u128(&raw).map_err(serde::de::Error::custom)?;
            i128::try_from(quantity)
                .map(|wei| Some(WeiNewtype(wei)))
                .map_err(serde::de::Error::custom)
        }
    }
}

pub fn timestamp_from_hex_string<'de, D>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let seconds = parse_hex_u128(&raw)
        .map_err(serde::de::Error::custom)
        .and_then(|quantity| {
            i64::try_from(quantity).map_err(serde::de::Error::custom)
        })?;
    Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
        serde::de::Error::custom(format!("timestamp {raw} out of range"))
    })
}

/// Walk a JSON tree by object keys, returning None on any missing key or
/// non-object along the way. Never panics.
pub fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}
