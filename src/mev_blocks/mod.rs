use crate::env::ENV_CONFIG;
use crate::json_codecs::wei_from_hex_string;
use crate::units::WeiNewtype;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod relay_api;

pub use relay_api::{fetch_bid_set, MockRelayApi, RelayApi, RelayApiHttp};

pub const FLASHBOTS_RELAY_URL: &str = "https://boost-relay.flashbots.net";
pub const ULTRASOUND_RELAY_URL: &str =
    "https://relay-analytics.ultrasound.money";

/// The relays we pull auction data from. Declaration order is load-bearing:
/// bid sets are merged and the delivered-payload winner resolved by visiting
/// relays in this order.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Sequence,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Relay {
    Flashbots,
    Ultrasound,
}

impl Relay {
    pub fn name(&self) -> &'static str {
        match self {
            Relay::Flashbots => "flashbots",
            Relay::Ultrasound => "ultrasound",
        }
    }

    pub fn base_url(&self) -> String {
        match self {
            Relay::Flashbots => ENV_CONFIG
                .flashbots_url
                .clone()
                .unwrap_or_else(|| FLASHBOTS_RELAY_URL.to_string()),
            Relay::Ultrasound => ENV_CONFIG
                .ultrasound_url
                .clone()
                .unwrap_or_else(|| ULTRASOUND_RELAY_URL.to_string()),
        }
    }
}

impl Display for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One builder bid or delivered payload as the relay data API reports it.
/// Only the value matters here, the rest of the trace is ignored.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct BidTrace {
    #[serde(deserialize_with = "wei_from_hex_string")]
    pub value: WeiNewtype,
}

/// A relay's full answer for one slot. None means the relay had no data for
/// that endpoint, or the fetch failed after retries. Not an error either way.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayBidSet {
    pub relay: Relay,
    pub builder_blocks: Option<Vec<BidTrace>>,
    pub proposer_payload: Option<Vec<BidTrace>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use enum_iterator::all;

    #[test]
    fn relay_order_is_declaration_order_test() {
        assert_eq!(
            all::<Relay>().collect::<Vec<Relay>>(),
            vec![Relay::Flashbots, Relay::Ultrasound]
        );
    }

    #[test]
    fn relay_serializes_lowercase_test() {
        assert_eq!(
            serde_json::to_value(Relay::Ultrasound).unwrap(),
            serde_json::Value::String("ultrasound".to_string())
        );
    }

    #[test]
    fn bid_trace_ignores_unknown_fields_test() {
        let trace: BidTrace = serde_json::from_str(
            r#"{"slot": "6426687", "value": "0x64", "builder_pubkey": "0xabc"}"#,
        )
        .unwrap();
        assert_eq!(trace.value, WeiNewtype(100));
    }
}
