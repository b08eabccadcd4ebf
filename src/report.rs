//! The report sink. Everything a run produced, written wholesale as one
//! JSON document: the ordered records plus the run-level metrics.
use crate::enrichment::{EnrichedBlock, RunMetrics};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "mev_boost_enrichment_with_metrics.json";

#[derive(Debug, Serialize)]
pub struct EnrichmentReport {
    pub block_data: Vec<EnrichedBlock>,
    pub overall_metrics: RunMetrics,
}

pub fn write_report(
    path: impl AsRef<Path>,
    report: &EnrichmentReport,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| {
        format!("failed to create report file {}", path.display())
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .context("failed to serialize enrichment report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon_chain::Slot;
    use crate::enrichment::{aggregate, BidStats};
    use crate::mev_blocks::Relay;
    use crate::units::WeiNewtype;

    fn sample_report() -> EnrichmentReport {
        let enriched = EnrichedBlock {
            block_number: 16_000_000,
            block_hash: "0xblockhash".to_string(),
            slot: Slot(6_426_687),
            timestamp: "2022-11-22T20:03:12Z".parse().unwrap(),
            gas_used: 1000,
            gas_limit: 30_000_000,
            gas_used_percentage: 1000.0 / 30_000_000.0 * 100.0,
            transaction_count: 3,
            base_fee_per_gas: Some(WeiNewtype(10)),
            bids: Some(BidStats {
                average_bid: 200.0,
                max_bid: WeiNewtype(300),
                bid_count: 3,
                highest_bid_selected: true,
                bid_value_variance: 10_000.0,
            }),
            winning_relay: Some(Relay::Ultrasound),
            mev_reward_percentage: Some(5.0),
            empty_slot: false,
        };
        let empty = EnrichedBlock {
            block_number: 16_000_001,
            block_hash: "0xotherhash".to_string(),
            slot: Slot(6_426_689),
            timestamp: "2022-11-22T20:03:24Z".parse().unwrap(),
            gas_used: 1000,
            gas_limit: 30_000_000,
            gas_used_percentage: 1000.0 / 30_000_000.0 * 100.0,
            transaction_count: 0,
            base_fee_per_gas: None,
            bids: None,
            winning_relay: None,
            mev_reward_percentage: None,
            empty_slot: true,
        };
        let block_data = vec![enriched, empty];
        let overall_metrics = aggregate(&block_data);
        EnrichmentReport {
            block_data,
            overall_metrics,
        }
    }

    #[test]
    fn report_shape_test() {
        let value = serde_json::to_value(sample_report()).unwrap();

        assert_eq!(value["block_data"][0]["winning_relay"], "ultrasound");
        assert_eq!(value["block_data"][0]["bids"]["bid_count"], 3);
        // money values travel as decimal strings
        assert_eq!(value["block_data"][0]["bids"]["max_bid"], "300");
        // timestamps are ISO-8601 text
        assert_eq!(
            value["block_data"][0]["timestamp"],
            "2022-11-22T20:03:12Z"
        );
        // no data encodes as null
        assert!(value["block_data"][1]["bids"].is_null());
        assert!(value["block_data"][1]["winning_relay"].is_null());
        assert!(value["block_data"][1]["base_fee_per_gas"].is_null());
        assert_eq!(value["block_data"][1]["empty_slot"], true);
        // every known relay keyed in the win table
        assert_eq!(value["overall_metrics"]["relay_wins"]["flashbots"], 0);
        assert_eq!(value["overall_metrics"]["relay_wins"]["ultrasound"], 1);
    }

    #[test]
    fn write_report_round_trip_test() {
        let path = std::env::temp_dir().join(format!(
            "mev_boost_enrichment_report_{}.json",
            std::process::id()
        ));

        write_report(&path, &sample_report()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["overall_metrics"]["total_slots_processed"], 2);
        assert_eq!(value["overall_metrics"]["empty_slots"], 1);

        std::fs::remove_file(&path).unwrap();
    }
}
