use super::EnrichedBlock;
use crate::mev_blocks::Relay;
use enum_iterator::all;
use serde::Serialize;
use std::collections::BTreeMap;

/// Run-level rollup of the enriched records.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunMetrics {
    pub total_slots_processed: u32,
    pub average_bid_value: Option<f64>,
    pub average_bid_value_variance: Option<f64>,
    /// Delivered-payload wins per relay, every known relay always present.
    pub relay_wins: BTreeMap<Relay, u32>,
    pub empty_slots: u32,
}

/// Mean of an empty series is no data, never zero.
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Single pass over the records. Blocks without bid data contribute to the
/// slot and empty-slot counts but not to the means.
pub fn aggregate(blocks: &[EnrichedBlock]) -> RunMetrics {
    let mut average_bids = Vec::new();
    let mut variances = Vec::new();
    let mut relay_wins: BTreeMap<Relay, u32> =
        all::<Relay>().map(|relay| (relay, 0)).collect();
    let mut empty_slots = 0;

    for block in blocks {
        if let Some(bids) = &block.bids {
            average_bids.push(bids.average_bid);
            variances.push(bids.bid_value_variance);
        }
        if let Some(winner) = block.winning_relay {
            *relay_wins.entry(winner).or_insert(0) += 1;
        }
        if block.empty_slot {
            empty_slots += 1;
        }
    }

    RunMetrics {
        total_slots_processed: blocks.len() as u32,
        average_bid_value: mean(&average_bids),
        average_bid_value_variance: mean(&variances),
        relay_wins,
        empty_slots,
    }
}
