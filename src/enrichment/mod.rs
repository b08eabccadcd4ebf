//! The enrichment pipeline. One pass per configured block: canonical block
//! data from the execution node, auction data from every relay, merged into
//! a single record with the derived MEV metrics, then folded into run-level
//! metrics and written out as a report.
mod run_metrics;

pub use run_metrics::{aggregate, RunMetrics};

use crate::beacon_chain::Slot;
use crate::env::ENV_CONFIG;
use crate::execution_chain::{
    parse_block_ranges, BlockNumber, BlockRange, BlockSummary, ExecutionNode,
    ExecutionNodeHttp,
};
use crate::fetch::{
    FetchClient, RateLimiter, RetryPolicy, DEFAULT_BACKOFF_BASE_MILLIS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_INTERVAL_MILLIS,
};
use crate::mev_blocks::{
    fetch_bid_set, Relay, RelayApi, RelayApiHttp, RelayBidSet,
};
use crate::report::{self, EnrichmentReport};
use crate::units::WeiNewtype;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use enum_iterator::all;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bid-derived figures for one block. Constructed only from a non-empty bid
/// list, so the fields are present or absent together, never mixed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BidStats {
    /// Mean of all builder bids across relays, in wei.
    pub average_bid: f64,
    pub max_bid: WeiNewtype,
    pub bid_count: u32,
    /// Whether the delivered payload matched the best bid seen anywhere.
    pub highest_bid_selected: bool,
    /// Squared deviation of the max bid from the mean. A dispersion proxy,
    /// not a statistical variance; downstream consumers depend on this
    /// exact formula.
    pub bid_value_variance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedBlock {
    pub block_number: BlockNumber,
    pub block_hash: String,
    pub slot: Slot,
    pub timestamp: DateTime<Utc>,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub gas_used_percentage: f64,
    pub transaction_count: u32,
    pub base_fee_per_gas: Option<WeiNewtype>,
    pub bids: Option<BidStats>,
    pub winning_relay: Option<Relay>,
    pub mev_reward_percentage: Option<f64>,
    pub empty_slot: bool,
}

fn bid_stats(
    all_bids: &[WeiNewtype],
    winning_bid: WeiNewtype,
) -> Option<BidStats> {
    if all_bids.is_empty() {
        return None;
    }

    let sum: WeiNewtype = all_bids.iter().copied().sum();
    let average_bid = sum.0 as f64 / all_bids.len() as f64;
    let max_bid = *all_bids
        .iter()
        .max()
        .expect("expect a non-empty bid list to have a maximum");
    let deviation = max_bid.0 as f64 - average_bid;

    Some(BidStats {
        average_bid,
        max_bid,
        bid_count: all_bids.len() as u32,
        highest_bid_selected: winning_bid == max_bid,
        bid_value_variance: deviation * deviation,
    })
}

/// Merge the relays' answers into the canonical block and derive every
/// metric. Pure: same inputs, same record.
pub fn build_enriched_block(
    summary: &BlockSummary,
    slot: Slot,
    bid_sets: &[RelayBidSet],
) -> EnrichedBlock {
    let mut all_bids: Vec<WeiNewtype> = Vec::new();
    let mut winning_bid = WeiNewtype(0);
    let mut winning_relay = None;

    for bid_set in bid_sets {
        if let Some(builder_blocks) = &bid_set.builder_blocks {
            all_bids.extend(builder_blocks.iter().map(|trace| trace.value));
        }
        if let Some(delivered) = bid_set
            .proposer_payload
            .as_ref()
            .and_then(|payloads| payloads.first())
        {
            // strictly greater: the first relay to reach a value keeps the
            // win, and a zero-valued payload never wins
            if delivered.value > winning_bid {
                winning_bid = delivered.value;
                winning_relay = Some(bid_set.relay);
            }
        }
    }

    let bids = bid_stats(&all_bids, winning_bid);

    let mev_reward_percentage = match summary.base_fee_per_gas {
        Some(base_fee) if winning_bid > WeiNewtype(0) => {
            let total_reward = base_fee * summary.gas_used;
            if total_reward > WeiNewtype(0) {
                Some(winning_bid.0 as f64 / total_reward.0 as f64 * 100.0)
            } else {
                // a delivered bid over a zero burn reports 0, not "no data"
                Some(0.0)
            }
        }
        _ => None,
    };

    EnrichedBlock {
        block_number: summary.number,
        block_hash: summary.hash.clone(),
        slot,
        timestamp: summary.timestamp,
        gas_used: summary.gas_used,
        gas_limit: summary.gas_limit,
        gas_used_percentage: summary.gas_used as f64
            / summary.gas_limit as f64
            * 100.0,
        transaction_count: summary.transaction_count,
        base_fee_per_gas: summary.base_fee_per_gas,
        empty_slot: all_bids.is_empty(),
        bids,
        winning_relay,
        mev_reward_percentage,
    }
}

/// Enrich one block, or None when its canonical data is unavailable. Relay
/// trouble never skips a block, only missing canonical data does.
pub async fn enrich_block(
    execution_node: &dyn ExecutionNode,
    relay_apis: &[Box<dyn RelayApi>],
    block_number: BlockNumber,
) -> Option<EnrichedBlock> {
    let summary = match execution_node.get_block_by_number(block_number).await {
        Ok(Some(summary)) => summary,
        Ok(None) => {
            warn!(block_number, "no canonical block data, skipping block");
            return None;
        }
        Err(err) => {
            warn!(block_number, %err, "failed to fetch block, skipping block");
            return None;
        }
    };

    let slot = Slot::estimate_from_block_number(block_number);

    // relays fetched concurrently, merged in declaration order
    let bid_sets = join_all(
        relay_apis
            .iter()
            .map(|api| fetch_bid_set(api.as_ref(), slot)),
    )
    .await;

    Some(build_enriched_block(&summary, slot, &bid_sets))
}

/// Drive a whole run: every block of every configured range, sequentially,
/// then aggregate and write the report.
pub async fn enrich_block_ranges() -> Result<()> {
    let ranges_raw = ENV_CONFIG
        .block_ranges
        .as_ref()
        .context("BLOCK_RANGES is required to enrich blocks")?;
    let ranges = parse_block_ranges(ranges_raw)?;

    let execution_url = ENV_CONFIG
        .execution_url
        .clone()
        .context("EXECUTION_URL is required to enrich blocks")?;

    let interval = Duration::from_millis(
        ENV_CONFIG
            .request_interval_millis
            .unwrap_or(DEFAULT_REQUEST_INTERVAL_MILLIS),
    );
    let retry = RetryPolicy {
        max_attempts: ENV_CONFIG
            .retry_max_attempts
            .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        backoff_base: Duration::from_millis(
            ENV_CONFIG
                .retry_backoff_millis
                .unwrap_or(DEFAULT_BACKOFF_BASE_MILLIS),
        ),
    };
    let fetch_client =
        Arc::new(FetchClient::new(RateLimiter::new(interval), retry));

    let execution_node = ExecutionNodeHttp::new(
        fetch_client.clone(),
        execution_url,
        ENV_CONFIG.execution_api_key.clone(),
    );
    let relay_apis: Vec<Box<dyn RelayApi>> = all::<Relay>()
        .map(|relay| {
            Box::new(RelayApiHttp::new(fetch_client.clone(), relay))
                as Box<dyn RelayApi>
        })
        .collect();

    let total_blocks: u64 = ranges.iter().map(BlockRange::count).sum();
    info!(ranges = %ranges_raw, total_blocks, "enriching block ranges");

    let mut progress = pit_wall::Progress::new("enrich blocks", total_blocks);
    let mut enriched_blocks = Vec::new();
    let mut skipped_blocks: u32 = 0;

    for range in ranges {
        for block_number in range {
            match enrich_block(&execution_node, &relay_apis, block_number)
                .await
            {
                Some(block) => {
                    debug!(block_number, "processed block");
                    enriched_blocks.push(block);
                }
                None => skipped_blocks += 1,
            }

            progress.inc_work_done();
            if block_number % 100 == 0 {
                info!("{}", progress.get_progress_string());
            }
        }
    }

    let overall_metrics = aggregate(&enriched_blocks);
    log_run_summary(&overall_metrics, skipped_blocks);

    let report_path = ENV_CONFIG
        .report_path
        .clone()
        .unwrap_or_else(|| report::DEFAULT_REPORT_PATH.to_string());
    let enrichment_report = EnrichmentReport {
        block_data: enriched_blocks,
        overall_metrics,
    };
    report::write_report(&report_path, &enrichment_report)?;
    info!(path = %report_path, "enrichment report written");

    Ok(())
}

fn log_run_summary(metrics: &RunMetrics, skipped_blocks: u32) {
    info!(
        total_slots = metrics.total_slots_processed,
        average_bid_value = ?metrics.average_bid_value,
        average_bid_value_variance = ?metrics.average_bid_value_variance,
        empty_slots = metrics.empty_slots,
        skipped_blocks,
        "run complete"
    );
    for (relay, wins) in &metrics.relay_wins {
        info!(%relay, wins, "relay wins");
    }
}
