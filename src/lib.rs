pub mod beacon_chain;
pub mod enrichment;
pub mod env;
pub mod execution_chain;
pub mod fetch;
pub mod json_codecs;
pub mod log;
pub mod mev_blocks;
pub mod report;
pub mod units;
