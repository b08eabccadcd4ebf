use anyhow::Result;
use mev_boost_analysis::enrichment;

#[tokio::main]
pub async fn main() -> Result<()> {
    mev_boost_analysis::log::init();
    enrichment::enrich_block_ranges().await
}
