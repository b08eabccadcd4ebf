use super::{BidTrace, Relay, RelayBidSet};
use crate::beacon_chain::Slot;
use crate::fetch::{FetchClient, FetchError};
use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;
use tracing::warn;

#[automock]
#[async_trait]
pub trait RelayApi {
    fn relay(&self) -> Relay;

    async fn builder_blocks_received(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<BidTrace>>, FetchError>;

    async fn proposer_payload_delivered(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<BidTrace>>, FetchError>;
}

pub struct RelayApiHttp {
    fetch_client: Arc<FetchClient>,
    relay: Relay,
    base_url: String,
}

impl RelayApiHttp {
    pub fn new(fetch_client: Arc<FetchClient>, relay: Relay) -> Self {
        let base_url = relay.base_url();
        Self {
            fetch_client,
            relay,
            base_url,
        }
    }

    pub fn new_with_base_url(
        fetch_client: Arc<FetchClient>,
        relay: Relay,
        base_url: String,
    ) -> Self {
        Self {
            fetch_client,
            relay,
            base_url,
        }
    }

    async fn bidtraces(
        &self,
        endpoint: &str,
        slot: Slot,
    ) -> Result<Option<Vec<BidTrace>>, FetchError> {
        let url = format!(
            "{}/relay/v1/data/bidtraces/{endpoint}?slot={slot}",
            self.base_url
        );
        let body = match self.fetch_client.get_json(&url).await? {
            None => return Ok(None),
            Some(body) => body,
        };
        match serde_json::from_value::<Vec<BidTrace>>(body) {
            Ok(traces) => Ok(Some(traces)),
            Err(err) => {
                warn!(
                    relay = %self.relay,
                    endpoint,
                    %err,
                    "undecodable bidtrace payload, treating as no data"
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl RelayApi for RelayApiHttp {
    fn relay(&self) -> Relay {
        self.relay
    }

    async fn builder_blocks_received(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<BidTrace>>, FetchError> {
        self.bidtraces("builder_blocks_received", slot).await
    }

    async fn proposer_payload_delivered(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<BidTrace>>, FetchError> {
        self.bidtraces("proposer_payload_delivered", slot).await
    }
}

/// Pull both endpoints for one relay. Failures collapse to "no data" here,
/// per endpoint: a dead builder-blocks call never blocks the payload call,
/// and a dead relay never aborts the block being processed.
pub async fn fetch_bid_set(api: &dyn RelayApi, slot: Slot) -> RelayBidSet {
    let relay = api.relay();

    let builder_blocks = match api.builder_blocks_received(slot).await {
        Ok(traces) => traces,
        Err(err) => {
            warn!(%relay, %slot, %err, "builder blocks fetch failed, continuing without");
            None
        }
    };

    let proposer_payload = match api.proposer_payload_delivered(slot).await {
        Ok(traces) => traces,
        Err(err) => {
            warn!(%relay, %slot, %err, "proposer payload fetch failed, continuing without");
            None
        }
    };

    RelayBidSet {
        relay,
        builder_blocks,
        proposer_payload,
    }
}
