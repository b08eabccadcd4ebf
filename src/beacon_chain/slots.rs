use crate::beacon_chain::GENESIS_TIMESTAMP;
use crate::execution_chain::BlockNumber;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::{Add, Sub};

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Ord,
    PartialOrd,
    PartialEq,
    Serialize,
)]
pub struct Slot(pub i32);

impl Slot {
    pub const GENESIS: Self = Self(0);
    pub const SECONDS_PER_SLOT: i32 = 12;

    // Linear calibration anchored to the merge block / merge slot pair.
    // Execution blocks arrived roughly every 32 seconds pre-merge, so the
    // block offset times 32 converts to seconds, then to 12-second slots.
    const REFERENCE_BLOCK: i64 = 15_537_394;
    const REFERENCE_SLOT: i64 = 5_193_071;
    const BLOCK_TIME_SECONDS: i64 = 32;

    /// Estimate which slot an execution block landed in. An estimate only:
    /// the exact slot takes a beacon-chain lookup, and the calibration
    /// drifts if block or slot timing ever changes.
    pub fn estimate_from_block_number(block_number: BlockNumber) -> Self {
        let seconds_offset = (block_number as i64 - Self::REFERENCE_BLOCK)
            * Self::BLOCK_TIME_SECONDS;
        // floor division on the whole product, so pre-reference blocks
        // round down rather than toward zero
        let slot = seconds_offset.div_euclid(Self::SECONDS_PER_SLOT as i64)
            + Self::REFERENCE_SLOT;
        Self(slot as i32)
    }

    pub fn date_time(&self) -> DateTime<Utc> {
        (*self).into()
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<i32> for Slot {
    type Output = Self;

    fn add(self, rhs: i32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<i32> for Slot {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl From<Slot> for DateTime<Utc> {
    fn from(slot: Slot) -> Self {
        let seconds = slot.0 as i64 * Slot::SECONDS_PER_SLOT as i64;
        *GENESIS_TIMESTAMP + Duration::seconds(seconds)
    }
}

impl From<Slot> for i32 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl From<i32> for Slot {
    fn from(slot: i32) -> Self {
        Self(slot)
    }
}
