mod slots;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

pub use slots::Slot;

lazy_static! {
    pub static ref GENESIS_TIMESTAMP: DateTime<Utc> =
        "2020-12-01T12:00:23Z".parse().unwrap();
}
