use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Wei amount. Bid values routinely exceed u64 range, so this wraps an i128.
/// Serialized as a decimal string, the way relay APIs carry money values.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WeiNewtype(pub i128);

impl WeiNewtype {
    pub const WEI_PER_ETH: i128 = 1_000_000_000_000_000_000;
}

impl Add for WeiNewtype {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for WeiNewtype {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u64> for WeiNewtype {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self::Output {
        Self(self.0 * rhs as i128)
    }
}

impl Sum for WeiNewtype {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self(0), Add::add)
    }
}

impl From<i128> for WeiNewtype {
    fn from(wei: i128) -> Self {
        Self(wei)
    }
}

impl Display for WeiNewtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for WeiNewtype {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for WeiNewtype {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse::<i128>()
            .map(WeiNewtype)
            .map_err(serde::de::Error::custom)
    }
}
