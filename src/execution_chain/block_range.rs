use super::BlockNumber;
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

/// Inclusive on both ends. A run may span several ranges and they need not
/// be contiguous.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockRange {
    pub greater_than_or_equal: BlockNumber,
    pub less_than_or_equal: BlockNumber,
}

impl BlockRange {
    pub fn new(
        greater_than_or_equal: BlockNumber,
        less_than_or_equal: BlockNumber,
    ) -> Self {
        if greater_than_or_equal > less_than_or_equal {
            panic!("invalid block range, {greater_than_or_equal} should always be <= {less_than_or_equal}")
        }
        Self {
            greater_than_or_equal,
            less_than_or_equal,
        }
    }

    pub fn count(&self) -> u64 {
        (self.less_than_or_equal - self.greater_than_or_equal + 1) as u64
    }
}

pub struct BlockRangeIntoIterator {
    block_range: BlockRange,
    index: usize,
}

impl IntoIterator for BlockRange {
    type Item = BlockNumber;
    type IntoIter = BlockRangeIntoIterator;

    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            block_range: self,
            index: 0,
        }
    }
}

impl Iterator for BlockRangeIntoIterator {
    type Item = BlockNumber;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.block_range.greater_than_or_equal + self.index as i32)
            .cmp(&self.block_range.less_than_or_equal)
        {
            Ordering::Less | Ordering::Equal => {
                let current =
                    self.block_range.greater_than_or_equal + self.index as i32;
                self.index += 1;
                Some(current)
            }
            Ordering::Greater => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseBlockRangesError {
    #[error("failed to parse block range segment '{0}', expected start-end")]
    MalformedSegment(String),
    #[error("invalid block number in range segment '{0}'")]
    InvalidBlockNumber(String),
    #[error("descending block range '{0}'")]
    DescendingRange(String),
}

impl FromStr for BlockRange {
    type Err = ParseBlockRangesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| ParseBlockRangesError::MalformedSegment(s.to_string()))?;
        let greater_than_or_equal: BlockNumber = start.trim().parse().map_err(
            |_| ParseBlockRangesError::InvalidBlockNumber(s.to_string()),
        )?;
        let less_than_or_equal: BlockNumber = end.trim().parse().map_err(
            |_| ParseBlockRangesError::InvalidBlockNumber(s.to_string()),
        )?;
        if greater_than_or_equal > less_than_or_equal {
            return Err(ParseBlockRangesError::DescendingRange(s.to_string()));
        }
        Ok(Self {
            greater_than_or_equal,
            less_than_or_equal,
        })
    }
}

/// Parse comma-separated "start-end" segments.
pub fn parse_block_ranges(
    raw: &str,
) -> Result<Vec<BlockRange>, ParseBlockRangesError> {
    raw.split(',').map(|segment| segment.trim().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_range_iterable_test() {
        let range = BlockRange::new(1, 4)
            .into_iter()
            .collect::<Vec<BlockNumber>>();
        assert_eq!(range, vec![1, 2, 3, 4]);
    }

    #[test]
    fn single_block_range_test() {
        let range = BlockRange::new(16_010_300, 16_010_300)
            .into_iter()
            .collect::<Vec<BlockNumber>>();
        assert_eq!(range, vec![16_010_300]);
        assert_eq!(BlockRange::new(16_010_300, 16_010_300).count(), 1);
    }

    #[test]
    fn count_test() {
        assert_eq!(BlockRange::new(16_000_000, 16_000_300).count(), 301);
    }

    #[test]
    fn parse_block_ranges_test() {
        let ranges =
            parse_block_ranges("16000000-16000300, 16010300-16010300").unwrap();
        assert_eq!(
            ranges,
            vec![
                BlockRange::new(16_000_000, 16_000_300),
                BlockRange::new(16_010_300, 16_010_300),
            ]
        );
    }

    #[test]
    fn parse_malformed_segment_test() {
        assert!(matches!(
            "16000000".parse::<BlockRange>(),
            Err(ParseBlockRangesError::MalformedSegment(_))
        ));
    }

    #[test]
    fn parse_invalid_block_number_test() {
        assert!(matches!(
            "16000000-end".parse::<BlockRange>(),
            Err(ParseBlockRangesError::InvalidBlockNumber(_))
        ));
    }

    #[test]
    fn parse_descending_range_test() {
        assert!(matches!(
            "16000300-16000000".parse::<BlockRange>(),
            Err(ParseBlockRangesError::DescendingRange(_))
        ));
    }
}
