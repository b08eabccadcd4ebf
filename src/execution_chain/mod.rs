mod block_range;
mod node;

pub use block_range::{parse_block_ranges, BlockRange, ParseBlockRangesError};
pub use node::{BlockSummary, ExecutionNode, ExecutionNodeHttp, MockExecutionNode};

pub type BlockNumber = i32;
