mod candidate;
mod engine;
mod filter;

pub use candidate::min_max;
pub use engine::{RankRequest, RankResult, RankingOptions, rank, select_mode};
pub use filter::Filter;
