//! Query-time evaluation.
//!
//! A [`SearchStrategy`] turns a request into query terms, the
//! [`MergeEngine`] walks their posting lists in internal-id order, and the
//! [`Searcher`] scores, filters and ranks the hits through the strategy.

pub mod merge_engine;
pub mod searcher;
pub mod strategy;

pub use merge_engine::{MergeEngine, MergeHit};
pub use searcher::Searcher;
pub use strategy::SearchStrategy;
