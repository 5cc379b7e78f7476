//! Serving side access to trained strategies.
mod cache;

pub use cache::{CacheError, NodeStrategy, StrategyCache, StrategySnapshot};
