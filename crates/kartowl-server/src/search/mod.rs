//! The search pipeline behind `/api/search`: query cleanup, the result
//! cache, the concurrent fan-out across marketplaces and the detached
//! history writes that follow every search.

mod cache;
mod orchestrator;
mod query;
mod recorder;
#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use cache::{ResultCache, TRENDING_KEY};
pub use orchestrator::SearchOrchestrator;
pub use query::sanitize_query;
pub use recorder::HistoryRecorder;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search query must be at least {min} characters")]
    QueryTooShort { min: usize },

    #[error("search query must not exceed {max} characters")]
    QueryTooLong { max: usize },
}
