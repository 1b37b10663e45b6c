//! Restaurant search.
//!
//! This module holds the result type shared by every search path, the
//! open-and-in-range filter, and the orchestrator that fans a free-text query
//! out over several store lookups and merges what comes back.

pub use error::SearchError;
mod orchestration;
mod proximity;
mod result;

pub use orchestration::{
    DISPATCH_ORDER, ExecutionMode, FAN_OUT, SearchOrchestrator, SearchRequest, SubQuery,
    SubQueryError, SubQueryFailure, merge_unique,
};
pub use proximity::{is_eligible, is_open_at};
pub use result::SearchResult;

mod error {
    use itertools::Itertools;
    use qeats_store::{LocationError, StoreError};
    use thiserror::Error;

    use super::{SubQuery, SubQueryFailure};
    use crate::deadline::DeadlineExceeded;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Invalid location: {0}")]
        InvalidLocation(#[from] LocationError),
        #[error("Store error: {0}")]
        Store(#[from] StoreError),
        #[error("Search failed: {}", .0.iter().join("; "))]
        SubQueriesFailed(Vec<SubQueryFailure>),
        #[error(transparent)]
        DeadlineExceeded(#[from] DeadlineExceeded),
    }

    impl SearchError {
        pub const fn is_invalid_location(&self) -> bool {
            matches!(self, Self::InvalidLocation(_))
        }

        /// True when the store itself was unreachable, directly or from any
        /// failed sub-query.
        pub fn is_store_unavailable(&self) -> bool {
            match self {
                Self::Store(err) => err.is_unavailable(),
                Self::SubQueriesFailed(failures) => {
                    failures.iter().any(|f| f.error.is_store_unavailable())
                }
                _ => false,
            }
        }

        /// Sub-queries named by a [`SearchError::SubQueriesFailed`], in
        /// dispatch order.
        pub fn failed_sub_queries(&self) -> Vec<SubQuery> {
            match self {
                Self::SubQueriesFailed(failures) => failures.iter().map(|f| f.query).collect(),
                _ => Vec::new(),
            }
        }
    }

    pub type Result<T> = std::result::Result<T, SearchError>;
}

pub(crate) use error::Result;
