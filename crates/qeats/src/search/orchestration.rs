use std::{
    collections::BTreeSet,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use ahash::AHashSet;
use chrono::NaiveTime;
use itertools::{Either, Itertools};
use qeats_store::{Location, MenuRecord, RestaurantRecord, RestaurantStore, StoreError};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{Result, SearchError, SearchResult, is_eligible};
use crate::deadline::{Deadline, DeadlineExceeded};

/// One store lookup strategy for a free-text query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuery {
    /// Restaurant name equals the query.
    Name,
    /// A restaurant cuisine/attribute tag matches the query.
    Attributes,
    /// A menu item attribute tag matches the query.
    ItemAttributes,
    /// A menu item name matches the query.
    ItemName,
}

/// Order in which sub-query results are admitted. Earlier wins on duplicates.
pub const DISPATCH_ORDER: [SubQuery; 4] = [
    SubQuery::Name,
    SubQuery::Attributes,
    SubQuery::ItemAttributes,
    SubQuery::ItemName,
];

/// Worker pool width, one thread per sub-query.
pub const FAN_OUT: usize = DISPATCH_ORDER.len();

impl SubQuery {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Attributes => "attributes",
            Self::ItemAttributes => "item attributes",
            Self::ItemName => "item name",
        }
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the sub-queries of one search are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One after another on the calling thread.
    Sequential,
    /// All at once on the orchestrator's worker pool.
    #[default]
    Concurrent,
}

/// Everything a sub-query needs to know about the caller.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'q> {
    pub requester: Location,
    pub current_time: NaiveTime,
    pub radius_km: f64,
    pub query: &'q str,
    pub deadline: Deadline,
}

impl<'q> SearchRequest<'q> {
    pub fn new(requester: Location, current_time: NaiveTime, radius_km: f64, query: &'q str) -> Self {
        Self {
            requester,
            current_time,
            radius_km,
            query,
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    fn admits(&self, record: &RestaurantRecord) -> bool {
        is_eligible(record, &self.requester, self.current_time, self.radius_km)
    }
}

#[derive(Error, Debug)]
pub enum SubQueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
    #[error("Panicked: {0}")]
    Panicked(String),
}

impl SubQueryError {
    pub const fn is_store_unavailable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_unavailable(),
            _ => false,
        }
    }
}

/// A sub-query that did not produce a result.
#[derive(Error, Debug)]
#[error("{query} sub-query: {error}")]
pub struct SubQueryFailure {
    pub query: SubQuery,
    pub error: SubQueryError,
}

type Outcome = std::result::Result<Vec<SearchResult>, SubQueryError>;

/// Runs the four lookup strategies for a text query and merges their results.
///
/// The orchestrator owns a fixed-size worker pool, created once and torn down
/// when the orchestrator is dropped or [`shutdown`](Self::shutdown).
pub struct SearchOrchestrator<S> {
    store: Arc<S>,
    pool: ThreadPool,
}

impl<S> fmt::Debug for SearchOrchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl<S: RestaurantStore> SearchOrchestrator<S> {
    pub fn new(store: Arc<S>) -> std::result::Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(FAN_OUT)
            .thread_name(|i| format!("qeats-subquery-{i}"))
            .build()?;
        Ok(Self { store, pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every sub-query for `request.query` and merge the eligible
    /// restaurants, first occurrence winning.
    ///
    /// A blank query returns nothing without touching the store.
    #[instrument(
        name = "Text Search",
        level = "info",
        skip_all,
        fields(query = request.query, mode = ?mode, radius_km = request.radius_km)
    )]
    pub fn search(&self, request: &SearchRequest<'_>, mode: ExecutionMode) -> Result<Vec<SearchResult>> {
        let query = request.query.trim();
        if query.is_empty() {
            debug!("Blank query, nothing to search");
            return Ok(Vec::new());
        }
        request.deadline.check("sub-query dispatch")?;

        let request = SearchRequest { query, ..*request };
        let t_start = std::time::Instant::now();
        let batches = match mode {
            ExecutionMode::Sequential => self.run_sequential(&request)?,
            ExecutionMode::Concurrent => self.run_concurrent(&request)?,
        };
        let merged = merge_unique(batches);

        debug!(
            results = merged.len(),
            elapsed_ms = t_start.elapsed().as_millis(),
            "Text search complete"
        );
        Ok(merged)
    }

    fn run_sequential(&self, request: &SearchRequest<'_>) -> Result<Vec<Vec<SearchResult>>> {
        let mut batches = Vec::with_capacity(FAN_OUT);
        for query in DISPATCH_ORDER {
            match self.run_guarded(query, request) {
                Ok(batch) => batches.push(batch),
                Err(error) => {
                    warn!(sub_query = %query, %error, "Sub-query failed, aborting search");
                    return Err(SearchError::SubQueriesFailed(vec![SubQueryFailure {
                        query,
                        error,
                    }]));
                }
            }
        }
        Ok(batches)
    }

    fn run_concurrent(&self, request: &SearchRequest<'_>) -> Result<Vec<Vec<SearchResult>>> {
        let mut slots: [Option<Outcome>; FAN_OUT] = Default::default();
        self.pool.scope(|scope| {
            for (slot, query) in slots.iter_mut().zip(DISPATCH_ORDER) {
                scope.spawn(move |_| *slot = Some(self.run_guarded(query, request)));
            }
        });

        let outcomes = DISPATCH_ORDER.into_iter().zip(slots).map(|(query, slot)| {
            let outcome = slot.unwrap_or_else(|| {
                Err(SubQueryError::Panicked("task finished without an outcome".to_string()))
            });
            (query, outcome)
        });
        join_all_or_fail(outcomes)
    }

    fn run_guarded(&self, query: SubQuery, request: &SearchRequest<'_>) -> Outcome {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_sub_query(query, request)))
            .unwrap_or_else(|payload| Err(SubQueryError::Panicked(panic_message(payload.as_ref()))))
    }

    fn run_sub_query(&self, query: SubQuery, request: &SearchRequest<'_>) -> Outcome {
        let candidates = self.candidates_for(query, request)?;
        let eligible: Vec<SearchResult> = candidates
            .iter()
            .filter(|record| request.admits(record))
            .map(SearchResult::from)
            .collect();

        debug!(
            sub_query = %query,
            candidates = candidates.len(),
            eligible = eligible.len(),
            "Sub-query complete"
        );
        Ok(eligible)
    }

    fn candidates_for(
        &self,
        query: SubQuery,
        request: &SearchRequest<'_>,
    ) -> std::result::Result<Vec<RestaurantRecord>, SubQueryError> {
        let deadline = &request.deadline;
        let text = request.query;
        match query {
            SubQuery::Name => {
                deadline.check("find_by_name_exact")?;
                Ok(self.store.find_by_name_exact(text)?)
            }
            SubQuery::Attributes => {
                deadline.check("find_by_attributes")?;
                Ok(self.store.find_by_attributes(text)?)
            }
            SubQuery::ItemAttributes => {
                deadline.check("find_items_by_attributes")?;
                let item_ids: Vec<String> = self
                    .store
                    .find_items_by_attributes(text)?
                    .into_iter()
                    .map(|item| item.item_id)
                    .unique()
                    .collect();
                if item_ids.is_empty() {
                    return Ok(Vec::new());
                }
                deadline.check("find_menus_by_item_ids")?;
                let menus = self.store.find_menus_by_item_ids(&item_ids)?;
                self.resolve_owners(menus, deadline)
            }
            SubQuery::ItemName => {
                deadline.check("find_menus_by_item_name")?;
                let menus = self.store.find_menus_by_item_name(text)?;
                self.resolve_owners(menus, deadline)
            }
        }
    }

    /// Look up the restaurant behind each menu, once per restaurant id.
    fn resolve_owners(
        &self,
        menus: Vec<MenuRecord>,
        deadline: &Deadline,
    ) -> std::result::Result<Vec<RestaurantRecord>, SubQueryError> {
        let mut seen = AHashSet::with_capacity(menus.len());
        let mut owners = Vec::with_capacity(menus.len());
        for menu in menus {
            if !seen.insert(menu.restaurant_id.clone()) {
                continue;
            }
            deadline.check("find_by_id")?;
            match self.store.find_by_id(&menu.restaurant_id)? {
                Some(record) => owners.push(record),
                None => debug!(
                    restaurant_id = %menu.restaurant_id,
                    "Menu refers to a missing restaurant, skipping"
                ),
            }
        }
        Ok(owners)
    }

    /// Stop the worker pool. Dropping the orchestrator has the same effect.
    pub fn shutdown(self) {
        debug!("Shutting down sub-query worker pool");
        drop(self.pool);
    }
}

/// All outcomes succeeded, or every failure together. Never a partial list.
fn join_all_or_fail(
    outcomes: impl IntoIterator<Item = (SubQuery, Outcome)>,
) -> Result<Vec<Vec<SearchResult>>> {
    let (batches, failures): (Vec<_>, Vec<_>) =
        outcomes
            .into_iter()
            .partition_map(|(query, outcome)| match outcome {
                Ok(batch) => Either::Left(batch),
                Err(error) => Either::Right(SubQueryFailure { query, error }),
            });

    if failures.is_empty() {
        Ok(batches)
    } else {
        let failed = failures.iter().map(|f| f.query).join(", ");
        warn!(%failed, "Sub-queries failed, discarding partial results");
        Err(SearchError::SubQueriesFailed(failures))
    }
}

/// Concatenate batches keeping only the first result per restaurant id.
pub fn merge_unique(batches: impl IntoIterator<Item = Vec<SearchResult>>) -> Vec<SearchResult> {
    let mut seen = BTreeSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|result| seen.insert(result.restaurant_id.clone()))
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
