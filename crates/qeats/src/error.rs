use thiserror::Error;

#[derive(Error, Debug)]
pub enum QeatsError {
    #[error("Search error: {0}")]
    SearchError(#[from] crate::search::SearchError),
    #[error("Store error: {0}")]
    Store(#[from] qeats_store::StoreError),
    #[error("Geo error: {0}")]
    Geo(#[from] crate::geo::GeoError),
    #[error("Serving policy error: {0}")]
    Policy(#[from] crate::policy::PolicyError),
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QeatsError {
    /// The underlying search error, if this is one.
    pub const fn as_search(&self) -> Option<&crate::search::SearchError> {
        match self {
            Self::SearchError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<qeats_store::LocationError> for QeatsError {
    fn from(e: qeats_store::LocationError) -> Self {
        Self::SearchError(e.into())
    }
}

pub type Result<T> = std::result::Result<T, QeatsError>;
