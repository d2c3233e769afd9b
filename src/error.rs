//! Error types for the tour planning pipeline.

use thiserror::Error;

/// Failure reported by a [`DistanceProvider`](crate::distance::DistanceProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("routing service answered with status {0}")]
    Status(u16),

    #[error("malformed distance response: {0}")]
    Malformed(String),
}

/// Everything that can go wrong between waypoints and a finished route.
#[derive(Debug, Error)]
pub enum TourError {
    /// A pairwise distance query failed. The whole matrix build is aborted.
    #[error("distance between waypoints {from} and {to} unavailable: {source}")]
    DistanceUnavailable {
        from: usize,
        to: usize,
        #[source]
        source: ProviderError,
    },

    #[error("need at least 2 waypoints to plan a tour, got {count}")]
    DegenerateInput { count: usize },

    #[error("internal consistency violated: {0}")]
    InternalConsistency(String),

    #[error("distance matrix has no entry for pair ({i}, {j})")]
    MissingDistance { i: usize, j: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, TourError>;
