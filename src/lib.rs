//! Closed visiting order over geographic waypoints.
//!
//! Waypoints flow through a pairwise [`DistanceMatrixBuilder`], a genetic
//! [`TourOptimizer`] and finally [`normalize_tour`], which anchors the best
//! tour at the origin (the first waypoint) and closes the loop.

pub mod cancel;
pub mod config;
pub mod distance;
pub mod error;
pub mod matrix;
pub mod model;
pub mod normalize;
pub mod optimizer;
pub mod pipeline;
pub mod report;

pub use cancel::CancellationToken;
pub use config::{read_problem, MatrixConfig, OptimizerConfig, Problem};
pub use distance::{BrouterProvider, DistanceProvider, HaversineProvider};
pub use error::{ProviderError, Result, TourError};
pub use matrix::DistanceMatrixBuilder;
pub use model::{DistanceMatrix, Route, Tour, Waypoint};
pub use normalize::normalize_tour;
pub use optimizer::{OptimizedTour, StopReason, TourOptimizer};
pub use pipeline::{PlannedRoute, TourPlanner, ORIGIN};
