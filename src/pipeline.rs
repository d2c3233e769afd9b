use log::info;
use rand::Rng;

use crate::cancel::CancellationToken;
use crate::config::{MatrixConfig, OptimizerConfig, Problem};
use crate::distance::DistanceProvider;
use crate::error::{Result, TourError};
use crate::matrix::DistanceMatrixBuilder;
use crate::model::{DistanceMatrix, Route, Waypoint};
use crate::normalize::normalize_tour;
use crate::optimizer::{StopReason, TourOptimizer};

/// The first waypoint supplied is always the start and end of the route.
pub const ORIGIN: usize = 0;

/// Result of a full planning run.
#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub route: Route,
    pub distance: f64,
    pub generations: usize,
    pub stop_reason: StopReason,
    pub matrix: DistanceMatrix,
}

impl PlannedRoute {
    /// Waypoints in visiting order, origin first and last.
    pub fn ordered_waypoints<'a>(&self, waypoints: &'a [Waypoint]) -> Vec<&'a Waypoint> {
        self.route.waypoints(waypoints)
    }
}

/// Waypoints in, closed origin-anchored route out.
#[derive(Debug, Clone)]
pub struct TourPlanner {
    matrix_builder: DistanceMatrixBuilder,
    optimizer: TourOptimizer,
}

impl TourPlanner {
    pub fn new(optimizer: OptimizerConfig, matrix: MatrixConfig) -> Result<Self> {
        Ok(Self {
            matrix_builder: DistanceMatrixBuilder::new(matrix),
            optimizer: TourOptimizer::new(optimizer)?,
        })
    }

    pub fn from_problem(problem: &Problem) -> Result<Self> {
        Self::new(problem.optimizer.clone(), problem.matrix.clone())
    }

    pub fn plan<P, R>(
        &self,
        waypoints: &[Waypoint],
        provider: &P,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<PlannedRoute>
    where
        P: DistanceProvider + ?Sized,
        R: Rng,
    {
        if waypoints.len() < 2 {
            return Err(TourError::DegenerateInput { count: waypoints.len() });
        }

        info!("Planning tour over {} waypoints from {}", waypoints.len(), waypoints[ORIGIN].name);

        let matrix = self.matrix_builder.build(waypoints, provider, cancel)?;
        let best = self.optimizer.optimize(&matrix, rng, cancel)?;
        let route = normalize_tour(&best.tour, ORIGIN)?;

        info!("Best tour: {:?}, distance {:.2}", route.stops(), best.distance);

        Ok(PlannedRoute {
            route,
            distance: best.distance,
            generations: best.generations,
            stop_reason: best.stop_reason,
            matrix,
        })
    }
}
