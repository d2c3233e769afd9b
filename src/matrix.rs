use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::cancel::CancellationToken;
use crate::config::MatrixConfig;
use crate::distance::DistanceProvider;
use crate::error::{ProviderError, Result, TourError};
use crate::model::{DistanceMatrix, Waypoint};

/// Builds the complete pairwise distance matrix for a waypoint sequence.
///
/// Each unordered pair `(i, j)` with `i < j` is queried exactly once. Queries
/// are independent and run on a rayon pool; the first failure aborts the
/// build so a partial matrix never escapes.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrixBuilder {
    config: MatrixConfig,
}

impl DistanceMatrixBuilder {
    pub fn new(config: MatrixConfig) -> Self {
        Self { config }
    }

    pub fn build<P>(
        &self,
        waypoints: &[Waypoint],
        provider: &P,
        cancel: &CancellationToken,
    ) -> Result<DistanceMatrix>
    where
        P: DistanceProvider + ?Sized,
    {
        let n = waypoints.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        info!("Querying {} pairwise distances for {} waypoints", pairs.len(), n);

        let query_all = || {
            pairs
                .par_iter()
                .map(|&(i, j)| query_pair(waypoints, provider, cancel, i, j))
                .collect::<Result<Vec<_>>>()
        };

        let distances = match self.config.workers {
            Some(workers) => ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| TourError::InvalidConfig(format!("matrix worker pool: {}", e)))?
                .install(query_all)?,
            None => query_all()?,
        };

        let mut matrix = DistanceMatrix::new(n);
        for (i, j, d) in distances {
            if matrix.insert(i, j, d).is_some() {
                return Err(TourError::InternalConsistency(format!(
                    "pair ({}, {}) queried twice",
                    i, j
                )));
            }
        }

        if !matrix.is_complete() {
            return Err(TourError::InternalConsistency(format!(
                "matrix holds {} of {} pairs",
                matrix.len(),
                DistanceMatrix::pair_count(n)
            )));
        }

        info!("Pairwise distance calculation done");
        Ok(matrix)
    }
}

fn query_pair<P>(
    waypoints: &[Waypoint],
    provider: &P,
    cancel: &CancellationToken,
    i: usize,
    j: usize,
) -> Result<(usize, usize, f64)>
where
    P: DistanceProvider + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(TourError::Cancelled);
    }

    let (from, to) = (&waypoints[i], &waypoints[j]);
    let unavailable = move |source: ProviderError| TourError::DistanceUnavailable { from: i, to: j, source };

    let d = provider
        .distance(from.longitude, from.latitude, to.longitude, to.latitude)
        .map_err(unavailable)?;
    if !d.is_finite() || d < 0.0 {
        return Err(unavailable(ProviderError::Malformed(format!(
            "distance {} is not a non-negative number",
            d
        ))));
    }

    debug!("{} -> {}: {:.1}", from.name, to.name, d);
    Ok((i, j, d))
}
