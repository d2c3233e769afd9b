use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TourError};

// =================== WAYPOINTS ===================

/// A named geographic point to visit. Identity is its position in the
/// sequence handed to the planner; position 0 is the origin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,  // WGS84 degrees
    pub longitude: f64, // WGS84 degrees
    pub name: String,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
        }
    }
}

/// Visiting order before anchoring: a permutation of `0..n`.
pub type Tour = Vec<usize>;

// =================== DISTANCE MATRIX ===================

/// Pairwise travel distances keyed by unordered index pair.
///
/// Only `(i, j)` with `i < j` is stored; lookups in either direction hit the
/// same entry, so the matrix is symmetric by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMatrix {
    size: usize,                          // Number of waypoints covered
    entries: HashMap<(usize, usize), f64>, // (low, high) -> distance
}

impl DistanceMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            entries: HashMap::with_capacity(Self::pair_count(size)),
        }
    }

    /// Number of unordered pairs among `size` waypoints.
    pub fn pair_count(size: usize) -> usize {
        size * size.saturating_sub(1) / 2
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores a distance, returning the previous value for the pair if any.
    pub fn insert(&mut self, i: usize, j: usize, distance: f64) -> Option<f64> {
        self.entries.insert(Self::key(i, j), distance)
    }

    /// Distance between two waypoints. The diagonal is always zero.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i == j {
            return (i < self.size).then_some(0.0);
        }
        self.entries.get(&Self::key(i, j)).copied()
    }

    /// True when every unordered pair among `size` waypoints has an entry.
    pub fn is_complete(&self) -> bool {
        self.entries.len() == Self::pair_count(self.size)
            && self
                .entries
                .keys()
                .all(|&(i, j)| i < j && j < self.size)
    }

    pub fn entries(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.entries.iter().map(|(&pair, &d)| (pair, d))
    }

    /// Expands the pair map into a dense row-major table for fast lookups.
    ///
    /// Fails on the first pair without an entry; a gap is never read as zero.
    pub fn to_dense(&self) -> Result<Vec<Vec<f64>>> {
        let mut table = vec![vec![0.0; self.size]; self.size];
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let d = self
                    .entries
                    .get(&(i, j))
                    .copied()
                    .ok_or(TourError::MissingDistance { i, j })?;
                table[i][j] = d;
                table[j][i] = d;
            }
        }
        Ok(table)
    }

    fn key(i: usize, j: usize) -> (usize, usize) {
        if i < j { (i, j) } else { (j, i) }
    }
}

// =================== ROUTE ===================

/// Origin-anchored, cycle-closed visiting order of length `n + 1`.
///
/// Built by [`normalize_tour`](crate::normalize::normalize_tour); the first
/// and last stop are both the origin.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Route {
    stops: Vec<usize>,
}

impl Route {
    pub(crate) fn from_closed(stops: Vec<usize>) -> Self {
        Self { stops }
    }

    /// All stops including the closing return to the origin.
    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    /// Stops without the closing duplicate, i.e. the anchored tour.
    pub fn open(&self) -> &[usize] {
        &self.stops[..self.stops.len().saturating_sub(1)]
    }

    pub fn origin(&self) -> Option<usize> {
        self.stops.first().copied()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Consecutive `(from, to)` pairs along the route.
    pub fn legs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.stops.windows(2).map(|w| (w[0], w[1]))
    }

    /// Resolves stop indices into the waypoints they refer to.
    pub fn waypoints<'a>(&self, waypoints: &'a [Waypoint]) -> Vec<&'a Waypoint> {
        self.stops.iter().filter_map(|&i| waypoints.get(i)).collect()
    }
}
