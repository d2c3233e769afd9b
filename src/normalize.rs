use crate::error::{Result, TourError};
use crate::model::Route;

/// Anchors a tour at `origin` and closes the loop.
///
/// The tour is rotated, never reordered: stops before the origin move to the
/// end in their original order, so every edge of the cycle survives and the
/// route has the same length the optimizer scored. The origin is appended
/// once more at the end, e.g. `[2, 0, 1, 3]` becomes `[0, 1, 3, 2, 0]`.
pub fn normalize_tour(tour: &[usize], origin: usize) -> Result<Route> {
    let start = tour.iter().position(|&stop| stop == origin).ok_or_else(|| {
        TourError::InternalConsistency(format!("origin {} not found in tour {:?}", origin, tour))
    })?;

    let mut stops = Vec::with_capacity(tour.len() + 1);
    stops.extend_from_slice(&tour[start..]);
    stops.extend_from_slice(&tour[..start]);
    stops.push(origin);

    Ok(Route::from_closed(stops))
}
