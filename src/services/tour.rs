//! Single-vehicle tour construction and improvement
//!
//! Routes are open paths over matrix indices with the depot (index 0)
//! fixed at position 0. There is no closing edge back to the depot.

use crate::services::geo::DistanceMatrix;

/// Default cap on full 2-opt scan passes
pub const DEFAULT_MAX_PASSES: usize = 1000;

/// Minimum gain for a 2-opt move to count as an improvement
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Outcome of a 2-opt run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TwoOptStats {
    /// Full scan passes executed
    pub passes: usize,
    /// Segment reversals applied
    pub moves: usize,
    /// Stopped at the pass cap while still improving
    pub hit_pass_limit: bool,
}

/// Nearest neighbor heuristic
///
/// Starts at `start` and repeatedly appends the closest unvisited location.
/// Ties go to the lowest index.
pub fn nearest_neighbor_route(matrix: &DistanceMatrix, start: usize) -> Vec<usize> {
    let n = matrix.size();
    if n == 0 {
        return vec![];
    }

    let mut route = Vec::with_capacity(n);
    let mut visited = vec![false; n];

    route.push(start);
    visited[start] = true;
    let mut current = start;

    while route.len() < n {
        let mut best_next = None;
        let mut best_dist = f64::INFINITY;

        for (candidate, &seen) in visited.iter().enumerate() {
            if seen {
                continue;
            }

            // Strict comparison keeps the lowest index on ties
            let dist = matrix.get(current, candidate);
            if best_next.is_none() || dist < best_dist {
                best_dist = dist;
                best_next = Some(candidate);
            }
        }

        match best_next {
            Some(next) => {
                route.push(next);
                visited[next] = true;
                current = next;
            }
            None => break,
        }
    }

    route
}

/// Rotate the route so `depot` is at position 0, keeping cyclic order
pub fn rotate_to_depot(route: &mut [usize], depot: usize) {
    if let Some(pos) = route.iter().position(|&idx| idx == depot) {
        route.rotate_left(pos);
    }
}

/// 2-opt local search improvement
///
/// Position 0 never moves. Reverses `route[i..=k]` for `1 <= i < k <= n - 2`
/// whenever doing so shortens the path by more than `IMPROVEMENT_EPSILON`.
/// Stops after a pass with no moves or after `max_passes` passes.
pub fn two_opt(route: &mut [usize], matrix: &DistanceMatrix, max_passes: usize) -> TwoOptStats {
    let mut stats = TwoOptStats::default();
    let n = route.len();
    if n < 4 {
        return stats;
    }

    let mut improved = true;
    while improved && stats.passes < max_passes {
        improved = false;
        stats.passes += 1;

        for i in 1..n - 2 {
            for k in i + 1..n - 1 {
                if would_improve(route, matrix, i, k) {
                    route[i..=k].reverse();
                    stats.moves += 1;
                    improved = true;
                }
            }
        }
    }

    stats.hit_pass_limit = improved;
    stats
}

/// Check if reversing route[i..=k] shortens the path
fn would_improve(route: &[usize], matrix: &DistanceMatrix, i: usize, k: usize) -> bool {
    let a = route[i - 1];
    let b = route[i];
    let c = route[k];
    let d = route[k + 1];

    let before = matrix.get(a, b) + matrix.get(c, d);
    let after = matrix.get(a, c) + matrix.get(b, d);

    after + IMPROVEMENT_EPSILON < before
}

/// Sum of consecutive edge distances along the open route
pub fn route_distance(matrix: &DistanceMatrix, route: &[usize]) -> f64 {
    route
        .windows(2)
        .map(|edge| matrix.get(edge[0], edge[1]))
        .sum()
}

/// Convert a distance to travel minutes; `None` unless the speed is positive and finite
pub fn travel_minutes(distance_km: f64, speed_kmph: f64) -> Option<f64> {
    if speed_kmph.is_finite() && speed_kmph > 0.0 {
        Some(distance_km / speed_kmph * 60.0)
    } else {
        None
    }
}

/// Check that the route visits every index exactly once, starting at `depot`
pub fn is_valid_route(route: &[usize], size: usize, depot: usize) -> bool {
    if route.len() != size {
        return false;
    }
    if size > 0 && route[0] != depot {
        return false;
    }

    let mut seen = vec![false; size];
    for &idx in route {
        if idx >= size || seen[idx] {
            return false;
        }
        seen[idx] = true;
    }
    true
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::Coordinates;
    use proptest::prelude::*;

    fn points() -> impl Strategy<Value = Vec<Coordinates>> {
        prop::collection::vec(
            (18.0f64..20.0, 72.0f64..74.0).prop_map(|(lat, lng)| Coordinates { lat, lng }),
            1..25,
        )
    }

    proptest! {
        #[test]
        fn seed_is_permutation_starting_at_depot(points in points()) {
            let matrix = DistanceMatrix::from_points(&points);
            let route = nearest_neighbor_route(&matrix, 0);
            prop_assert!(is_valid_route(&route, points.len(), 0));
        }

        #[test]
        fn two_opt_never_lengthens_route(points in points()) {
            let matrix = DistanceMatrix::from_points(&points);
            let seed = nearest_neighbor_route(&matrix, 0);
            let mut improved = seed.clone();
            two_opt(&mut improved, &matrix, DEFAULT_MAX_PASSES);

            prop_assert!(is_valid_route(&improved, points.len(), 0));
            prop_assert!(route_distance(&matrix, &improved) <= route_distance(&matrix, &seed) + 1e-9);
        }

        #[test]
        fn two_opt_converges(points in points()) {
            let matrix = DistanceMatrix::from_points(&points);
            let mut route = nearest_neighbor_route(&matrix, 0);
            let first = two_opt(&mut route, &matrix, DEFAULT_MAX_PASSES);
            prop_assume!(!first.hit_pass_limit);

            let converged = route.clone();
            let second = two_opt(&mut route, &matrix, DEFAULT_MAX_PASSES);
            prop_assert_eq!(second.moves, 0);
            prop_assert_eq!(route, converged);
        }

        #[test]
        fn pipeline_is_deterministic(points in points()) {
            let run = || {
                let matrix = DistanceMatrix::from_points(&points);
                let mut route = nearest_neighbor_route(&matrix, 0);
                two_opt(&mut route, &matrix, DEFAULT_MAX_PASSES);
                let distance = route_distance(&matrix, &route);
                (route, distance)
            };
            prop_assert_eq!(run(), run());
        }
    }
}
