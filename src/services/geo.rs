//! Geographic calculations

use crate::types::Coordinates;

/// Mean Earth radius (WGS84) in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push 1 - a below zero for antipodal points
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Dense symmetric distance matrix in kilometers, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Build from points; only the upper triangle is computed
    pub fn from_points(points: &[Coordinates]) -> Self {
        let n = points.len();
        let mut matrix = Self {
            size: n,
            values: vec![0.0; n * n],
        };

        for i in 0..n {
            for j in i + 1..n {
                let d = haversine_distance(&points[i], &points[j]);
                matrix.values[i * n + j] = d;
                matrix.values[j * n + i] = d;
            }
        }

        matrix
    }

    /// Number of locations
    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance from location i to location j in kilometers
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from * self.size + to]
    }

    /// Check that every entry is a finite, non-negative number
    pub fn is_well_formed(&self) -> bool {
        self.values.iter().all(|d| d.is_finite() && *d >= 0.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn coordinates() -> impl Strategy<Value = Coordinates> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinates { lat, lng })
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(a in coordinates(), b in coordinates()) {
            prop_assert!((haversine_distance(&a, &b) - haversine_distance(&b, &a)).abs() < 1e-9);
        }

        #[test]
        fn haversine_to_self_is_zero(a in coordinates()) {
            prop_assert_eq!(haversine_distance(&a, &a), 0.0);
        }

        #[test]
        fn matrix_is_symmetric_with_zero_diagonal(points in prop::collection::vec(coordinates(), 0..12)) {
            let matrix = DistanceMatrix::from_points(&points);
            prop_assert!(matrix.is_well_formed());
            for i in 0..matrix.size() {
                prop_assert_eq!(matrix.get(i, i), 0.0);
                for j in 0..matrix.size() {
                    prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                }
            }
        }
    }
}
