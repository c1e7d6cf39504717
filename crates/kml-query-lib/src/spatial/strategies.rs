//! Distance calculation strategies
//!
//! Each strategy trades accuracy for speed differently. All of them take two
//! already-validated coordinates and return kilometers.

use crate::Coordinate;
use crate::utils::{EARTH_RADIUS_MEAN_KM, WGS84_A, WGS84_F};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Iteration cap for the Vincenty inverse solution
const VINCENTY_MAX_ITERATIONS: usize = 200;

/// Convergence threshold for the Vincenty lambda iteration (radians)
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// Below this distance the adaptive strategy uses the flat-earth approximation
const ADAPTIVE_SHORT_KM: f64 = 50.0;

/// Above this distance the adaptive strategy switches to Vincenty when asked for accuracy
const ADAPTIVE_LONG_KM: f64 = 10_000.0;

/// A way of measuring the distance between two coordinates
pub trait DistanceStrategy: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Distance in kilometers
    fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> f64;
}

/// Selects one of the built-in strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrategyKind {
    #[default]
    Haversine,
    Vincenty,
    Euclidean,
    Adaptive {
        high_accuracy: bool,
    },
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn DistanceStrategy> {
        match self {
            StrategyKind::Haversine => Box::new(Haversine),
            StrategyKind::Vincenty => Box::new(Vincenty),
            StrategyKind::Euclidean => Box::new(Euclidean),
            StrategyKind::Adaptive { high_accuracy } => Box::new(Adaptive { high_accuracy }),
        }
    }
}

/// Great-circle distance on a sphere of mean Earth radius
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DistanceStrategy for Haversine {
    fn name(&self) -> &'static str {
        "haversine"
    }

    fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        haversine_km(from, to)
    }
}

/// Calculate the haversine distance in kilometers between two coordinates
#[inline]
pub fn haversine_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` marginally above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MEAN_KM * c
}

/// Vincenty inverse formula on the WGS84 ellipsoid
///
/// Accurate to well under a millimeter, but iterative. Nearly antipodal points may
/// not converge; those fall back to haversine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vincenty;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DistanceStrategy for Vincenty {
    fn name(&self) -> &'static str {
        "vincenty"
    }

    fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        match vincenty_km(from, to) {
            Some(distance) => distance,
            None => {
                tracing::debug!(
                    "Vincenty did not converge for {} -> {}, using haversine",
                    from,
                    to
                );
                haversine_km(from, to)
            }
        }
    }
}

/// Vincenty inverse solution, `None` when the iteration fails to converge
pub fn vincenty_km(from: &Coordinate, to: &Coordinate) -> Option<f64> {
    let a = WGS84_A;
    let f = WGS84_F;
    let b = (1.0 - f) * a;

    let l = (to.longitude() - from.longitude()).to_radians();
    let u1 = ((1.0 - f) * from.latitude().to_radians().tan()).atan();
    let u2 = ((1.0 - f) * to.latitude().to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut converged = false;
    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos_sq_alpha = 0.0;
    let mut cos_2sigma_m = 0.0;

    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points
            return Some(0.0);
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha.powi(2);
        // Equatorial line: cos_sq_alpha is 0
        cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));
        if (lambda - previous).abs() < VINCENTY_TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        return None;
    }

    let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma.powi(2))
                        * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));

    let meters = b * big_a * (sigma - delta_sigma);
    Some(meters / 1000.0)
}

/// Equirectangular approximation, fast and good enough for short distances
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DistanceStrategy for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        let mean_lat = ((from.latitude() + to.latitude()) / 2.0).to_radians();
        let mut delta_lon = to.longitude() - from.longitude();
        // Take the short way around the antimeridian
        if delta_lon > 180.0 {
            delta_lon -= 360.0;
        } else if delta_lon < -180.0 {
            delta_lon += 360.0;
        }
        let x = delta_lon.to_radians() * mean_lat.cos();
        let y = (to.latitude() - from.latitude()).to_radians();
        EARTH_RADIUS_MEAN_KM * (x * x + y * y).sqrt()
    }
}

/// Picks a strategy from a quick haversine estimate of the distance
#[derive(Debug, Clone, Copy, Default)]
pub struct Adaptive {
    pub high_accuracy: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DistanceStrategy for Adaptive {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        let estimate = haversine_km(from, to);
        if estimate < ADAPTIVE_SHORT_KM {
            Euclidean.distance_km(from, to)
        } else if self.high_accuracy && estimate > ADAPTIVE_LONG_KM {
            Vincenty.distance_km(from, to)
        } else {
            estimate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat, 0.0).unwrap()
    }

    #[test]
    fn test_haversine_one_degree_on_equator() {
        let d = haversine_km(&coord(0.0, 0.0), &coord(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let c = coord(12.5, 41.9);
        assert_eq!(haversine_km(&c, &c), 0.0);
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let d = haversine_km(&coord(0.0, 0.0), &coord(180.0, 0.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_MEAN_KM;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_vincenty_matches_reference() {
        // Flinders Peak to Buninyong, classic reference pair: 54972.271 m
        let from = coord(144.424_867_888_9, -37.951_033_416_7);
        let to = coord(143.926_495_527_8, -37.652_821_138_9);
        let d = Vincenty.distance_km(&from, &to);
        assert!((d - 54.972_271).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_vincenty_coincident_points() {
        let c = coord(5.0, 5.0);
        assert_eq!(vincenty_km(&c, &c), Some(0.0));
    }

    #[test]
    fn test_vincenty_antipodal_falls_back() {
        let d = Vincenty.distance_km(&coord(0.0, 0.0), &coord(180.0, 0.0));
        assert!(d.is_finite());
        assert!(d > 19_000.0);
    }

    #[test]
    fn test_euclidean_close_to_haversine_for_short_distances() {
        let a = coord(2.35, 48.85);
        let b = coord(2.36, 48.86);
        let diff = (Euclidean.distance_km(&a, &b) - haversine_km(&a, &b)).abs();
        assert!(diff < 1e-3);
    }

    #[test]
    fn test_euclidean_wraps_antimeridian() {
        let d = Euclidean.distance_km(&coord(179.9, 0.0), &coord(-179.9, 0.0));
        assert!(d < 30.0);
    }

    #[test]
    fn test_adaptive_selects_by_distance() {
        let adaptive = Adaptive {
            high_accuracy: true,
        };
        let a = coord(0.0, 0.0);
        let near = coord(0.1, 0.0);
        let far = coord(100.0, 10.0);
        assert_eq!(
            adaptive.distance_km(&a, &near),
            Euclidean.distance_km(&a, &near)
        );
        assert_eq!(adaptive.distance_km(&a, &far), Vincenty.distance_km(&a, &far));
    }

    #[test]
    fn test_strategy_kind_build() {
        assert_eq!(StrategyKind::default().build().name(), "haversine");
        assert_eq!(StrategyKind::Vincenty.build().name(), "vincenty");
        assert_eq!(
            StrategyKind::Adaptive {
                high_accuracy: false
            }
            .build()
            .name(),
            "adaptive"
        );
    }
}
