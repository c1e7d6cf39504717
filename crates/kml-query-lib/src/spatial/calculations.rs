//! Spatial calculations over [`HasCoordinates`] values

use super::strategies::{DistanceStrategy, haversine_km};
use super::{DistanceUnit, HasCoordinates, SpatialConfig};
use crate::{Coordinate, KmlError, Result, utils};
use geo::Rect;

/// Haversine distance in kilometers, `None` when either side lacks coordinates
pub fn distance_km<A, B>(from: &A, to: &B) -> Option<f64>
where
    A: HasCoordinates + ?Sized,
    B: HasCoordinates + ?Sized,
{
    let (from, to) = endpoints(from, to)?;
    Some(haversine_km(&from, &to))
}

/// Initial great-circle bearing in degrees `[0, 360)`, clockwise from true north
pub fn bearing_degrees<A, B>(from: &A, to: &B) -> Option<f64>
where
    A: HasCoordinates + ?Sized,
    B: HasCoordinates + ?Sized,
{
    let (from, to) = endpoints(from, to)?;
    Some(initial_bearing(&from, &to))
}

/// Great-circle midpoint, altitude is the mean of both altitudes
pub fn midpoint<A, B>(from: &A, to: &B) -> Option<Coordinate>
where
    A: HasCoordinates + ?Sized,
    B: HasCoordinates + ?Sized,
{
    let (from, to) = endpoints(from, to)?;
    Some(interpolate_coordinates(&from, &to, 0.5))
}

/// Bounding box over every input that has coordinates, `None` if none does
///
/// The box is returned as a [`Rect`] with `x` = longitude and `y` = latitude.
pub fn bounding_box<I>(objects: I) -> Option<Rect<f64>>
where
    I: IntoIterator,
    I::Item: HasCoordinates,
{
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut found = false;

    for coordinate in objects.into_iter().filter_map(|o| o.get_coordinates()) {
        min_x = min_x.min(coordinate.longitude());
        min_y = min_y.min(coordinate.latitude());
        max_x = max_x.max(coordinate.longitude());
        max_y = max_y.max(coordinate.latitude());
        found = true;
    }

    found.then(|| {
        Rect::new(
            geo::Coord { x: min_x, y: min_y },
            geo::Coord { x: max_x, y: max_y },
        )
    })
}

/// Point at `fraction` of the way along the great circle from `from` to `to`
///
/// `fraction` is not range checked here; callers validate it.
pub fn interpolate_coordinates(from: &Coordinate, to: &Coordinate, fraction: f64) -> Coordinate {
    let lat1 = from.latitude().to_radians();
    let lon1 = from.longitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let lon2 = to.longitude().to_radians();
    let altitude = from.altitude() + (to.altitude() - from.altitude()) * fraction;

    let angular = haversine_km(from, to) / utils::EARTH_RADIUS_MEAN_KM;
    if angular == 0.0 {
        return Coordinate::clamped(from.longitude(), from.latitude(), altitude);
    }

    let sin_angular = angular.sin();
    let a = ((1.0 - fraction) * angular).sin() / sin_angular;
    let b = (fraction * angular).sin() / sin_angular;

    let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
    let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    let lon = y.atan2(x).to_degrees();
    Coordinate::clamped(lon, lat, altitude)
}

fn initial_bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    utils::normalize_bearing(x.atan2(y).to_degrees())
}

fn endpoints<A, B>(from: &A, to: &B) -> Option<(Coordinate, Coordinate)>
where
    A: HasCoordinates + ?Sized,
    B: HasCoordinates + ?Sized,
{
    match (from.get_coordinates(), to.get_coordinates()) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => {
            tracing::debug!("Spatial calculation skipped: an endpoint has no coordinates");
            None
        }
    }
}

/// Configurable spatial calculator
///
/// Distances are computed with the configured strategy and reported in the configured
/// unit. Bearings and midpoints are always great-circle.
#[derive(Debug)]
pub struct SpatialCalculator {
    config: SpatialConfig,
    strategy: Box<dyn DistanceStrategy>,
}

impl Default for SpatialCalculator {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialCalculator {
    pub fn new(config: SpatialConfig) -> Self {
        Self {
            config,
            strategy: config.strategy.build(),
        }
    }

    /// Use a custom strategy instead of one of the built-in kinds
    pub fn with_strategy(unit: DistanceUnit, strategy: Box<dyn DistanceStrategy>) -> Self {
        Self {
            config: SpatialConfig {
                unit,
                ..SpatialConfig::default()
            },
            strategy,
        }
    }

    #[inline]
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Distance in the configured unit, `None` when either side lacks coordinates
    pub fn distance_between<A, B>(&self, from: &A, to: &B) -> Option<f64>
    where
        A: HasCoordinates + ?Sized,
        B: HasCoordinates + ?Sized,
    {
        let (from, to) = endpoints(from, to)?;
        let km = self.strategy.distance_km(&from, &to);
        Some(self.config.unit.from_km(km))
    }

    pub fn bearing_between<A, B>(&self, from: &A, to: &B) -> Option<f64>
    where
        A: HasCoordinates + ?Sized,
        B: HasCoordinates + ?Sized,
    {
        bearing_degrees(from, to)
    }

    pub fn midpoint<A, B>(&self, from: &A, to: &B) -> Option<Coordinate>
    where
        A: HasCoordinates + ?Sized,
        B: HasCoordinates + ?Sized,
    {
        midpoint(from, to)
    }

    /// Distance from one origin to each target, in target order
    ///
    /// Targets without coordinates yield `None` in their slot.
    pub fn distances_to_many<A, I>(&self, from: &A, targets: I) -> Vec<Option<f64>>
    where
        A: HasCoordinates + ?Sized,
        I: IntoIterator,
        I::Item: HasCoordinates,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("spatial::distances_to_many");
        let origin = from.get_coordinates();
        targets
            .into_iter()
            .map(|target| self.distance_between(&origin, &target))
            .collect()
    }

    pub fn bounding_box<I>(&self, objects: I) -> Option<Rect<f64>>
    where
        I: IntoIterator,
        I::Item: HasCoordinates,
    {
        bounding_box(objects)
    }

    /// Point at `fraction` of the way from `from` to `to`
    ///
    /// # Errors
    /// [`KmlError::Usage`] when `fraction` is outside `[0, 1]`.
    pub fn interpolate<A, B>(&self, from: &A, to: &B, fraction: f64) -> Result<Option<Coordinate>>
    where
        A: HasCoordinates + ?Sized,
        B: HasCoordinates + ?Sized,
    {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(KmlError::Usage(format!(
                "fraction must be between 0 and 1, got {fraction}"
            )));
        }
        Ok(endpoints(from, to).map(|(from, to)| interpolate_coordinates(&from, &to, fraction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::spatial::StrategyKind;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat, 0.0).unwrap()
    }

    #[test]
    fn test_distance_km_with_tuples() {
        let d = distance_km(&(0.0, 0.0), &(1.0, 0.0)).unwrap();
        assert!((d - 111.32).abs() / 111.32 < 0.01);
    }

    #[test]
    fn test_distance_missing_endpoint() {
        assert!(distance_km(&coord(0.0, 0.0), &[1.0, 2.0, 3.0]).is_none());
        assert!(distance_km(&None::<Coordinate>, &coord(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = coord(0.0, 0.0);
        let east = bearing_degrees(&origin, &coord(1.0, 0.0)).unwrap();
        let north = bearing_degrees(&origin, &coord(0.0, 1.0)).unwrap();
        let west = bearing_degrees(&origin, &coord(-1.0, 0.0)).unwrap();
        let south = bearing_degrees(&origin, &coord(0.0, -1.0)).unwrap();
        assert!((east - 90.0).abs() < 1e-9);
        assert!(north.abs() < 1e-9);
        assert!((west - 270.0).abs() < 1e-9);
        assert!((south - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_midpoint_on_equator() {
        let mid = midpoint(&coord(0.0, 0.0), &coord(10.0, 0.0)).unwrap();
        assert!((mid.longitude() - 5.0).abs() < 1e-9);
        assert!(mid.latitude().abs() < 1e-9);
    }

    #[test]
    fn test_midpoint_of_same_point() {
        let c = coord(7.0, 8.0);
        let mid = midpoint(&c, &c).unwrap();
        assert_eq!(mid.longitude(), 7.0);
        assert_eq!(mid.latitude(), 8.0);
    }

    #[test]
    fn test_bounding_box_skips_missing() {
        let items = vec![Some(coord(1.0, 5.0)), None, Some(coord(-3.0, 2.0))];
        let rect = bounding_box(items).unwrap();
        assert_eq!(rect.min().x, -3.0);
        assert_eq!(rect.min().y, 2.0);
        assert_eq!(rect.max().x, 1.0);
        assert_eq!(rect.max().y, 5.0);
        assert!(bounding_box(Vec::<Coordinate>::new()).is_none());
    }

    #[test]
    fn test_calculator_units() {
        let calculator = SpatialCalculator::new(SpatialConfig {
            strategy: StrategyKind::Haversine,
            unit: DistanceUnit::Meters,
        });
        let m = calculator
            .distance_between(&coord(0.0, 0.0), &coord(1.0, 0.0))
            .unwrap();
        assert!((m - 111_195.0).abs() < 10.0);
        assert_eq!(calculator.strategy_name(), "haversine");
    }

    #[test]
    fn test_distances_to_many() {
        let calculator = SpatialCalculator::default();
        let targets = vec![Some(coord(0.0, 0.0)), None, Some(coord(0.0, 1.0))];
        let distances = calculator.distances_to_many(&coord(0.0, 0.0), targets);
        assert_eq!(distances.len(), 3);
        assert_eq!(distances[0], Some(0.0));
        assert!(distances[1].is_none());
        assert!(distances[2].unwrap() > 110.0);
    }

    #[test]
    fn test_interpolate_bounds() {
        let calculator = SpatialCalculator::default();
        let a = coord(0.0, 0.0);
        let b = coord(10.0, 0.0);
        let start = calculator.interpolate(&a, &b, 0.0).unwrap().unwrap();
        let end = calculator.interpolate(&a, &b, 1.0).unwrap().unwrap();
        assert!(start.longitude().abs() < 1e-9);
        assert!((end.longitude() - 10.0).abs() < 1e-9);

        let err = calculator.interpolate(&a, &b, 1.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
