//! Geospatial calculations
//!
//! Distances, bearings, midpoints and bounding boxes over anything that can expose a
//! [`Coordinate`]. Element methods and query set predicates use the default
//! configuration (haversine, kilometers); [`SpatialCalculator`] is the configurable
//! entry point.

mod calculations;
mod strategies;

pub use calculations::{
    SpatialCalculator, bearing_degrees, bounding_box, distance_km, interpolate_coordinates,
    midpoint,
};
pub use strategies::{
    Adaptive, DistanceStrategy, Euclidean, Haversine, StrategyKind, Vincenty, haversine_km,
    vincenty_km,
};

use crate::{Coordinate, Handle, utils};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unit used when reporting distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistanceUnit {
    Meters,
    #[default]
    Kilometers,
    Miles,
    NauticalMiles,
    Feet,
    Yards,
}

impl DistanceUnit {
    /// Multiplier converting kilometers into this unit
    #[inline]
    pub fn per_kilometer(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1000.0,
            DistanceUnit::Kilometers => 1.0,
            DistanceUnit::Miles => 0.621371,
            DistanceUnit::NauticalMiles => 0.539957,
            DistanceUnit::Feet => 3280.84,
            DistanceUnit::Yards => 1093.61,
        }
    }

    #[inline]
    pub fn from_km(self, km: f64) -> f64 {
        km * self.per_kilometer()
    }

    #[inline]
    pub fn to_km(self, value: f64) -> f64 {
        value / self.per_kilometer()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::NauticalMiles => "nmi",
            DistanceUnit::Feet => "ft",
            DistanceUnit::Yards => "yd",
        }
    }
}

/// Configuration for a [`SpatialCalculator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialConfig {
    /// Distance algorithm
    pub strategy: StrategyKind,
    /// Unit distances are reported in
    pub unit: DistanceUnit,
}

/// Anything that may carry a geographic position
///
/// Elements, coordinates and raw `(lon, lat)` pairs all implement this, so every
/// spatial helper accepts them interchangeably. Returning `None` means "no usable
/// position", which spatial helpers turn into a `None` result rather than an error.
pub trait HasCoordinates {
    fn get_coordinates(&self) -> Option<Coordinate>;
}

impl HasCoordinates for Coordinate {
    #[inline]
    fn get_coordinates(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

impl HasCoordinates for Option<Coordinate> {
    #[inline]
    fn get_coordinates(&self) -> Option<Coordinate> {
        *self
    }
}

impl HasCoordinates for (f64, f64) {
    fn get_coordinates(&self) -> Option<Coordinate> {
        raw_pair(self.0, self.1)
    }
}

/// Raw sequences only count as a position when they hold exactly `(lon, lat)`
impl HasCoordinates for [f64] {
    fn get_coordinates(&self) -> Option<Coordinate> {
        match *self {
            [lon, lat] => raw_pair(lon, lat),
            _ => {
                tracing::debug!(
                    "Ignoring coordinate sequence of length {} (expected 2)",
                    self.len()
                );
                None
            }
        }
    }
}

impl<const N: usize> HasCoordinates for [f64; N] {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.as_slice().get_coordinates()
    }
}

impl HasCoordinates for Vec<f64> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.as_slice().get_coordinates()
    }
}

impl<T: HasCoordinates + ?Sized> HasCoordinates for &T {
    #[inline]
    fn get_coordinates(&self) -> Option<Coordinate> {
        (**self).get_coordinates()
    }
}

impl<T: HasCoordinates> HasCoordinates for Handle<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.borrow().get_coordinates()
    }
}

fn raw_pair(lon: f64, lat: f64) -> Option<Coordinate> {
    if utils::is_valid_longitude(lon) && utils::is_valid_latitude(lat) {
        Coordinate::new(lon, lat, 0.0).ok()
    } else {
        tracing::warn!("Skipping out-of-range coordinate pair ({}, {})", lon, lat);
        None
    }
}
