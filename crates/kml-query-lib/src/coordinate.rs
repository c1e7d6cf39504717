//! Coordinate value type and the `"lon,lat[,alt]"` mini-format
//!
//! A [`Coordinate`] is validated eagerly: malformed input fails with
//! [`KmlError::InvalidCoordinates`], well-formed but out-of-range values fail with
//! [`KmlError::Validation`]. Nothing is ever clamped silently.

use crate::spatial::{self, HasCoordinates};
use crate::{KmlError, Result, utils};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees, with altitude in meters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
    altitude: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Coordinate {
    /// Create a validated coordinate
    ///
    /// # Errors
    /// [`KmlError::Validation`] when longitude is outside `[-180, 180]`, latitude is
    /// outside `[-90, 90]` or altitude is not finite.
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Result<Self> {
        let coordinate = Self {
            longitude,
            latitude,
            altitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Create a validated coordinate at altitude 0
    pub fn new_2d(longitude: f64, latitude: f64) -> Result<Self> {
        Self::new(longitude, latitude, 0.0)
    }

    /// Build a coordinate from computed values, folding them back into range
    pub(crate) fn clamped(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude: utils::normalize_longitude(longitude),
            latitude: latitude.clamp(utils::MIN_LATITUDE, utils::MAX_LATITUDE),
            altitude,
        }
    }

    /// Create a coordinate from 2 (lon, lat) or 3 (lon, lat, alt) components
    pub fn from_components(components: &[f64]) -> Result<Self> {
        match *components {
            [lon, lat] => Self::new(lon, lat, 0.0),
            [lon, lat, alt] => Self::new(lon, lat, alt),
            _ => Err(KmlError::invalid_coordinates(
                format!(
                    "expected (lon, lat[, alt]), got {} components",
                    components.len()
                ),
                Some(format!("{components:?}")),
            )),
        }
    }

    /// Parse the `"lon,lat[,alt]"` format; whitespace around each component is ignored
    pub fn parse(text: &str) -> Result<Self> {
        let components = text
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>().map_err(|_| {
                    KmlError::invalid_coordinates(
                        format!("could not parse '{text}': '{part}' is not numeric"),
                        Some(text.to_string()),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if components.len() < 2 {
            return Err(KmlError::invalid_coordinates(
                format!("could not parse '{text}': need at least longitude and latitude"),
                Some(text.to_string()),
            ));
        }
        Self::from_components(&components)
    }

    /// Interpret a dynamic value: a `"lon,lat[,alt]"` string or an array of numbers
    ///
    /// Array items may also be numeric strings. Any other shape is rejected with
    /// [`KmlError::InvalidCoordinates`].
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) => Self::parse(text),
            Value::Array(items) => {
                let components = items
                    .iter()
                    .map(|item| numeric_component(item, value))
                    .collect::<Result<Vec<f64>>>()?;
                if components.len() < 2 {
                    return Err(KmlError::invalid_coordinates(
                        "need at least longitude and latitude",
                        Some(value.to_string()),
                    ));
                }
                Self::from_components(&components)
            }
            Value::Object(map) => {
                let lon = map.get("longitude").and_then(Value::as_f64);
                let lat = map.get("latitude").and_then(Value::as_f64);
                let alt = map.get("altitude").and_then(Value::as_f64).unwrap_or(0.0);
                match (lon, lat) {
                    (Some(lon), Some(lat)) => Self::new(lon, lat, alt),
                    _ => Err(KmlError::invalid_coordinates(
                        "coordinate mapping needs numeric longitude and latitude",
                        Some(value.to_string()),
                    )),
                }
            }
            other => Err(KmlError::invalid_coordinates(
                "unsupported coordinate type; expected a string or a sequence",
                Some(other.to_string()),
            )),
        }
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// `(longitude, latitude, altitude)`
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.longitude, self.latitude, self.altitude)
    }

    /// Re-check the range invariants
    pub fn validate(&self) -> Result<()> {
        if !utils::is_valid_longitude(self.longitude) {
            return Err(KmlError::validation_field(
                format!(
                    "Invalid longitude: {}. Must be between -180.0 and 180.0",
                    self.longitude
                ),
                "longitude",
                utils::float_value(self.longitude),
            ));
        }
        if !utils::is_valid_latitude(self.latitude) {
            return Err(KmlError::validation_field(
                format!(
                    "Invalid latitude: {}. Must be between -90.0 and 90.0",
                    self.latitude
                ),
                "latitude",
                utils::float_value(self.latitude),
            ));
        }
        if !self.altitude.is_finite() {
            return Err(KmlError::validation_field(
                "Altitude must be a finite number",
                "altitude",
                utils::float_value(self.altitude),
            ));
        }
        Ok(())
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("longitude".into(), utils::float_value(self.longitude));
        map.insert("latitude".into(), utils::float_value(self.latitude));
        map.insert("altitude".into(), utils::float_value(self.altitude));
        map
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_dict())
    }

    /// `[longitude, latitude, altitude]`, the form used by `coordinates` fields
    pub fn to_array(&self) -> Value {
        Value::Array(vec![
            utils::float_value(self.longitude),
            utils::float_value(self.latitude),
            utils::float_value(self.altitude),
        ])
    }

    /// Great-circle distance in kilometers, `None` when `other` has no coordinates
    pub fn distance_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::distance_km(self, other)
    }

    /// Initial bearing in degrees `[0, 360)`, `None` when `other` has no coordinates
    pub fn bearing_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::bearing_degrees(self, other)
    }

    /// Geographic midpoint along the great circle
    pub fn midpoint_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<Coordinate> {
        spatial::midpoint(self, other)
    }
}

fn numeric_component(item: &Value, whole: &Value) -> Result<f64> {
    let parsed = match item {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        KmlError::invalid_coordinates(
            format!("component {item} is not numeric"),
            Some(whole.to_string()),
        )
    })
}

impl FromStr for Coordinate {
    type Err = KmlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// KML text form: `lon,lat,alt`
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.longitude, self.latitude, self.altitude)
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.longitude, c.latitude)
    }
}

/// Anything that can be turned into a validated [`Coordinate`]
///
/// Used by coordinate setters so callers can pass tuples, strings, slices or
/// dynamic values interchangeably.
pub trait IntoCoordinate {
    fn into_coordinate(self) -> Result<Coordinate>;
}

impl IntoCoordinate for Coordinate {
    fn into_coordinate(self) -> Result<Coordinate> {
        self.validate()?;
        Ok(self)
    }
}

impl IntoCoordinate for &str {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::parse(self)
    }
}

impl IntoCoordinate for String {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::parse(&self)
    }
}

impl IntoCoordinate for (f64, f64) {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::new(self.0, self.1, 0.0)
    }
}

impl IntoCoordinate for (f64, f64, f64) {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::new(self.0, self.1, self.2)
    }
}

impl IntoCoordinate for &[f64] {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::from_components(self)
    }
}

impl<const N: usize> IntoCoordinate for [f64; N] {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::from_components(&self)
    }
}

impl IntoCoordinate for Vec<f64> {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::from_components(&self)
    }
}

impl IntoCoordinate for &Value {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::from_value(self)
    }
}

impl IntoCoordinate for Value {
    fn into_coordinate(self) -> Result<Coordinate> {
        Coordinate::from_value(&self)
    }
}

/// Parse a coordinate list whose items are strings or numeric sequences, freely mixed
///
/// Used for path vertices and polygon rings. The error names the index of the first
/// offending item.
pub fn parse_coordinate_list(items: &[Value]) -> Result<Vec<Coordinate>> {
    collect_coordinates(items)
}

/// Convert every item, reporting the index of the first failure
pub(crate) fn collect_coordinates<I>(items: I) -> Result<Vec<Coordinate>>
where
    I: IntoIterator,
    I::Item: IntoCoordinate,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            item.into_coordinate().map_err(|err| match err {
                KmlError::InvalidCoordinates {
                    message,
                    coordinates,
                } => KmlError::invalid_coordinates(
                    format!("invalid coordinate at index {index}: {message}"),
                    coordinates,
                ),
                other => other,
            })
        })
        .collect()
}

/// Export a coordinate list as `[[lon, lat, alt], ...]`
pub(crate) fn coordinate_list_value(coordinates: &[Coordinate]) -> Value {
    Value::Array(coordinates.iter().map(Coordinate::to_array).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_new_exposes_values() {
        let c = Coordinate::new(-76.5, 39.3, 12.0).unwrap();
        assert_eq!(c.longitude(), -76.5);
        assert_eq!(c.latitude(), 39.3);
        assert_eq!(c.altitude(), 12.0);
        assert_eq!(c.as_tuple(), (-76.5, 39.3, 12.0));
    }

    #[test]
    fn test_out_of_range_is_validation_error() {
        let err = Coordinate::new(181.0, 0.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = Coordinate::new(0.0, -90.1, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = Coordinate::new(0.0, 0.0, f64::INFINITY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_boundaries_are_accepted() {
        assert!(Coordinate::new(180.0, 90.0, 0.0).is_ok());
        assert!(Coordinate::new(-180.0, -90.0, 0.0).is_ok());
    }

    #[test]
    fn test_parse_string() {
        let c: Coordinate = " -76.5 , 39.3 ".parse().unwrap();
        assert_eq!(c.as_tuple(), (-76.5, 39.3, 0.0));

        let c = Coordinate::parse("1,2,3").unwrap();
        assert_eq!(c.altitude(), 3.0);
    }

    #[test]
    fn test_parse_rejects_short_and_non_numeric() {
        let err = Coordinate::parse("10.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

        let err = Coordinate::parse("abc,1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

        let err = Coordinate::parse("1,2,3,4").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
    }

    #[test]
    fn test_parse_out_of_range_is_validation_error() {
        let err = Coordinate::parse("200,0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_value_shapes() {
        assert!(Coordinate::from_value(&json!([1.0, 2.0])).is_ok());
        assert!(Coordinate::from_value(&json!(["1.5", "2"])).is_ok());
        assert!(Coordinate::from_value(&json!("1,2")).is_ok());
        assert!(Coordinate::from_value(&json!({"longitude": 1.0, "latitude": 2.0})).is_ok());

        let err = Coordinate::from_value(&json!(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

        let err = Coordinate::from_value(&json!([1.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

        let err = Coordinate::from_value(&json!([1.0, "north"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
    }

    #[test]
    fn test_into_coordinate_variants() {
        assert!((1.0, 2.0).into_coordinate().is_ok());
        assert!((1.0, 2.0, 3.0).into_coordinate().is_ok());
        assert!([1.0, 2.0].into_coordinate().is_ok());
        assert!("1,2".into_coordinate().is_ok());
        assert!(vec![1.0].into_coordinate().is_err());
    }

    #[test]
    fn test_parse_coordinate_list_mixed() {
        let coords = parse_coordinate_list(&[json!("0,0"), json!([1.0, 1.0, 5.0])]).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1].altitude(), 5.0);
    }

    #[test]
    fn test_parse_coordinate_list_reports_index() {
        let err = parse_coordinate_list(&[json!("0,0"), json!(42)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_display_and_dict() {
        let c = Coordinate::new(1.5, -2.0, 0.0).unwrap();
        assert_eq!(c.to_string(), "1.5,-2,0");
        assert_eq!(c.to_dict()["latitude"], json!(-2.0));
    }

    #[test]
    fn test_geo_conversion() {
        let c = Coordinate::new(3.0, 4.0, 0.0).unwrap();
        let p: geo::Point<f64> = c.into();
        assert_eq!(p.x(), 3.0);
        assert_eq!(p.y(), 4.0);
    }
}
