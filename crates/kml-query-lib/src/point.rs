//! Standalone point geometry

use crate::element::expect_bool;
use crate::spatial::{self, HasCoordinates};
use crate::{Coordinate, Element, ElementBase, IntoCoordinate, KmlError, Result, utils};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// How altitude values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AltitudeMode {
    #[default]
    ClampToGround,
    RelativeToGround,
    Absolute,
    ClampToSeaFloor,
    RelativeToSeaFloor,
}

impl AltitudeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AltitudeMode::ClampToGround => "clampToGround",
            AltitudeMode::RelativeToGround => "relativeToGround",
            AltitudeMode::Absolute => "absolute",
            AltitudeMode::ClampToSeaFloor => "clampToSeaFloor",
            AltitudeMode::RelativeToSeaFloor => "relativeToSeaFloor",
        }
    }

    pub(crate) fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(s) => s.parse(),
            other => Err(KmlError::validation_field(
                "altitude_mode must be a string",
                "altitude_mode",
                other,
            )),
        }
    }
}

impl FromStr for AltitudeMode {
    type Err = KmlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clampToGround" => Ok(AltitudeMode::ClampToGround),
            "relativeToGround" => Ok(AltitudeMode::RelativeToGround),
            "absolute" => Ok(AltitudeMode::Absolute),
            "clampToSeaFloor" | "gx:clampToSeaFloor" => Ok(AltitudeMode::ClampToSeaFloor),
            "relativeToSeaFloor" | "gx:relativeToSeaFloor" => Ok(AltitudeMode::RelativeToSeaFloor),
            other => Err(KmlError::validation_field(
                format!("Unknown altitude mode '{other}'"),
                "altitude_mode",
                Value::String(other.to_string()),
            )),
        }
    }
}

impl fmt::Display for AltitudeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A KML `<Point>`: one optional coordinate plus rendering flags
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    base: ElementBase,
    coordinates: Option<Coordinate>,
    pub extrude: bool,
    pub altitude_mode: AltitudeMode,
    pub tessellate: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Point {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    /// Unnamed point at the given location
    pub fn at(coordinates: impl IntoCoordinate) -> Result<Self> {
        let mut point = Self::default();
        point.set_coordinates(coordinates)?;
        Ok(point)
    }

    pub fn with_coordinates(mut self, coordinates: impl IntoCoordinate) -> Result<Self> {
        self.set_coordinates(coordinates)?;
        Ok(self)
    }

    #[inline]
    pub fn coordinates(&self) -> Option<Coordinate> {
        self.coordinates
    }

    pub fn set_coordinates(&mut self, coordinates: impl IntoCoordinate) -> Result<()> {
        self.coordinates = Some(coordinates.into_coordinate()?);
        Ok(())
    }

    pub fn clear_coordinates(&mut self) {
        self.coordinates = None;
    }

    #[inline]
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude())
    }

    #[inline]
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude())
    }

    #[inline]
    pub fn altitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.altitude())
    }

    #[inline]
    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn distance_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::distance_km(self, other)
    }

    pub fn bearing_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::bearing_degrees(self, other)
    }

    pub fn midpoint_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<Coordinate> {
        spatial::midpoint(self, other)
    }
}

impl HasCoordinates for Point {
    #[inline]
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.coordinates
    }
}

impl Element for Point {
    const ELEMENT_TYPE: &'static str = "Point";
    const FIELDS: &'static [&'static str] =
        &["coordinates", "extrude", "altitude_mode", "tessellate"];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "coordinates" => self.coordinates.map_or(Value::Null, |c| c.to_array()),
            "longitude" => self.longitude().map_or(Value::Null, utils::float_value),
            "latitude" => self.latitude().map_or(Value::Null, utils::float_value),
            "altitude" => self.altitude().map_or(Value::Null, utils::float_value),
            "extrude" => Value::Bool(self.extrude),
            "altitude_mode" => Value::String(self.altitude_mode.as_str().to_string()),
            "tessellate" => Value::Bool(self.tessellate),
            _ => return None,
        };
        Some(value)
    }

    fn set_own_field(&mut self, name: &str, value: Value) -> Result<bool> {
        match name {
            "coordinates" => {
                self.coordinates = match value {
                    Value::Null => None,
                    other => Some(Coordinate::from_value(&other)?),
                }
            }
            "extrude" => self.extrude = expect_bool(name, value)?,
            "altitude_mode" => self.altitude_mode = AltitudeMode::from_value(value)?,
            "tessellate" => self.tessellate = expect_bool(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if let Some(coordinates) = &self.coordinates {
            coordinates.validate()?;
        }
        Ok(())
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for field in [
            "coordinates",
            "longitude",
            "latitude",
            "altitude",
            "extrude",
            "altitude_mode",
            "tessellate",
        ] {
            if let Some(value) = self.own_field(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }

    fn coordinates(&self) -> Option<Coordinate> {
        self.coordinates
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.base.name, &self.coordinates) {
            (Some(name), _) if !name.is_empty() => write!(f, "Point: {name}"),
            (_, Some(c)) => write!(f, "Point: ({}, {})", c.longitude(), c.latitude()),
            _ => f.write_str("Point: (no coordinates)"),
        }
    }
}
