//! Path (KML `<LineString>`): an ordered run of coordinates

use crate::coordinate::{collect_coordinates, coordinate_list_value};
use crate::element::expect_bool;
use crate::point::AltitudeMode;
use crate::spatial::haversine_km;
use crate::{Coordinate, Element, ElementBase, IntoCoordinate, KmlError, Result};
use geo::{BoundingRect, LineString, Rect};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    base: ElementBase,
    coordinates: Vec<Coordinate>,
    pub tessellate: bool,
    pub altitude_mode: AltitudeMode,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Path {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    /// Builder-style vertex assignment, see [`Path::set_coordinates`]
    pub fn with_coordinates<I>(mut self, coordinates: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.set_coordinates(coordinates)?;
        Ok(self)
    }

    #[inline]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    /// Replace the vertices
    ///
    /// Items may be tuples, slices, `"lon,lat[,alt]"` strings or dynamic values. The
    /// path is left untouched when any item fails to parse.
    pub fn set_coordinates<I>(&mut self, coordinates: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.coordinates = collect_coordinates(coordinates)?;
        Ok(())
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.coordinates.len()
    }

    pub fn line_string(&self) -> LineString<f64> {
        LineString::from(
            self.coordinates
                .iter()
                .map(|&c| geo::Coord::from(c))
                .collect::<Vec<_>>(),
        )
    }

    /// Bounding box with `x` = longitude and `y` = latitude, `None` when empty
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.line_string().bounding_rect()
    }

    /// Sum of the haversine lengths of every leg
    pub fn length_km(&self) -> f64 {
        self.coordinates
            .windows(2)
            .map(|leg| haversine_km(&leg[0], &leg[1]))
            .sum()
    }
}

impl Element for Path {
    const ELEMENT_TYPE: &'static str = "Path";
    const FIELDS: &'static [&'static str] = &["coordinates", "tessellate", "altitude_mode"];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "coordinates" => coordinate_list_value(&self.coordinates),
            "point_count" => Value::from(self.point_count()),
            "tessellate" => Value::Bool(self.tessellate),
            "altitude_mode" => Value::String(self.altitude_mode.as_str().to_string()),
            _ => return None,
        };
        Some(value)
    }

    fn set_own_field(&mut self, name: &str, value: Value) -> Result<bool> {
        match name {
            "coordinates" => match value {
                Value::Null => self.coordinates.clear(),
                Value::Array(items) => self.set_coordinates(&items)?,
                other => {
                    return Err(KmlError::invalid_coordinates(
                        "path coordinates must be a sequence",
                        Some(other.to_string()),
                    ));
                }
            },
            "tessellate" => self.tessellate = expect_bool(name, value)?,
            "altitude_mode" => self.altitude_mode = AltitudeMode::from_value(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.coordinates.iter().try_for_each(Coordinate::validate)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for field in ["coordinates", "point_count", "tessellate", "altitude_mode"] {
            if let Some(value) = self.own_field(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => write!(f, "Path: {name} ({} points)", self.point_count()),
            None => write!(f, "Path ({} points)", self.point_count()),
        }
    }
}
