//! Polygon: an outer ring with optional holes

use crate::coordinate::{collect_coordinates, coordinate_list_value};
use crate::element::expect_bool;
use crate::point::AltitudeMode;
use crate::spatial::HasCoordinates;
use crate::{Coordinate, Element, ElementBase, IntoCoordinate, KmlError, Result};
use geo::{BoundingRect, Contains, LineString, Rect};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    base: ElementBase,
    outer_boundary: Vec<Coordinate>,
    inner_boundaries: Vec<Vec<Coordinate>>,
    pub extrude: bool,
    pub altitude_mode: AltitudeMode,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Polygon {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    pub fn with_outer_boundary<I>(mut self, ring: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.set_outer_boundary(ring)?;
        Ok(self)
    }

    /// Append a hole; each ring is parsed with the same rules as the outer boundary
    pub fn with_inner_boundary<I>(mut self, ring: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.add_inner_boundary(ring)?;
        Ok(self)
    }

    #[inline]
    pub fn outer_boundary(&self) -> &[Coordinate] {
        &self.outer_boundary
    }

    #[inline]
    pub fn inner_boundaries(&self) -> &[Vec<Coordinate>] {
        &self.inner_boundaries
    }

    pub fn set_outer_boundary<I>(&mut self, ring: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.outer_boundary = collect_coordinates(ring)?;
        Ok(())
    }

    pub fn add_inner_boundary<I>(&mut self, ring: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: IntoCoordinate,
    {
        self.inner_boundaries.push(collect_coordinates(ring)?);
        Ok(())
    }

    pub fn clear_inner_boundaries(&mut self) {
        self.inner_boundaries.clear();
    }

    #[inline]
    pub fn boundary_point_count(&self) -> usize {
        self.outer_boundary.len()
    }

    #[inline]
    pub fn hole_count(&self) -> usize {
        self.inner_boundaries.len()
    }

    /// Convert into a `geo` polygon; rings are closed automatically
    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(
            ring(&self.outer_boundary),
            self.inner_boundaries.iter().map(|r| ring(r)).collect(),
        )
    }

    /// Bounding box of the outer boundary, `None` when it is empty
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        ring(&self.outer_boundary).bounding_rect()
    }

    /// True when `other` lies strictly inside the polygon (holes excluded)
    pub fn contains<O: HasCoordinates + ?Sized>(&self, other: &O) -> bool {
        match other.get_coordinates() {
            Some(c) => self.to_polygon().contains(&geo::Point::from(c)),
            None => false,
        }
    }
}

fn ring(coordinates: &[Coordinate]) -> LineString<f64> {
    LineString::from(
        coordinates
            .iter()
            .map(|&c| geo::Coord::from(c))
            .collect::<Vec<_>>(),
    )
}

fn parse_rings(value: Value) -> Result<Vec<Vec<Coordinate>>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(rings) => rings
            .into_iter()
            .map(|r| match r {
                Value::Array(items) => collect_coordinates(&items),
                other => Err(KmlError::invalid_coordinates(
                    "inner boundary must be a sequence of coordinates",
                    Some(other.to_string()),
                )),
            })
            .collect(),
        other => Err(KmlError::invalid_coordinates(
            "inner boundaries must be a sequence of rings",
            Some(other.to_string()),
        )),
    }
}

impl Element for Polygon {
    const ELEMENT_TYPE: &'static str = "Polygon";
    const FIELDS: &'static [&'static str] =
        &["outer_boundary", "inner_boundaries", "extrude", "altitude_mode"];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "outer_boundary" => coordinate_list_value(&self.outer_boundary),
            "inner_boundaries" => Value::Array(
                self.inner_boundaries
                    .iter()
                    .map(|r| coordinate_list_value(r))
                    .collect(),
            ),
            "boundary_point_count" => Value::from(self.boundary_point_count()),
            "hole_count" => Value::from(self.hole_count()),
            "extrude" => Value::Bool(self.extrude),
            "altitude_mode" => Value::String(self.altitude_mode.as_str().to_string()),
            _ => return None,
        };
        Some(value)
    }

    fn set_own_field(&mut self, name: &str, value: Value) -> Result<bool> {
        match name {
            "outer_boundary" => match value {
                Value::Null => self.outer_boundary.clear(),
                Value::Array(items) => self.set_outer_boundary(&items)?,
                other => {
                    return Err(KmlError::invalid_coordinates(
                        "outer boundary must be a sequence of coordinates",
                        Some(other.to_string()),
                    ));
                }
            },
            "inner_boundaries" => self.inner_boundaries = parse_rings(value)?,
            "extrude" => self.extrude = expect_bool(name, value)?,
            "altitude_mode" => self.altitude_mode = AltitudeMode::from_value(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.outer_boundary
            .iter()
            .chain(self.inner_boundaries.iter().flatten())
            .try_for_each(Coordinate::validate)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for field in [
            "outer_boundary",
            "inner_boundaries",
            "boundary_point_count",
            "hole_count",
            "extrude",
            "altitude_mode",
        ] {
            if let Some(value) = self.own_field(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => write!(f, "Polygon: {name} ")?,
            None => f.write_str("Polygon ")?,
        }
        if self.hole_count() > 0 {
            write!(
                f,
                "({} points, {} holes)",
                self.boundary_point_count(),
                self.hole_count()
            )
        } else {
            write!(f, "({} points)", self.boundary_point_count())
        }
    }
}
