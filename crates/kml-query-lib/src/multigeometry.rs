//! MultiGeometry: an ordered group of geometries, possibly nested

use crate::{Element, ElementBase, Path, Point, Polygon, Result};
use serde_json::{Map, Value};
use std::fmt;

/// One member of a [`MultiGeometry`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Geometry {
    Point(Point),
    Path(Path),
    Polygon(Polygon),
    MultiGeometry(MultiGeometry),
}

impl Geometry {
    pub fn element_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => Point::ELEMENT_TYPE,
            Geometry::Path(_) => Path::ELEMENT_TYPE,
            Geometry::Polygon(_) => Polygon::ELEMENT_TYPE,
            Geometry::MultiGeometry(_) => MultiGeometry::ELEMENT_TYPE,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        match self {
            Geometry::Point(p) => p.has_coordinates(),
            Geometry::Path(p) => p.point_count() > 0,
            Geometry::Polygon(p) => p.boundary_point_count() > 0,
            Geometry::MultiGeometry(m) => m.has_coordinates(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Geometry::Point(g) => g.validate(),
            Geometry::Path(g) => g.validate(),
            Geometry::Polygon(g) => g.validate(),
            Geometry::MultiGeometry(g) => g.validate(),
        }
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        match self {
            Geometry::Point(g) => g.to_dict(),
            Geometry::Path(g) => g.to_dict(),
            Geometry::Polygon(g) => g.to_dict(),
            Geometry::MultiGeometry(g) => g.to_dict(),
        }
    }
}

impl From<Point> for Geometry {
    fn from(value: Point) -> Self {
        Geometry::Point(value)
    }
}

impl From<Path> for Geometry {
    fn from(value: Path) -> Self {
        Geometry::Path(value)
    }
}

impl From<Polygon> for Geometry {
    fn from(value: Polygon) -> Self {
        Geometry::Polygon(value)
    }
}

impl From<MultiGeometry> for Geometry {
    fn from(value: MultiGeometry) -> Self {
        Geometry::MultiGeometry(value)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(g) => fmt::Display::fmt(g, f),
            Geometry::Path(g) => fmt::Display::fmt(g, f),
            Geometry::Polygon(g) => fmt::Display::fmt(g, f),
            Geometry::MultiGeometry(g) => fmt::Display::fmt(g, f),
        }
    }
}

/// Recursive per-type member counts; `total` counts direct members only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryCounts {
    pub points: usize,
    pub paths: usize,
    pub polygons: usize,
    pub multigeometries: usize,
    pub total: usize,
}

impl GeometryCounts {
    fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert("points".into(), Value::from(self.points));
        map.insert("paths".into(), Value::from(self.paths));
        map.insert("polygons".into(), Value::from(self.polygons));
        map.insert("multigeometries".into(), Value::from(self.multigeometries));
        map.insert("total".into(), Value::from(self.total));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiGeometry {
    base: ElementBase,
    geometries: Vec<Geometry>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MultiGeometry {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            geometries: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    pub fn with_geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.add_geometry(geometry);
        self
    }

    pub fn add_geometry(&mut self, geometry: impl Into<Geometry>) {
        self.geometries.push(geometry.into());
    }

    #[inline]
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Geometry> {
        self.geometries.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Geometry> {
        self.geometries.iter()
    }

    /// Every point, including those of nested multi-geometries, in member order
    pub fn points(&self) -> Vec<&Point> {
        let mut out = Vec::new();
        self.walk(&mut |g| {
            if let Geometry::Point(p) = g {
                out.push(p);
            }
        });
        out
    }

    pub fn paths(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.walk(&mut |g| {
            if let Geometry::Path(p) = g {
                out.push(p);
            }
        });
        out
    }

    pub fn polygons(&self) -> Vec<&Polygon> {
        let mut out = Vec::new();
        self.walk(&mut |g| {
            if let Geometry::Polygon(p) = g {
                out.push(p);
            }
        });
        out
    }

    /// Nested multi-geometries, each followed by its own nested ones
    pub fn multigeometries(&self) -> Vec<&MultiGeometry> {
        let mut out = Vec::new();
        self.walk(&mut |g| {
            if let Geometry::MultiGeometry(m) = g {
                out.push(m);
            }
        });
        out
    }

    pub fn geometry_counts(&self) -> GeometryCounts {
        let mut counts = GeometryCounts {
            total: self.geometries.len(),
            ..GeometryCounts::default()
        };
        self.walk(&mut |g| match g {
            Geometry::Point(_) => counts.points += 1,
            Geometry::Path(_) => counts.paths += 1,
            Geometry::Polygon(_) => counts.polygons += 1,
            Geometry::MultiGeometry(_) => counts.multigeometries += 1,
        });
        counts
    }

    pub fn has_coordinates(&self) -> bool {
        self.geometries.iter().any(Geometry::has_coordinates)
    }

    /// Pre-order walk over every member, descending into nested multi-geometries
    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Geometry)) {
        for geometry in &self.geometries {
            visit(geometry);
            if let Geometry::MultiGeometry(nested) = geometry {
                nested.walk(visit);
            }
        }
    }
}

impl<'a> IntoIterator for &'a MultiGeometry {
    type Item = &'a Geometry;
    type IntoIter = std::slice::Iter<'a, Geometry>;

    fn into_iter(self) -> Self::IntoIter {
        self.geometries.iter()
    }
}

impl Element for MultiGeometry {
    const ELEMENT_TYPE: &'static str = "MultiGeometry";
    const FIELDS: &'static [&'static str] = &[];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        match name {
            "geometries" => Some(Value::Array(
                self.geometries
                    .iter()
                    .map(|g| Value::Object(g.to_dict()))
                    .collect(),
            )),
            "geometry_counts" => Some(self.geometry_counts().to_value()),
            "has_coordinates" => Some(Value::Bool(self.has_coordinates())),
            _ => None,
        }
    }

    fn set_own_field(&mut self, _name: &str, _value: Value) -> Result<bool> {
        Ok(false)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.geometries.iter().try_for_each(Geometry::validate)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for field in ["geometries", "geometry_counts"] {
            if let Some(value) = self.own_field(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }
}

impl fmt::Display for MultiGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => write!(f, "MultiGeometry: {name} ({} geometries)", self.len()),
            None => write!(f, "MultiGeometry ({} geometries)", self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_multigeometry() -> MultiGeometry {
        let nested = MultiGeometry::default()
            .with_geometry(Point::at((3.0, 3.0)).unwrap())
            .with_geometry(Path::default().with_coordinates(["0,0", "1,1"]).unwrap());
        MultiGeometry::named("Campus")
            .with_geometry(Point::at((1.0, 1.0)).unwrap())
            .with_geometry(
                Polygon::default()
                    .with_outer_boundary([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])
                    .unwrap(),
            )
            .with_geometry(nested)
    }

    #[test]
    fn test_recursive_collection() {
        let mg = create_test_multigeometry();
        assert_eq!(mg.len(), 3);
        assert_eq!(mg.points().len(), 2);
        assert_eq!(mg.paths().len(), 1);
        assert_eq!(mg.polygons().len(), 1);
        assert_eq!(mg.multigeometries().len(), 1);
    }

    #[test]
    fn test_geometry_counts() {
        let counts = create_test_multigeometry().geometry_counts();
        assert_eq!(
            counts,
            GeometryCounts {
                points: 2,
                paths: 1,
                polygons: 1,
                multigeometries: 1,
                total: 3,
            }
        );
    }

    #[test]
    fn test_has_coordinates() {
        assert!(create_test_multigeometry().has_coordinates());
        assert!(!MultiGeometry::default().has_coordinates());
        let empty_point = MultiGeometry::default().with_geometry(Point::default());
        assert!(!empty_point.has_coordinates());
    }

    #[test]
    fn test_display_and_iteration() {
        let mg = create_test_multigeometry();
        assert_eq!(mg.to_string(), "MultiGeometry: Campus (3 geometries)");
        let types: Vec<_> = mg.iter().map(Geometry::element_type).collect();
        assert_eq!(types, ["Point", "Polygon", "MultiGeometry"]);
        assert_eq!(MultiGeometry::default().to_string(), "MultiGeometry (0 geometries)");
    }

    #[test]
    fn test_update_has_no_own_fields() {
        let mut mg = create_test_multigeometry();
        mg.update([("name", json!("Renamed"))]).unwrap();
        assert_eq!(mg.name(), Some("Renamed"));
        assert!(mg.update([("geometries", json!([]))]).is_err());
    }

    #[test]
    fn test_to_dict_counts() {
        let dict = create_test_multigeometry().to_dict();
        assert_eq!(dict["geometry_counts"]["points"], json!(2));
        assert_eq!(dict["geometries"].as_array().map(Vec::len), Some(3));
    }
}
