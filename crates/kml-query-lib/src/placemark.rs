//! Placemark: a named location, the most common KML element

use crate::element::{expect_mapping, expect_string, opt_string};
use crate::spatial::{self, DistanceUnit, HasCoordinates};
use crate::{
    Coordinate, Element, ElementBase, IntoCoordinate, MultiGeometry, Point, Result, utils,
};
use serde_json::{Map, Value};
use std::fmt;

/// A location with optional point geometry, contact details and free-form data
///
/// The coordinate accessors proxy the owned [`Point`]. Assigning coordinates creates
/// the point when it is missing and updates it in place otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placemark {
    base: ElementBase,
    point: Option<Point>,
    multigeometry: Option<MultiGeometry>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub snippet: Option<String>,
    pub style_url: Option<String>,
    pub extended_data: Map<String, Value>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Placemark {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    /// Builder-style coordinate assignment
    ///
    /// # Errors
    /// [`crate::KmlError::InvalidCoordinates`] for malformed input,
    /// [`crate::KmlError::Validation`] for out-of-range values.
    pub fn with_coordinates(mut self, coordinates: impl IntoCoordinate) -> Result<Self> {
        self.set_coordinates(coordinates)?;
        Ok(self)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[inline]
    pub fn point(&self) -> Option<&Point> {
        self.point.as_ref()
    }

    pub fn set_point(&mut self, point: Option<Point>) {
        self.point = point;
    }

    #[inline]
    pub fn multigeometry(&self) -> Option<&MultiGeometry> {
        self.multigeometry.as_ref()
    }

    pub fn multigeometry_mut(&mut self) -> Option<&mut MultiGeometry> {
        self.multigeometry.as_mut()
    }

    pub fn set_multigeometry(&mut self, multigeometry: Option<MultiGeometry>) {
        self.multigeometry = multigeometry;
    }

    #[inline]
    pub fn coordinates(&self) -> Option<Coordinate> {
        self.point.as_ref().and_then(Point::coordinates)
    }

    pub fn set_coordinates(&mut self, coordinates: impl IntoCoordinate) -> Result<()> {
        let coordinates = coordinates.into_coordinate()?;
        match &mut self.point {
            Some(point) => point.set_coordinates(coordinates)?,
            None => self.point = Some(Point::at(coordinates)?),
        }
        Ok(())
    }

    /// Drop the coordinates, keeping the point and its flags
    pub fn clear_coordinates(&mut self) {
        if let Some(point) = &mut self.point {
            point.clear_coordinates();
        }
    }

    #[inline]
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.longitude())
    }

    #[inline]
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.latitude())
    }

    #[inline]
    pub fn altitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.altitude())
    }

    #[inline]
    pub fn has_coordinates(&self) -> bool {
        self.coordinates().is_some()
    }

    /// Haversine distance in kilometers
    ///
    /// # Arguments
    /// * `other` - Another element, a [`Coordinate`] or a raw `(lon, lat)` pair
    ///
    /// # Returns
    /// `None` when either side has no coordinates, or when `other` is a raw sequence
    /// whose length is not 2
    pub fn distance_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::distance_km(self, other)
    }

    /// Same as [`Placemark::distance_to`], reported in `unit`
    pub fn distance_to_in<O: HasCoordinates + ?Sized>(
        &self,
        other: &O,
        unit: DistanceUnit,
    ) -> Option<f64> {
        self.distance_to(other).map(|km| unit.from_km(km))
    }

    /// Initial bearing in degrees `[0, 360)`, 0 is true north
    pub fn bearing_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<f64> {
        spatial::bearing_degrees(self, other)
    }

    pub fn midpoint_to<O: HasCoordinates + ?Sized>(&self, other: &O) -> Option<Coordinate> {
        spatial::midpoint(self, other)
    }
}

impl HasCoordinates for Placemark {
    #[inline]
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.coordinates()
    }
}

impl Element for Placemark {
    const ELEMENT_TYPE: &'static str = "Placemark";
    const FIELDS: &'static [&'static str] = &[
        "coordinates",
        "address",
        "phone_number",
        "snippet",
        "style_url",
        "extended_data",
    ];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "coordinates" => self.coordinates().map_or(Value::Null, |c| c.to_array()),
            "longitude" => self.longitude().map_or(Value::Null, utils::float_value),
            "latitude" => self.latitude().map_or(Value::Null, utils::float_value),
            "altitude" => self.altitude().map_or(Value::Null, utils::float_value),
            "point" => self
                .point
                .as_ref()
                .map_or(Value::Null, |p| Value::Object(p.to_dict())),
            "multigeometry" => self
                .multigeometry
                .as_ref()
                .map_or(Value::Null, |m| Value::Object(m.to_dict())),
            "address" => opt_string(&self.address),
            "phone_number" => opt_string(&self.phone_number),
            "snippet" => opt_string(&self.snippet),
            "style_url" => opt_string(&self.style_url),
            "extended_data" => Value::Object(self.extended_data.clone()),
            _ => return None,
        };
        Some(value)
    }

    fn set_own_field(&mut self, name: &str, value: Value) -> Result<bool> {
        match name {
            "coordinates" => match value {
                Value::Null => self.clear_coordinates(),
                other => self.set_coordinates(&other)?,
            },
            "address" => self.address = expect_string(name, value)?,
            "phone_number" => self.phone_number = expect_string(name, value)?,
            "snippet" => self.snippet = expect_string(name, value)?,
            "style_url" => self.style_url = expect_string(name, value)?,
            "extended_data" => self.extended_data = expect_mapping(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if let Some(point) = &self.point {
            point.validate()?;
        }
        if let Some(multigeometry) = &self.multigeometry {
            multigeometry.validate()?;
        }
        Ok(())
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for field in [
            "point",
            "multigeometry",
            "coordinates",
            "longitude",
            "latitude",
            "altitude",
            "address",
            "phone_number",
            "snippet",
            "style_url",
            "extended_data",
        ] {
            if let Some(value) = self.own_field(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }

    fn coordinates(&self) -> Option<Coordinate> {
        Placemark::coordinates(self)
    }
}

impl fmt::Display for Placemark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.base.name.as_deref().filter(|n| !n.is_empty()) {
            return f.write_str(name);
        }
        if let Some(address) = self.address.as_deref().filter(|a| !a.is_empty()) {
            return write!(f, "Placemark at {address}");
        }
        match self.coordinates() {
            Some(c) => write!(f, "Placemark({:.4}, {:.4})", c.latitude(), c.longitude()),
            None => f.write_str("Placemark(no location)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn create_test_placemark(name: &str, lon: f64, lat: f64) -> Placemark {
        Placemark::named(name).with_coordinates((lon, lat)).unwrap()
    }

    #[test]
    fn test_coordinates_proxy_point() {
        let placemark = Placemark::default()
            .with_coordinates((-76.5, 39.3, 0.0))
            .unwrap();
        assert_eq!(placemark.longitude(), Some(-76.5));
        assert_eq!(placemark.latitude(), Some(39.3));
        assert_eq!(placemark.altitude(), Some(0.0));
        assert!(placemark.has_coordinates());
        assert!(placemark.point().is_some());
    }

    #[test]
    fn test_set_coordinates_updates_point_in_place() {
        let mut placemark = create_test_placemark("A", 1.0, 1.0);
        let mut point = Point::at((1.0, 1.0)).unwrap();
        point.extrude = true;
        placemark.set_point(Some(point));
        placemark.set_coordinates("3,4,5").unwrap();
        let point = placemark.point().unwrap();
        assert!(point.extrude);
        assert_eq!(point.altitude(), Some(5.0));
    }

    #[test]
    fn test_invalid_coordinates_leave_placemark_unchanged() {
        let mut placemark = create_test_placemark("A", 1.0, 1.0);
        let err = placemark.set_coordinates("north,south").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
        let err = placemark.set_coordinates((0.0, 95.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(placemark.latitude(), Some(1.0));
    }

    #[test]
    fn test_distance_and_bearing() {
        let a = create_test_placemark("A", 0.0, 0.0);
        let b = create_test_placemark("B", 1.0, 0.0);
        let distance = a.distance_to(&b).unwrap();
        assert!((distance - 111.32).abs() / 111.32 < 0.01);
        let bearing = a.bearing_to(&b).unwrap();
        assert!((bearing - 90.0).abs() < 1.0);
        assert!((a.distance_to(&(1.0, 0.0)).unwrap() - distance).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_returns_none() {
        let a = create_test_placemark("A", 0.0, 0.0);
        assert!(a.distance_to(&[1.0, 2.0, 3.0]).is_none());
        assert!(a.distance_to(&Placemark::default()).is_none());
        assert!(Placemark::default().bearing_to(&a).is_none());
    }

    #[test]
    fn test_distance_units() {
        let a = create_test_placemark("A", 0.0, 0.0);
        let meters = a
            .distance_to_in(&(0.0, 1.0), DistanceUnit::Meters)
            .unwrap();
        assert!(meters > 110_000.0 && meters < 112_000.0);
    }

    #[test]
    fn test_display_priority() {
        assert_eq!(create_test_placemark("Capital", 1.0, 2.0).to_string(), "Capital");
        assert_eq!(
            Placemark::default().with_address("1 Main St").to_string(),
            "Placemark at 1 Main St"
        );
        assert_eq!(
            Placemark::default()
                .with_coordinates((-76.5, 39.3))
                .unwrap()
                .to_string(),
            "Placemark(39.3000, -76.5000)"
        );
        assert_eq!(Placemark::default().to_string(), "Placemark(no location)");
    }

    #[test]
    fn test_extended_data_must_be_mapping() {
        let mut placemark = Placemark::default();
        let err = placemark
            .update([("extended_data", json!([1, 2]))])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        placemark
            .update([("extended_data", json!({"k": "v"}))])
            .unwrap();
        assert_eq!(placemark.extended_data["k"], json!("v"));
    }

    #[test]
    fn test_update_coordinates_through_field() {
        let mut placemark = Placemark::default();
        placemark
            .update([("coordinates", json!([10.0, 20.0]))])
            .unwrap();
        assert_eq!(placemark.field("latitude"), Some(json!(20.0)));
        assert_eq!(placemark.field("coordinates"), Some(json!([10.0, 20.0, 0.0])));
        assert_eq!(placemark.field("point.latitude"), Some(json!(20.0)));
    }

    #[test]
    fn test_to_dict_fields() {
        let dict = create_test_placemark("A", 1.0, 2.0).to_dict();
        assert_eq!(dict["element_type"], json!("Placemark"));
        assert_eq!(dict["longitude"], json!(1.0));
        assert_eq!(dict["address"], Value::Null);
        assert_eq!(dict["multigeometry"], Value::Null);
    }
}
