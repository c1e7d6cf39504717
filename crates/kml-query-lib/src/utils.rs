//! Utility constants and helpers shared by coordinates, lookups and spatial math

use serde_json::Value;
use std::cmp::Ordering;

/// Longitude bounds in decimal degrees
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Latitude bounds in decimal degrees
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// Mean Earth radius in kilometers (IUGG)
pub const EARTH_RADIUS_MEAN_KM: f64 = 6371.0088;

/// WGS84 ellipsoid semi-major axis in meters
pub const WGS84_A: f64 = 6378137.0;

/// WGS84 flattening factor
pub const WGS84_F: f64 = 1.0 / 298.257223563;

pub const FULL_CIRCLE_DEGREES: f64 = 360.0;

/// Check a longitude against the WGS84 range
#[inline(always)]
pub fn is_valid_longitude(lon: f64) -> bool {
    (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&lon)
}

/// Check a latitude against the WGS84 range
#[inline(always)]
pub fn is_valid_latitude(lat: f64) -> bool {
    (MIN_LATITUDE..=MAX_LATITUDE).contains(&lat)
}

/// Normalize an angle in degrees into `[0, 360)`
#[inline(always)]
pub fn normalize_bearing(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(FULL_CIRCLE_DEGREES);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= FULL_CIRCLE_DEGREES {
        0.0
    } else {
        normalized
    }
}

/// Normalize a longitude in degrees into `[-180, 180]`
#[inline(always)]
pub fn normalize_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(FULL_CIRCLE_DEGREES) - 180.0
}

/// Render a dynamic value the way it reads in query text and error messages
///
/// Strings are rendered without quotes; everything else uses its JSON form.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rank used to order values of different JSON types against each other
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two values of the same kind, `None` when they are not comparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order over values, used for sorting
///
/// Values of the same type compare naturally; different types are ordered
/// null < bool < number < string < array < object.
pub fn total_cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => compare_values(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
    }
}

/// Compare two values for equality
///
/// Numbers compare by numeric value without tolerance, so `1` equals `1.0` but
/// `0.1 + 0.2` does not equal `0.3`. Arrays and objects compare element-wise.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => a == b,
    }
}

/// Build a JSON number from a float, mapping non-finite values to null
#[inline]
pub fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}
