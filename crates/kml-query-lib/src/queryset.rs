//! Ordered, chainable snapshots of elements
//!
//! Every chain step materializes a new [`QuerySet`]; the source is never touched. The
//! elements themselves are shared [`Handle`]s, so updates made through one query set
//! are visible through every other set holding the same element.

use crate::lookup::Lookup;
use crate::spatial::{self, haversine_km};
use crate::{Coordinate, Element, Handle, KmlError, QueryKwargs, Result, utils};
use geo::Rect;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Ordered collection of element handles plus a "distinct" flag
#[derive(Debug, Clone)]
pub struct QuerySet<T: Element> {
    elements: Vec<Handle<T>>,
    distinct: bool,
}

impl<T: Element> Default for QuerySet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<T: Element> QuerySet<T> {
    pub fn new(elements: Vec<Handle<T>>) -> Self {
        Self {
            elements,
            distinct: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Keep elements matching every lookup
    ///
    /// Keys are `field` or `field__operator`; a key without an operator uses `exact`.
    /// Several lookups in one call combine with AND.
    ///
    /// # Errors
    /// [`KmlError::Query`] for an unsupported operator or an unusable query value. The
    /// lookups are checked even when the set is empty.
    pub fn filter<I, K, V>(&self, lookups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = compile(&collect_kwargs(lookups))?;
        let result = self.retain(|element| lookups.iter().all(|l| l.matches(element)));
        tracing::trace!(
            "{} filter: {} -> {} elements",
            T::ELEMENT_TYPE,
            self.len(),
            result.len()
        );
        Ok(result)
    }

    /// Drop elements matching every lookup; the inverse of [`QuerySet::filter`]
    pub fn exclude<I, K, V>(&self, lookups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = compile(&collect_kwargs(lookups))?;
        if lookups.is_empty() {
            return Ok(self.clone());
        }
        let result = self.retain(|element| !lookups.iter().all(|l| l.matches(element)));
        tracing::trace!(
            "{} exclude: {} -> {} elements",
            T::ELEMENT_TYPE,
            self.len(),
            result.len()
        );
        Ok(result)
    }

    /// The single element matching the lookups
    ///
    /// # Errors
    /// [`KmlError::ElementNotFound`] when nothing matches and
    /// [`KmlError::MultipleElementsReturned`] when more than one element does; both
    /// echo the lookups. [`KmlError::Query`] for a malformed lookup.
    pub fn get<I, K, V>(&self, lookups: I) -> Result<Handle<T>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let query_kwargs = collect_kwargs(lookups);
        let lookups = compile(&query_kwargs)?;
        let mut matches: Vec<Handle<T>> = self
            .elements
            .iter()
            .filter(|h| lookups.iter().all(|l| l.matches(&*h.borrow())))
            .cloned()
            .collect();

        if matches.len() > 1 {
            return Err(KmlError::MultipleElementsReturned {
                element_type: T::ELEMENT_TYPE.to_string(),
                count: matches.len(),
                query_kwargs,
            });
        }
        matches.pop().ok_or_else(|| KmlError::ElementNotFound {
            element_type: T::ELEMENT_TYPE.to_string(),
            query_kwargs,
        })
    }

    /// Sort by one field, ascending; a leading `-` sorts descending
    pub fn order_by(&self, field: &str) -> Result<Self> {
        self.order_by_fields(&[field])
    }

    /// Sort by several fields, the first one being the primary key
    ///
    /// Values of different types sort null < bool < number < string < array < object.
    /// Ties keep their current relative order, reversed when the primary field is
    /// descending, so `order_by("f").reverse()` equals `order_by("-f")`.
    ///
    /// # Errors
    /// [`KmlError::Query`] if any element lacks one of the fields.
    pub fn order_by_fields(&self, fields: &[&str]) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("QuerySet::order_by");

        let keys: Vec<(&str, bool)> = fields
            .iter()
            .map(|field| match field.strip_prefix('-') {
                Some(name) => (name, true),
                None => (*field, false),
            })
            .collect();
        if keys.is_empty() {
            return Ok(self.clone());
        }
        if let Some((name, _)) = keys.iter().find(|(name, _)| name.is_empty()) {
            return Err(KmlError::query("order_by() needs a field name", Some(*name)));
        }

        let mut rows = Vec::with_capacity(self.elements.len());
        for (index, handle) in self.elements.iter().enumerate() {
            let element = handle.borrow();
            let mut sort_values = Vec::with_capacity(keys.len());
            for (name, _) in &keys {
                let value = element.field(name).ok_or_else(|| {
                    KmlError::query(
                        format!(
                            "Cannot order by '{name}': {} has no attribute '{name}'",
                            T::ELEMENT_TYPE
                        ),
                        Some(*name),
                    )
                })?;
                sort_values.push(value);
            }
            rows.push((index, sort_values, handle.clone()));
        }

        let primary_descending = keys[0].1;
        rows.sort_by(|(ia, va, _), (ib, vb, _)| {
            for (i, (_, descending)) in keys.iter().enumerate() {
                let ordering = utils::total_cmp_values(&va[i], &vb[i]);
                let ordering = if *descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            if primary_descending {
                ib.cmp(ia)
            } else {
                ia.cmp(ib)
            }
        });

        Ok(self.with_elements(rows.into_iter().map(|(_, _, h)| h).collect()))
    }

    /// Current order reversed; not a re-sort
    pub fn reverse(&self) -> Self {
        self.with_elements(self.elements.iter().rev().cloned().collect())
    }

    /// One mapping per element with the requested fields, or every field if none given
    ///
    /// A field the element does not have maps to null.
    pub fn values(&self, fields: &[&str]) -> Vec<Map<String, Value>> {
        self.elements
            .iter()
            .map(|handle| {
                let element = handle.borrow();
                if fields.is_empty() {
                    return element.to_dict();
                }
                fields
                    .iter()
                    .map(|f| (f.to_string(), element.field(f).unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }

    /// One row per element; with `flat`, the bare values of a single field
    ///
    /// Rows are arrays in field order. Without fields each row holds every exported
    /// value in [`Element::to_dict`] order.
    ///
    /// # Errors
    /// [`KmlError::Usage`] when `flat` is requested with a field count other than one.
    pub fn values_list(&self, fields: &[&str], flat: bool) -> Result<Vec<Value>> {
        if flat && fields.len() != 1 {
            return Err(KmlError::Usage(
                "values_list() with flat=True requires exactly one field".to_string(),
            ));
        }
        let rows = self
            .elements
            .iter()
            .map(|handle| {
                let element = handle.borrow();
                if fields.is_empty() {
                    return Value::Array(element.to_dict().into_iter().map(|(_, v)| v).collect());
                }
                let mut row: Vec<Value> = fields
                    .iter()
                    .map(|f| element.field(f).unwrap_or(Value::Null))
                    .collect();
                if flat {
                    row.pop().unwrap_or(Value::Null)
                } else {
                    Value::Array(row)
                }
            })
            .collect();
        Ok(rows)
    }

    /// Drop later duplicates of the same element instance, keeping first occurrences
    pub fn distinct(&self) -> Self {
        let mut seen = HashSet::with_capacity(self.elements.len());
        Self {
            elements: self
                .elements
                .iter()
                .filter(|h| seen.insert(h.addr()))
                .cloned()
                .collect(),
            distinct: true,
        }
    }

    #[inline]
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn none(&self) -> Self {
        Self::empty()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn exists(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn first(&self) -> Option<Handle<T>> {
        self.elements.first().cloned()
    }

    pub fn last(&self) -> Option<Handle<T>> {
        self.elements.last().cloned()
    }

    /// Element at `index` in the current order
    pub fn element_at(&self, index: usize) -> Option<Handle<T>> {
        self.elements.get(index).cloned()
    }

    /// Sub-range of the current order; out-of-range bounds are clamped
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let len = self.elements.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        self.with_elements(self.elements[start..end].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handle<T>> {
        self.elements.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Handle<T>] {
        &self.elements
    }

    /// Elements within `radius_km` of a center, by haversine distance
    ///
    /// Elements without coordinates are dropped.
    ///
    /// # Errors
    /// [`KmlError::Validation`] for an out-of-range center or a negative radius.
    pub fn near(&self, longitude: f64, latitude: f64, radius_km: f64) -> Result<Self> {
        let center = Coordinate::new_2d(longitude, latitude)?;
        if radius_km.is_nan() || radius_km < 0.0 {
            return Err(KmlError::validation_field(
                format!("Radius must be a non-negative number of kilometers, got {radius_km}"),
                "radius_km",
                utils::float_value(radius_km),
            ));
        }
        let result = self.retain(|element| {
            element
                .coordinates()
                .is_some_and(|c| haversine_km(&c, &center) <= radius_km)
        });
        tracing::trace!(
            "{} near ({longitude}, {latitude}) within {radius_km} km: {} -> {} elements",
            T::ELEMENT_TYPE,
            self.len(),
            result.len()
        );
        Ok(result)
    }

    /// Elements inside an inclusive latitude/longitude box
    ///
    /// A box whose `west` edge is greater than its `east` edge crosses the
    /// antimeridian. Elements without coordinates are dropped.
    ///
    /// # Errors
    /// [`KmlError::InvalidCoordinates`] unless `-90 <= south <= north <= 90` and both
    /// `east` and `west` lie in `[-180, 180]`.
    pub fn within_bounds(&self, north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let latitudes_ok = utils::is_valid_latitude(north)
            && utils::is_valid_latitude(south)
            && south <= north;
        if !latitudes_ok || !utils::is_valid_longitude(east) || !utils::is_valid_longitude(west)
        {
            return Err(KmlError::invalid_coordinates(
                format!(
                    "Invalid bounds: north={north}, south={south}, east={east}, west={west}"
                ),
                None,
            ));
        }
        let result = self.retain(|element| {
            element.coordinates().is_some_and(|c| {
                let (lon, lat) = (c.longitude(), c.latitude());
                let lon_ok = if west <= east {
                    (west..=east).contains(&lon)
                } else {
                    lon >= west || lon <= east
                };
                lon_ok && (south..=north).contains(&lat)
            })
        });
        tracing::trace!(
            "{} within bounds: {} -> {} elements",
            T::ELEMENT_TYPE,
            self.len(),
            result.len()
        );
        Ok(result)
    }

    /// Elements exposing a coordinate pair
    pub fn has_coordinates(&self) -> Self {
        self.retain(|element| element.coordinates().is_some())
    }

    /// Elements whose coordinate passes range validation
    pub fn valid_coordinates(&self) -> Self {
        self.retain(|element| {
            element
                .coordinates()
                .is_some_and(|c| c.validate().is_ok())
        })
    }

    /// Smallest box containing every element coordinate, `None` if there are none
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        spatial::bounding_box(self.elements.iter().map(|h| h.borrow().coordinates()))
    }

    fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Self {
        self.with_elements(
            self.elements
                .iter()
                .filter(|h| keep(&*h.borrow()))
                .cloned()
                .collect(),
        )
    }

    fn with_elements(&self, elements: Vec<Handle<T>>) -> Self {
        Self {
            elements,
            distinct: self.distinct,
        }
    }
}

fn collect_kwargs<I, K, V>(lookups: I) -> QueryKwargs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    lookups
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn compile(kwargs: &QueryKwargs) -> Result<Vec<Lookup>> {
    kwargs
        .iter()
        .map(|(key, value)| Lookup::parse(key, value.clone()))
        .collect()
}

impl<T: Element> IntoIterator for QuerySet<T> {
    type Item = Handle<T>;
    type IntoIter = std::vec::IntoIter<Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, T: Element> IntoIterator for &'a QuerySet<T> {
    type Item = &'a Handle<T>;
    type IntoIter = std::slice::Iter<'a, Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T: Element> FromIterator<Handle<T>> for QuerySet<T> {
    fn from_iter<I: IntoIterator<Item = Handle<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Element> fmt::Display for QuerySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<QuerySet [")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "<{}: {}>", T::ELEMENT_TYPE, element)?;
        }
        f.write_str("]>")
    }
}
