//! KML Query Library - Query and Traversal Engine for Hierarchical KML Documents
//!
//! This library provides filter, ordering, projection and geospatial queries over an
//! already-built tree of KML elements (placemarks, paths, polygons, points and
//! multi-geometries grouped in nested folders). Parsing the source document is the job
//! of an upstream builder; this crate only consumes the resulting tree.
//!
//! # Architecture
//!
//! - **[`Coordinate`]**: Validated longitude/latitude/altitude value
//! - **[`Element`]**: Shared identity, validation, update, copy and export contract
//! - **[`Placemark`], [`Path`], [`Polygon`], [`Point`], [`MultiGeometry`]**: Geometry elements
//! - **[`Folder`] / [`KmlDocument`]**: Containers owning ordered per-type collections
//! - **[`Manager`]**: Per-type, per-container entry point (`children()` / `all(flatten)`)
//! - **[`QuerySet`]**: Ordered, immutable snapshot supporting chained queries
//! - **[`lookup`]**: Registry of `field__operator` lookups used by filters
//! - **[`spatial`]**: Haversine/Vincenty distances, bearings, midpoints and bounding boxes
//!
//! # Ownership
//!
//! Containers own their children through [`Handle`]s; children point back to their
//! folder through a weak link, so the containment graph stays a tree. Every
//! [`QuerySet`] derived from a container shares the same handles, so an update made
//! through one of them is visible through all of them.

mod coordinate;
mod document;
mod element;
mod folder;
mod handle;
pub mod lookup;
mod manager;
mod multigeometry;
mod path;
mod placemark;
mod point;
mod polygon;
mod queryset;
pub mod spatial;
pub mod utils;

// Public API exports
pub use coordinate::{Coordinate, IntoCoordinate, parse_coordinate_list};
pub use document::KmlDocument;
pub use element::{AnyElement, Element, ElementBase};
pub use folder::Folder;
pub use handle::Handle;
pub use manager::{Collected, Manager};
pub use multigeometry::{Geometry, GeometryCounts, MultiGeometry};
pub use path::Path;
pub use placemark::Placemark;
pub use point::{AltitudeMode, Point};
pub use polygon::Polygon;
pub use queryset::QuerySet;
pub use spatial::{
    DistanceUnit, HasCoordinates, SpatialCalculator, SpatialConfig, StrategyKind,
};

pub use serde_json::{Map, Value};

/// Query keyword arguments echoed back in query errors, in call order
pub type QueryKwargs = Vec<(String, Value)>;

/// Discriminator for the kinds of [`KmlError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCoordinates,
    Validation,
    Query,
    ElementNotFound,
    MultipleElementsReturned,
    UnknownAttribute,
    Usage,
    Parse,
}

/// Error types for the query engine
///
/// Every failure surfaced by this crate is one of these variants, so callers can
/// match on a specific kind first and fall back to the whole enum as a catch-all.
#[derive(Debug, thiserror::Error)]
pub enum KmlError {
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates {
        message: String,
        /// The offending coordinate literal, when one is available
        coordinates: Option<String>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<Value>,
    },

    #[error("{message}")]
    Query {
        message: String,
        query_field: Option<String>,
    },

    #[error("{}", not_found_message(.element_type, .query_kwargs))]
    ElementNotFound {
        element_type: String,
        query_kwargs: QueryKwargs,
    },

    #[error("{}", multiple_message(.element_type, .count, .query_kwargs))]
    MultipleElementsReturned {
        element_type: String,
        count: usize,
        query_kwargs: QueryKwargs,
    },

    #[error("'{element_type}' object has no attribute '{attribute}'")]
    UnknownAttribute {
        element_type: String,
        attribute: String,
    },

    #[error("{0}")]
    Usage(String),

    #[error("KML parse error: {message}")]
    Parse {
        message: String,
        /// File name or URL the upstream builder was reading
        source_name: Option<String>,
    },
}

impl KmlError {
    pub fn invalid_coordinates(message: impl Into<String>, coordinates: Option<String>) -> Self {
        Self::InvalidCoordinates {
            message: message.into(),
            coordinates,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: &str, value: Value) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            value: Some(value),
        }
    }

    pub fn query(message: impl Into<String>, query_field: Option<&str>) -> Self {
        Self::Query {
            message: message.into(),
            query_field: query_field.map(str::to_string),
        }
    }

    /// Build the error an upstream document builder reports for unreadable input
    pub fn parse(message: impl Into<String>, source_name: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source_name,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCoordinates { .. } => ErrorKind::InvalidCoordinates,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Query { .. } => ErrorKind::Query,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::MultipleElementsReturned { .. } => ErrorKind::MultipleElementsReturned,
            Self::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Query keyword arguments carried by `get()` failures
    pub fn query_kwargs(&self) -> Option<&QueryKwargs> {
        match self {
            Self::ElementNotFound { query_kwargs, .. }
            | Self::MultipleElementsReturned { query_kwargs, .. } => Some(query_kwargs),
            _ => None,
        }
    }
}

fn format_kwargs(query_kwargs: &QueryKwargs) -> String {
    query_kwargs
        .iter()
        .map(|(key, value)| format!("{key}={}", utils::value_to_string(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn not_found_message(element_type: &str, query_kwargs: &QueryKwargs) -> String {
    if query_kwargs.is_empty() {
        format!("{element_type} does not exist.")
    } else {
        format!(
            "{element_type} matching query({}) does not exist.",
            format_kwargs(query_kwargs)
        )
    }
}

fn multiple_message(element_type: &str, count: &usize, query_kwargs: &QueryKwargs) -> String {
    if query_kwargs.is_empty() {
        format!("get() returned more than one {element_type} -- it returned {count}!")
    } else {
        format!(
            "get() returned more than one {element_type} -- it returned {count}! Lookup was: {}",
            format_kwargs(query_kwargs)
        )
    }
}

pub type Result<T> = std::result::Result<T, KmlError>;
