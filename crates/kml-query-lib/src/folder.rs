//! Folder container
//!
//! A folder owns one ordered collection per element type plus its nested folders.
//! Collections are only reachable through the per-type [`Manager`]s, which keep the
//! parent links of the children in sync.

use crate::{
    AnyElement, Element, ElementBase, Handle, Manager, MultiGeometry, Path, Placemark, Point,
    Polygon, Result,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct Folder {
    base: ElementBase,
    pub(crate) placemarks: Vec<Handle<Placemark>>,
    pub(crate) folders: Vec<Handle<Folder>>,
    pub(crate) paths: Vec<Handle<Path>>,
    pub(crate) polygons: Vec<Handle<Polygon>>,
    pub(crate) points: Vec<Handle<Point>>,
    pub(crate) multigeometries: Vec<Handle<MultiGeometry>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Folder {
    pub fn new(base: ElementBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ElementBase::named(name))
    }

    /// Direct children of every type, grouped by type
    pub fn all_elements(&self) -> Vec<AnyElement> {
        let mut elements = Vec::with_capacity(self.total_element_count());
        elements.extend(self.placemarks.iter().cloned().map(AnyElement::Placemark));
        elements.extend(self.folders.iter().cloned().map(AnyElement::Folder));
        elements.extend(self.paths.iter().cloned().map(AnyElement::Path));
        elements.extend(self.polygons.iter().cloned().map(AnyElement::Polygon));
        elements.extend(self.points.iter().cloned().map(AnyElement::Point));
        elements.extend(
            self.multigeometries
                .iter()
                .cloned()
                .map(AnyElement::MultiGeometry),
        );
        elements
    }

    /// Number of direct children across all types (not recursive)
    pub fn total_element_count(&self) -> usize {
        self.placemarks.len()
            + self.folders.len()
            + self.paths.len()
            + self.polygons.len()
            + self.points.len()
            + self.multigeometries.len()
    }

    pub(crate) fn counts(&self) -> [(&'static str, usize); 6] {
        [
            ("placemark_count", self.placemarks.len()),
            ("folder_count", self.folders.len()),
            ("path_count", self.paths.len()),
            ("polygon_count", self.polygons.len()),
            ("point_count", self.points.len()),
            ("multigeometry_count", self.multigeometries.len()),
        ]
    }
}

/// Managers for the children of a shared folder
impl Handle<Folder> {
    pub fn placemarks(&self) -> Manager<Placemark> {
        Manager::attached(self.clone())
    }

    pub fn folders(&self) -> Manager<Folder> {
        Manager::attached(self.clone())
    }

    pub fn paths(&self) -> Manager<Path> {
        Manager::attached(self.clone())
    }

    pub fn polygons(&self) -> Manager<Polygon> {
        Manager::attached(self.clone())
    }

    pub fn points(&self) -> Manager<Point> {
        Manager::attached(self.clone())
    }

    pub fn multigeometries(&self) -> Manager<MultiGeometry> {
        Manager::attached(self.clone())
    }

    /// True when `other` is `self` or reachable through nested folder collections
    ///
    /// Walks ownership rather than parent links, so folder copies that share their
    /// sub-folders are seen too.
    pub(crate) fn subtree_contains(&self, other: &Handle<Folder>) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(folder) = stack.pop() {
            if folder.ptr_eq(other) {
                return true;
            }
            if visited.insert(folder.addr()) {
                stack.extend(folder.borrow().folders.iter().cloned());
            }
        }
        false
    }
}

impl Element for Folder {
    const ELEMENT_TYPE: &'static str = "Folder";
    const FIELDS: &'static [&'static str] = &[];

    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn own_field(&self, name: &str) -> Option<Value> {
        if name == "total_element_count" {
            return Some(Value::from(self.total_element_count()));
        }
        self.counts()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, count)| Value::from(count))
    }

    fn set_own_field(&mut self, _name: &str, _value: Value) -> Result<bool> {
        Ok(false)
    }

    fn validate(&self) -> Result<()> {
        self.base.validate()
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut map = self.base.to_dict(Self::ELEMENT_TYPE);
        for (key, count) in self.counts() {
            map.insert(key.to_string(), Value::from(count));
        }
        map
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt_label(f, Self::ELEMENT_TYPE)
    }
}
