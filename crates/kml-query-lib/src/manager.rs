//! Per-type managers over a container's children
//!
//! A [`Manager`] is a lightweight view: it holds the owning folder and produces a
//! fresh [`QuerySet`] on every call. Traversal never mutates anything.

use crate::{
    Element, Folder, Handle, KmlError, MultiGeometry, Path, Placemark, Point, Polygon, QuerySet,
    Result,
};
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Element types a [`Folder`] keeps a collection of
pub trait Collected: Element + Sized {
    /// Nested folders are themselves the collected elements
    const IS_FOLDER: bool = false;

    fn collection(folder: &Folder) -> &Vec<Handle<Self>>;

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>>;

    /// The folder itself as an element of this type, for pre-order folder listings
    fn from_folder(_folder: &Handle<Folder>) -> Option<Handle<Self>> {
        None
    }

    /// Reject insertions that would break the tree shape
    fn check_insert(_owner: &Handle<Folder>, _item: &Handle<Self>) -> Result<()> {
        Ok(())
    }
}

impl Collected for Placemark {
    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.placemarks
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.placemarks
    }
}

impl Collected for Folder {
    const IS_FOLDER: bool = true;

    fn from_folder(folder: &Handle<Folder>) -> Option<Handle<Self>> {
        Some(folder.clone())
    }

    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.folders
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.folders
    }

    fn check_insert(owner: &Handle<Folder>, item: &Handle<Self>) -> Result<()> {
        if item.subtree_contains(owner) {
            return Err(KmlError::validation(format!(
                "Cannot add folder '{}' to itself or one of its descendants",
                item
            )));
        }
        Ok(())
    }
}

impl Collected for Path {
    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.paths
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.paths
    }
}

impl Collected for Polygon {
    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.polygons
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.polygons
    }
}

impl Collected for Point {
    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.points
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.points
    }
}

impl Collected for MultiGeometry {
    fn collection(folder: &Folder) -> &Vec<Handle<Self>> {
        &folder.multigeometries
    }

    fn collection_mut(folder: &mut Folder) -> &mut Vec<Handle<Self>> {
        &mut folder.multigeometries
    }
}

/// Entry point for the elements of one type owned by one container
///
/// Managers obtained from a [`Folder`] handle set the parent link of the elements they
/// add; the managers of a [`crate::KmlDocument`] leave root-level elements unparented.
/// Either way the element remembers its container, so it is only ever held by one.
pub struct Manager<T: Collected> {
    owner: Handle<Folder>,
    root: bool,
    _marker: PhantomData<T>,
}

impl<T: Collected> Clone for Manager<T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            root: self.root,
            _marker: PhantomData,
        }
    }
}

impl<T: Collected> std::fmt::Debug for Manager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("element_type", &T::ELEMENT_TYPE)
            .field("count", &self.count())
            .field("root", &self.root)
            .finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<T: Collected> Manager<T> {
    pub(crate) fn attached(owner: Handle<Folder>) -> Self {
        Self {
            owner,
            root: false,
            _marker: PhantomData,
        }
    }

    pub(crate) fn root(owner: Handle<Folder>) -> Self {
        Self {
            owner,
            root: true,
            _marker: PhantomData,
        }
    }

    /// Elements directly owned by this container, in document order
    pub fn children(&self) -> QuerySet<T> {
        QuerySet::new(T::collection(&self.owner.borrow()).clone())
    }

    /// Direct children, or with `flatten` every element of this type in the subtree
    ///
    /// Flattening is a depth-first pre-order walk in document order: the container's own
    /// elements first, then each sub-folder's subtree in turn. Every element appears once.
    pub fn all(&self, flatten: bool) -> QuerySet<T> {
        if !flatten {
            return self.children();
        }
        #[cfg(feature = "profiling")]
        profiling::scope!("manager::flatten");
        let mut elements = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::from([self.owner.addr()]);
        collect_flat(&self.owner, &mut elements, &mut seen, &mut visited);
        tracing::trace!(
            "Flattened {} {} element(s) under '{}'",
            elements.len(),
            T::ELEMENT_TYPE,
            self.owner
        );
        QuerySet::new(elements)
    }

    /// Number of direct children
    pub fn count(&self) -> usize {
        T::collection(&self.owner.borrow()).len()
    }

    pub fn exists(&self) -> bool {
        self.count() > 0
    }

    /// Attach an element to this container
    ///
    /// Adding an element that is already a child is a no-op. An element held by another
    /// container, the document root included, is moved here.
    ///
    /// # Errors
    /// [`KmlError::Validation`] when adding a folder to itself or to any folder inside
    /// its subtree.
    pub fn add(&self, item: impl Into<Handle<T>>) -> Result<Handle<T>> {
        let item = item.into();
        T::check_insert(&self.owner, &item)?;

        let already_child = T::collection(&self.owner.borrow())
            .iter()
            .any(|h| h.ptr_eq(&item));
        if already_child {
            return Ok(item);
        }

        let previous = item.borrow().base().owner();
        if let Some(previous) = previous {
            T::collection_mut(&mut previous.borrow_mut()).retain(|h| !h.ptr_eq(&item));
        }
        if self.root {
            item.borrow_mut().base_mut().set_root_owner(&self.owner);
        } else {
            item.borrow_mut().base_mut().set_parent(Some(&self.owner));
        }
        T::collection_mut(&mut self.owner.borrow_mut()).push(item.clone());
        Ok(item)
    }

    /// Build an element from field values, validate it and attach it
    pub fn create<I, K, V>(&self, fields: I) -> Result<Handle<T>>
    where
        T: Default,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut element = T::default();
        element.update(fields)?;
        element.validate()?;
        self.add(element)
    }

    /// Detach a direct child; returns false when it was not a child
    pub fn remove(&self, item: &Handle<T>) -> bool {
        let removed = {
            let mut owner = self.owner.borrow_mut();
            let collection = T::collection_mut(&mut owner);
            let before = collection.len();
            collection.retain(|h| !h.ptr_eq(item));
            collection.len() != before
        };
        if removed {
            item.borrow_mut().base_mut().set_parent(None);
        }
        removed
    }

    /// Detach every direct child
    pub fn clear(&self) {
        let removed = std::mem::take(T::collection_mut(&mut self.owner.borrow_mut()));
        for item in &removed {
            item.borrow_mut().base_mut().set_parent(None);
        }
    }

    // Shortcuts over the direct children

    pub fn filter<I, K, V>(&self, lookups: I) -> Result<QuerySet<T>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.children().filter(lookups)
    }

    pub fn exclude<I, K, V>(&self, lookups: I) -> Result<QuerySet<T>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.children().exclude(lookups)
    }

    pub fn get<I, K, V>(&self, lookups: I) -> Result<Handle<T>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.children().get(lookups)
    }

    pub fn first(&self) -> Option<Handle<T>> {
        T::collection(&self.owner.borrow()).first().cloned()
    }

    pub fn last(&self) -> Option<Handle<T>> {
        T::collection(&self.owner.borrow()).last().cloned()
    }

    pub fn order_by(&self, field: &str) -> Result<QuerySet<T>> {
        self.children().order_by(field)
    }

    pub fn none(&self) -> QuerySet<T> {
        QuerySet::empty()
    }

    pub fn near(&self, longitude: f64, latitude: f64, radius_km: f64) -> Result<QuerySet<T>> {
        self.children().near(longitude, latitude, radius_km)
    }

    pub fn within_bounds(
        &self,
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    ) -> Result<QuerySet<T>> {
        self.children().within_bounds(north, south, east, west)
    }

    pub fn has_coordinates(&self) -> QuerySet<T> {
        self.children().has_coordinates()
    }

    pub fn valid_coordinates(&self) -> QuerySet<T> {
        self.children().valid_coordinates()
    }
}

/// Pre-order walk; `visited` holds the folders already descended into
fn collect_flat<T: Collected>(
    folder: &Handle<Folder>,
    out: &mut Vec<Handle<T>>,
    seen: &mut HashSet<usize>,
    visited: &mut HashSet<usize>,
) {
    let folder = folder.borrow();
    if !T::IS_FOLDER {
        for item in T::collection(&folder) {
            if seen.insert(item.addr()) {
                out.push(item.clone());
            }
        }
    }
    for sub in &folder.folders {
        if !visited.insert(sub.addr()) {
            continue;
        }
        if let Some(item) = T::from_folder(sub) {
            out.push(item);
        }
        collect_flat(sub, out, seen, visited);
    }
}
