//! Document root: document metadata plus one manager per element type
//!
//! Elements placed directly at the document level have no parent folder.

use crate::{
    AnyElement, Folder, Handle, Manager, MultiGeometry, Path, Placemark, Point, Polygon, Result,
};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct KmlDocument {
    pub name: Option<String>,
    pub description: Option<String>,
    root: Handle<Folder>,
}

impl Default for KmlDocument {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl KmlDocument {
    pub fn new(name: Option<String>, description: Option<String>) -> Self {
        Self {
            name,
            description,
            root: Handle::new(Folder::default()),
        }
    }

    /// Build a document from the top-level elements a builder produced
    ///
    /// # Errors
    /// Propagates the first failure of [`Manager::add`].
    pub fn from_elements(
        name: Option<String>,
        description: Option<String>,
        elements: impl IntoIterator<Item = AnyElement>,
    ) -> Result<Self> {
        let document = Self::new(name, description);
        for element in elements {
            document.add_element(element)?;
        }
        tracing::debug!(
            "Loaded document '{}' with {} top-level element(s)",
            document,
            document.root.borrow().total_element_count()
        );
        Ok(document)
    }

    /// Place an element at the document level, routed by its type
    pub fn add_element(&self, element: AnyElement) -> Result<()> {
        match element {
            AnyElement::Placemark(h) => self.placemarks().add(h).map(drop),
            AnyElement::Folder(h) => self.folders().add(h).map(drop),
            AnyElement::Path(h) => self.paths().add(h).map(drop),
            AnyElement::Polygon(h) => self.polygons().add(h).map(drop),
            AnyElement::Point(h) => self.points().add(h).map(drop),
            AnyElement::MultiGeometry(h) => self.multigeometries().add(h).map(drop),
        }
    }

    pub fn placemarks(&self) -> Manager<Placemark> {
        Manager::root(self.root.clone())
    }

    pub fn folders(&self) -> Manager<Folder> {
        Manager::root(self.root.clone())
    }

    pub fn paths(&self) -> Manager<Path> {
        Manager::root(self.root.clone())
    }

    pub fn polygons(&self) -> Manager<Polygon> {
        Manager::root(self.root.clone())
    }

    pub fn points(&self) -> Manager<Point> {
        Manager::root(self.root.clone())
    }

    pub fn multigeometries(&self) -> Manager<MultiGeometry> {
        Manager::root(self.root.clone())
    }

    /// Top-level elements of every type, grouped by type
    pub fn all_elements(&self) -> Vec<AnyElement> {
        self.root.borrow().all_elements()
    }

    /// Number of top-level elements per type, keyed by collection name
    pub fn element_counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("placemarks", self.placemarks().count()),
            ("folders", self.folders().count()),
            ("paths", self.paths().count()),
            ("polygons", self.polygons().count()),
            ("points", self.points().count()),
            ("multigeometries", self.multigeometries().count()),
        ])
    }
}

impl fmt::Display for KmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => f.write_str(name),
            None => f.write_str("KmlDocument(unnamed)"),
        }
    }
}
