//! Element base contract shared by every geometry and container
//!
//! Declared fields are typed struct members. Anything else a builder attaches ends up
//! in an explicit extension map; [`Element::update`] only ever writes to one of those
//! two places and refuses unknown keys.

use crate::{
    Coordinate, Folder, Handle, KmlError, MultiGeometry, Path, Placemark, Point, Polygon, Result,
};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// Attributes common to every element
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementBase {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: bool,
    /// Attributes that are not declared fields of the element type
    extensions: Map<String, Value>,
    /// Owning container, set by managers only
    #[cfg_attr(feature = "serde", serde(skip))]
    owner: Option<Weak<RefCell<Folder>>>,
    /// The owner is a document root, which is never reported as a parent
    #[cfg_attr(feature = "serde", serde(skip))]
    root_owned: bool,
}

impl Default for ElementBase {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            description: None,
            visibility: true,
            extensions: Map::new(),
            owner: None,
            root_owned: false,
        }
    }
}

impl fmt::Debug for ElementBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("visibility", &self.visibility)
            .field("extensions", &self.extensions)
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

/// The parent link never takes part in equality
impl PartialEq for ElementBase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.visibility == other.visibility
            && self.extensions == other.extensions
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ElementBase {
    pub const FIELDS: &'static [&'static str] = &["id", "name", "description", "visibility"];

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    #[inline]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Owning folder, if this element is attached to one that is still alive
    ///
    /// Elements placed at the document root have an owner but no parent.
    pub fn parent(&self) -> Option<Handle<Folder>> {
        if self.root_owned {
            return None;
        }
        self.owner()
    }

    /// Container holding this element, the document root included
    pub(crate) fn owner(&self) -> Option<Handle<Folder>> {
        self.owner
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Handle::from_rc)
    }

    pub(crate) fn set_parent(&mut self, parent: Option<&Handle<Folder>>) {
        self.owner = parent.map(Handle::downgrade);
        self.root_owned = false;
    }

    pub(crate) fn set_root_owner(&mut self, root: &Handle<Folder>) {
        self.owner = Some(root.downgrade());
        self.root_owned = true;
    }

    /// Base checks every element runs before its own
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.extensions.keys().find(|k| k.is_empty()) {
            return Err(KmlError::validation_field(
                "Extension attribute names must not be empty",
                "extensions",
                Value::String(key.clone()),
            ));
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(opt_string(&self.id)),
            "name" => Some(opt_string(&self.name)),
            "description" => Some(opt_string(&self.description)),
            "visibility" => Some(Value::Bool(self.visibility)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<bool> {
        match name {
            "id" => self.id = expect_string("id", value)?,
            "name" => self.name = expect_string("name", value)?,
            "description" => self.description = expect_string("description", value)?,
            "visibility" => self.visibility = expect_bool("visibility", value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Export the base fields, then the extension attributes
    pub(crate) fn to_dict(&self, element_type: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), opt_string(&self.id));
        map.insert("name".into(), opt_string(&self.name));
        map.insert("description".into(), opt_string(&self.description));
        map.insert("visibility".into(), Value::Bool(self.visibility));
        map.insert("element_type".into(), Value::String(element_type.to_string()));
        for (key, value) in &self.extensions {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }

    /// `name`, else `<Type>(<id>)`, else `<Type>(unnamed)`
    pub(crate) fn fmt_label(&self, f: &mut fmt::Formatter<'_>, element_type: &str) -> fmt::Result {
        match (&self.name, &self.id) {
            (Some(name), _) if !name.is_empty() => f.write_str(name),
            (_, Some(id)) if !id.is_empty() => write!(f, "{element_type}({id})"),
            _ => write!(f, "{element_type}(unnamed)"),
        }
    }
}

/// Behavior shared by every element type
///
/// Implementors provide their declared fields; lookup by name, bulk update, copy and
/// dict export are built on top of that.
pub trait Element: fmt::Display + fmt::Debug + Clone + 'static {
    /// Type name used in messages and in the `element_type` discriminator
    const ELEMENT_TYPE: &'static str;

    /// Settable fields declared by the element type itself (base fields excluded)
    const FIELDS: &'static [&'static str];

    fn base(&self) -> &ElementBase;

    fn base_mut(&mut self) -> &mut ElementBase;

    /// Value of a field declared by the element type
    ///
    /// `None` means the element has no such attribute; `Some(Value::Null)` means it is
    /// declared but unset. Read-only derived attributes are exposed here as well.
    fn own_field(&self, name: &str) -> Option<Value>;

    /// Assign a declared field from a dynamic value
    ///
    /// Returns `Ok(false)` when `name` is not a declared field of this type.
    fn set_own_field(&mut self, name: &str, value: Value) -> Result<bool>;

    /// Check every declared constraint; implementations run the base check first
    fn validate(&self) -> Result<()>;

    /// Export every public field plus the `element_type` discriminator
    fn to_dict(&self) -> Map<String, Value>;

    /// Single position of the element, for elements that have one
    fn coordinates(&self) -> Option<Coordinate> {
        None
    }

    #[inline]
    fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    #[inline]
    fn name(&self) -> Option<&str> {
        self.base().name.as_deref()
    }

    #[inline]
    fn description(&self) -> Option<&str> {
        self.base().description.as_deref()
    }

    #[inline]
    fn visibility(&self) -> bool {
        self.base().visibility
    }

    fn parent(&self) -> Option<Handle<Folder>> {
        self.base().parent()
    }

    /// True when `name` is a declared field or an extension attribute already set
    fn has_attribute(&self, name: &str) -> bool {
        ElementBase::FIELDS.contains(&name)
            || Self::FIELDS.contains(&name)
            || self.base().extensions.contains_key(name)
    }

    /// Resolve a field by name, following dotted paths into nested values
    ///
    /// Resolution order is base fields, declared fields, derived attributes, then
    /// extension attributes. `None` means the path does not exist on this element.
    fn field(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let head = parts.next()?;
        let mut current = if head == "element_type" {
            Some(Value::String(Self::ELEMENT_TYPE.to_string()))
        } else {
            self.base()
                .field(head)
                .or_else(|| self.own_field(head))
                .or_else(|| self.base().extensions.get(head).cloned())
        }?;
        for part in parts {
            current = descend(&current, part)?;
        }
        Some(current)
    }

    /// Set several attributes at once
    ///
    /// Every key must name a declared field or an extension attribute that already
    /// exists. Values are type checked. Nothing is written unless every assignment
    /// succeeds.
    ///
    /// # Errors
    /// [`KmlError::UnknownAttribute`] for an unknown key, [`KmlError::Validation`] for a
    /// value of the wrong type.
    fn update<I, K, V>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Vec<(String, Value)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if let Some((key, _)) = fields.iter().find(|(key, _)| !self.has_attribute(key)) {
            return Err(KmlError::UnknownAttribute {
                element_type: Self::ELEMENT_TYPE.to_string(),
                attribute: key.clone(),
            });
        }

        let mut staged = self.clone();
        for (key, value) in fields {
            if staged.base_mut().set_field(&key, value.clone())? {
                continue;
            }
            if staged.set_own_field(&key, value.clone())? {
                continue;
            }
            staged.base_mut().extensions.insert(key, value);
        }
        *self = staged;
        Ok(())
    }

    /// Attach an extension attribute, creating it if needed
    ///
    /// This is how builders record attributes the element type does not declare; later
    /// calls to [`Element::update`] may then overwrite it.
    fn set_extension(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if ElementBase::FIELDS.contains(&key.as_str()) || Self::FIELDS.contains(&key.as_str()) {
            return Err(KmlError::validation_field(
                format!("'{key}' is a declared field of {}", Self::ELEMENT_TYPE),
                "extensions",
                Value::String(key),
            ));
        }
        self.base_mut().extensions.insert(key, value.into());
        Ok(())
    }

    /// A detached copy: same field values, no parent
    fn copy(&self) -> Self {
        let mut copy = self.clone();
        copy.base_mut().set_parent(None);
        copy
    }
}

fn descend(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(key).cloned(),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        _ => None,
    }
}

#[inline]
pub(crate) fn opt_string(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

/// Accept a string or null for an optional string field
pub(crate) fn expect_string(field: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(KmlError::validation_field(
            format!("{field} must be a string"),
            field,
            other,
        )),
    }
}

pub(crate) fn expect_bool(field: &str, value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(KmlError::validation_field(
            format!("{field} must be a boolean"),
            field,
            other,
        )),
    }
}

/// Accept a mapping or null for an optional mapping field
pub(crate) fn expect_mapping(field: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(KmlError::validation_field(
            format!("{field} must be a dictionary"),
            field,
            other,
        )),
    }
}

/// Any element, for heterogeneous listings
#[derive(Debug, Clone)]
pub enum AnyElement {
    Placemark(Handle<Placemark>),
    Folder(Handle<Folder>),
    Path(Handle<Path>),
    Polygon(Handle<Polygon>),
    Point(Handle<Point>),
    MultiGeometry(Handle<MultiGeometry>),
}

macro_rules! with_element {
    ($any:expr, $e:ident => $body:expr) => {
        match $any {
            AnyElement::Placemark(h) => {
                let $e = h.borrow();
                $body
            }
            AnyElement::Folder(h) => {
                let $e = h.borrow();
                $body
            }
            AnyElement::Path(h) => {
                let $e = h.borrow();
                $body
            }
            AnyElement::Polygon(h) => {
                let $e = h.borrow();
                $body
            }
            AnyElement::Point(h) => {
                let $e = h.borrow();
                $body
            }
            AnyElement::MultiGeometry(h) => {
                let $e = h.borrow();
                $body
            }
        }
    };
}

impl AnyElement {
    pub fn element_type(&self) -> &'static str {
        match self {
            AnyElement::Placemark(_) => Placemark::ELEMENT_TYPE,
            AnyElement::Folder(_) => Folder::ELEMENT_TYPE,
            AnyElement::Path(_) => Path::ELEMENT_TYPE,
            AnyElement::Polygon(_) => Polygon::ELEMENT_TYPE,
            AnyElement::Point(_) => Point::ELEMENT_TYPE,
            AnyElement::MultiGeometry(_) => MultiGeometry::ELEMENT_TYPE,
        }
    }

    pub fn name(&self) -> Option<String> {
        with_element!(self, e => e.name().map(str::to_string))
    }

    pub fn field(&self, path: &str) -> Option<Value> {
        with_element!(self, e => e.field(path))
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        with_element!(self, e => e.to_dict())
    }

    pub fn validate(&self) -> Result<()> {
        with_element!(self, e => e.validate())
    }

    pub fn coordinates(&self) -> Option<Coordinate> {
        with_element!(self, e => Element::coordinates(&*e))
    }
}

impl fmt::Display for AnyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_element!(self, e => fmt::Display::fmt(&*e, f))
    }
}
