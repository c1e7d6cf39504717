//! Field lookups: `field` or `field__operator` keys used by filters
//!
//! Each operator name maps to a function that turns the query value into a
//! [`Predicate`]. Building the predicate validates the query value once, so a bad
//! operator or a malformed regex fails before any element is inspected.
//!
//! Null or missing field values only ever match `isnull=true`.

use crate::{Element, KmlError, Result, utils};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;

/// Separator between the field path and the operator
pub const LOOKUP_SEPARATOR: &str = "__";

/// Operator used when a key has no suffix
pub const DEFAULT_OPERATOR: &str = "exact";

/// Turns a query value into a predicate; `field` is only used in error messages
type PredicateBuilder = fn(field: &str, value: Value) -> Result<Predicate>;

/// The operator registry
const REGISTRY: &[(&str, PredicateBuilder)] = &[
    ("exact", build_exact),
    ("iexact", build_iexact),
    ("contains", build_contains),
    ("icontains", build_icontains),
    ("startswith", build_startswith),
    ("istartswith", build_istartswith),
    ("endswith", build_endswith),
    ("iendswith", build_iendswith),
    ("regex", build_regex),
    ("iregex", build_iregex),
    ("gt", build_gt),
    ("gte", build_gte),
    ("lt", build_lt),
    ("lte", build_lte),
    ("in", build_in),
    ("range", build_range),
    ("isnull", build_isnull),
];

/// Names of every supported operator, in registry order
pub fn operators() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

pub fn is_supported(operator: &str) -> bool {
    REGISTRY.iter().any(|(name, _)| *name == operator)
}

/// A compiled test against one field value
#[derive(Debug, Clone)]
pub enum Predicate {
    Exact(Value),
    IExact(String),
    Contains(String),
    IContains(String),
    StartsWith(String),
    IStartsWith(String),
    EndsWith(String),
    IEndsWith(String),
    Regex(Regex),
    /// Matches when the field compares to the value with one of the orderings
    Compare(Value, &'static [Ordering]),
    In(Vec<Value>),
    /// `in` against a string: substring membership
    InText(String),
    Range(Value, Value),
    IsNull(bool),
}

impl Predicate {
    /// Test a field value; `None` means the element has no such field
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = match value {
            None | Some(Value::Null) => return matches!(self, Predicate::IsNull(true)),
            Some(value) => value,
        };
        match self {
            Predicate::Exact(expected) => utils::values_equal(value, expected),
            Predicate::IExact(expected) => lowered(value) == *expected,
            Predicate::Contains(needle) => text(value).contains(needle.as_str()),
            Predicate::IContains(needle) => lowered(value).contains(needle.as_str()),
            Predicate::StartsWith(prefix) => text(value).starts_with(prefix.as_str()),
            Predicate::IStartsWith(prefix) => lowered(value).starts_with(prefix.as_str()),
            Predicate::EndsWith(suffix) => text(value).ends_with(suffix.as_str()),
            Predicate::IEndsWith(suffix) => lowered(value).ends_with(suffix.as_str()),
            Predicate::Regex(re) => re.is_match(&text(value)),
            Predicate::Compare(bound, accepted) => utils::compare_values(value, bound)
                .is_some_and(|ordering| accepted.contains(&ordering)),
            Predicate::In(candidates) => candidates.iter().any(|c| utils::values_equal(value, c)),
            Predicate::InText(haystack) => haystack.contains(text(value).as_str()),
            Predicate::Range(low, high) => {
                utils::compare_values(low, value).is_some_and(Ordering::is_le)
                    && utils::compare_values(value, high).is_some_and(Ordering::is_le)
            }
            Predicate::IsNull(expected) => !*expected,
        }
    }
}

/// One parsed `field__operator=value` condition
#[derive(Debug, Clone)]
pub struct Lookup {
    field: String,
    operator: &'static str,
    predicate: Predicate,
}

impl Lookup {
    /// Parse a lookup key and compile its predicate
    ///
    /// # Errors
    /// [`KmlError::Query`] for an unsupported operator, an empty field name or a query
    /// value the operator cannot use.
    pub fn parse(key: &str, value: Value) -> Result<Self> {
        let (field, operator) = match key.rsplit_once(LOOKUP_SEPARATOR) {
            Some((field, operator)) => (field, operator),
            None => (key, DEFAULT_OPERATOR),
        };
        if field.is_empty() {
            return Err(KmlError::query(
                format!("Lookup '{key}' has no field name"),
                Some(key),
            ));
        }
        let &(operator, build) = REGISTRY
            .iter()
            .find(|(name, _)| *name == operator)
            .ok_or_else(|| {
                KmlError::query(
                    format!("Unsupported lookup type: '{operator}' in '{key}'"),
                    Some(field),
                )
            })?;
        Ok(Self {
            field: field.to_string(),
            operator,
            predicate: build(field, value)?,
        })
    }

    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    pub fn operator(&self) -> &'static str {
        self.operator
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn matches<T: Element>(&self, element: &T) -> bool {
        self.predicate.matches(element.field(&self.field).as_ref())
    }
}

/// Parse every lookup of one filter call; they are combined with AND
pub fn parse_lookups<I, K, V>(lookups: I) -> Result<Vec<Lookup>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    lookups
        .into_iter()
        .map(|(key, value)| Lookup::parse(key.as_ref(), value.into()))
        .collect()
}

fn text(value: &Value) -> String {
    utils::value_to_string(value)
}

fn lowered(value: &Value) -> String {
    text(value).to_lowercase()
}

fn build_exact(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Exact(value))
}

fn build_iexact(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::IExact(lowered(&value)))
}

fn build_contains(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Contains(text(&value)))
}

fn build_icontains(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::IContains(lowered(&value)))
}

fn build_startswith(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::StartsWith(text(&value)))
}

fn build_istartswith(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::IStartsWith(lowered(&value)))
}

fn build_endswith(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::EndsWith(text(&value)))
}

fn build_iendswith(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::IEndsWith(lowered(&value)))
}

fn build_gt(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Compare(value, &[Ordering::Greater]))
}

fn build_gte(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Compare(value, &[Ordering::Greater, Ordering::Equal]))
}

fn build_lt(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Compare(value, &[Ordering::Less]))
}

fn build_lte(_: &str, value: Value) -> Result<Predicate> {
    Ok(Predicate::Compare(value, &[Ordering::Less, Ordering::Equal]))
}

fn build_regex(field: &str, value: Value) -> Result<Predicate> {
    compile_regex(field, &value, false)
}

fn build_iregex(field: &str, value: Value) -> Result<Predicate> {
    compile_regex(field, &value, true)
}

fn compile_regex(field: &str, value: &Value, case_insensitive: bool) -> Result<Predicate> {
    let pattern = text(value);
    RegexBuilder::new(&pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map(Predicate::Regex)
        .map_err(|err| {
            KmlError::query(
                format!("Invalid regular expression '{pattern}': {err}"),
                Some(field),
            )
        })
}

fn build_in(field: &str, value: Value) -> Result<Predicate> {
    match value {
        Value::Array(items) => Ok(Predicate::In(items)),
        Value::String(s) => Ok(Predicate::InText(s)),
        Value::Object(map) => Ok(Predicate::In(
            map.keys().cloned().map(Value::String).collect(),
        )),
        other => Err(KmlError::query(
            format!("'in' lookup on '{field}' needs a list, got {other}"),
            Some(field),
        )),
    }
}

fn build_range(field: &str, value: Value) -> Result<Predicate> {
    match value {
        Value::Array(mut items) if items.len() == 2 => {
            let high = items.pop().unwrap_or(Value::Null);
            let low = items.pop().unwrap_or(Value::Null);
            Ok(Predicate::Range(low, high))
        }
        other => Err(KmlError::query(
            format!("'range' lookup on '{field}' needs exactly two bounds, got {other}"),
            Some(field),
        )),
    }
}

fn build_isnull(field: &str, value: Value) -> Result<Predicate> {
    match value {
        Value::Bool(b) => Ok(Predicate::IsNull(b)),
        other => Err(KmlError::query(
            format!("'isnull' lookup on '{field}' needs a boolean, got {other}"),
            Some(field),
        )),
    }
}
