use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::schema::MULTI_POLYGON;
use crate::schema::POINT;
use crate::schema::POLYGON;

/// Marker error carried through the shaper when a value cannot be completed
/// and the failure must bubble up to the nearest nullable ancestor.
#[derive(Debug)]
pub struct InvalidValue;

/// A GraphQL type reference, e.g. `[Author!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// a named, nullable type
    Named(String),
    /// a non-null wrapper
    NonNull(Box<FieldType>),
    /// a list wrapper
    List(Box<FieldType>),
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        FieldType::Named(name.into())
    }

    pub fn non_null(self) -> Self {
        FieldType::NonNull(Box::new(self))
    }

    pub fn list(self) -> Self {
        FieldType::List(Box::new(self))
    }

    /// The item type when this is a list, looking through a non-null
    /// wrapper: `[T]`, `[T]!`, `[T!]` and `[T!]!` all answer with the item.
    pub fn list_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::List(item) => Some(item),
            FieldType::NonNull(inner) => inner.list_type(),
            FieldType::Named(_) => None,
        }
    }

    /// Whether `null` is an admissible value at this exact level.
    pub fn nullable(&self) -> bool {
        !matches!(self, FieldType::NonNull(_))
    }

    /// The innermost named type.
    pub fn name(&self) -> &str {
        match self {
            FieldType::Named(name) => name,
            FieldType::NonNull(inner) | FieldType::List(inner) => inner.name(),
        }
    }

    /// Whether values of this type are GeoJSON objects needing completion.
    pub fn is_geo(&self) -> bool {
        matches!(self.name(), POINT | POLYGON | MULTI_POLYGON)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Named(name) => write!(f, "{name}"),
            FieldType::NonNull(inner) => write!(f, "{inner}!"),
            FieldType::List(inner) => write!(f, "[{inner}]"),
        }
    }
}
