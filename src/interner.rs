//! Attribute name interning.
//!
//! The query planner tags every node in a result tree with a small integer
//! id instead of the predicate name, so the shaper can compare attributes
//! without string hashing. The table is populated while the query is being
//! planned and is read-only once shaping starts.

use std::collections::HashMap;

use displaydoc::Display;
use thiserror::Error;

/// Interned identifier for an attribute name in a result tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct AttrId(u16);

/// attribute table is full: cannot hold more than {limit} names
#[derive(Error, Display, Debug, Eq, PartialEq)]
pub struct AttrTableFull {
    pub(crate) limit: usize,
}

/// Bidirectional attribute name table.
#[derive(Debug, Default)]
pub struct AttrInterner {
    ids: HashMap<String, AttrId>,
    names: Vec<String>,
}

impl AttrInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id already assigned to `attr`, or assigns the next free
    /// one. Ids are 16 bits wide, which caps the table at 65536 names.
    pub fn id_for_attr(&mut self, attr: &str) -> Result<AttrId, AttrTableFull> {
        if let Some(id) = self.ids.get(attr) {
            return Ok(*id);
        }
        let id = AttrId(u16::try_from(self.names.len()).map_err(|_| AttrTableFull {
            limit: usize::from(u16::MAX) + 1,
        })?);
        self.ids.insert(attr.to_string(), id);
        self.names.push(attr.to_string());
        Ok(id)
    }

    /// Returns the id of `attr` without assigning one.
    pub fn lookup(&self, attr: &str) -> Option<AttrId> {
        self.ids.get(attr).copied()
    }

    /// Returns the name behind `id`, or the empty string for an id this
    /// table never handed out.
    pub fn attr_for_id(&self, id: AttrId) -> &str {
        self.names
            .get(usize::from(id.0))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
