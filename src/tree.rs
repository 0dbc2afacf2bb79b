//! The physical result tree.
//!
//! Executing the rewritten database query produces an ordered tree: every
//! internal node holds a linked list of children tagged with interned
//! attribute ids, and every leaf holds an already JSON-encoded literal.
//! The planner builds the tree through the `add_*` methods; the shaper only
//! ever walks it through the read-only cursor accessors.

use displaydoc::Display;
use thiserror::Error;

use crate::interner::AttrId;
use crate::interner::AttrInterner;
use crate::interner::AttrTableFull;

/// Attribute of the synthetic node every query result hangs off.
pub const ROOT_ATTR: &str = "_root_";

/// Predicate carrying the concrete type names of a node. The planner always
/// asks for it first, so its children sit at the head of each child list.
pub const TYPE_PREDICATE: &str = "dgraph.type";

/// Synthetic uid predicate the planner appends at the end of each level.
/// It never surfaces in user-facing JSON.
pub const UID_PREDICATE: &str = "dgraph.uid";

/// Handle to a node in a [`ResultTree`]. Only valid for the tree that
/// created it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// scalar value {offset}..{end} lies outside the value arena of {arena} bytes
#[derive(Error, Display, Debug, Eq, PartialEq)]
pub struct CorruptScalar {
    pub(crate) offset: usize,
    pub(crate) end: usize,
    pub(crate) arena: usize,
}

#[derive(Clone, Copy, Debug)]
struct ValueRange {
    offset: usize,
    len: usize,
}

#[derive(Debug)]
struct Node {
    attr: AttrId,
    list: bool,
    value: Option<ValueRange>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next: Option<NodeId>,
}

/// Arena-backed result tree with a value arena for scalar bytes.
#[derive(Debug)]
pub struct ResultTree {
    nodes: Vec<Node>,
    values: Vec<u8>,
    attrs: AttrInterner,
}

impl ResultTree {
    pub fn new() -> Self {
        let mut attrs = AttrInterner::new();
        let root_attr = attrs
            .id_for_attr(ROOT_ATTR)
            .expect("an empty attribute table cannot be full");
        let root = Node {
            attr: root_attr,
            list: false,
            value: None,
            first_child: None,
            last_child: None,
            next: None,
        };
        Self {
            nodes: vec![root],
            values: Vec::new(),
            attrs,
        }
    }

    /// The synthetic `_root_` node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attaches an internal (object) node as the last child of `parent`.
    pub fn add_object(&mut self, parent: NodeId, attr: &str) -> Result<NodeId, AttrTableFull> {
        let attr = self.attrs.id_for_attr(attr)?;
        Ok(self.push_node(parent, attr, None))
    }

    /// Attaches a scalar leaf holding `json`, an already-encoded JSON
    /// literal, as the last child of `parent`.
    pub fn add_scalar(
        &mut self,
        parent: NodeId,
        attr: &str,
        json: impl AsRef<[u8]>,
    ) -> Result<NodeId, AttrTableFull> {
        let attr = self.attrs.id_for_attr(attr)?;
        let json = json.as_ref();
        let range = ValueRange {
            offset: self.values.len(),
            len: json.len(),
        };
        self.values.extend_from_slice(json);
        Ok(self.push_node(parent, attr, Some(range)))
    }

    /// Attaches a leaf with no value. This is what a top-level query that
    /// matched nothing resolves to.
    pub fn add_empty(&mut self, parent: NodeId, attr: &str) -> Result<NodeId, AttrTableFull> {
        let attr = self.attrs.id_for_attr(attr)?;
        Ok(self.push_node(parent, attr, None))
    }

    /// Flags `node` as one item of a list-valued predicate.
    pub fn mark_list(&mut self, node: NodeId) {
        self.nodes[node.index()].list = true;
    }

    fn push_node(&mut self, parent: NodeId, attr: AttrId, value: Option<ValueRange>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            attr,
            list: false,
            value,
            first_child: None,
            last_child: None,
            next: None,
        });
        match self.nodes[parent.index()].last_child {
            Some(prev) => self.nodes[prev.index()].next = Some(id),
            None => self.nodes[parent.index()].first_child = Some(id),
        }
        self.nodes[parent.index()].last_child = Some(id);
        id
    }

    pub fn attr(&self, node: NodeId) -> AttrId {
        self.nodes[node.index()].attr
    }

    pub fn is_list(&self, node: NodeId) -> bool {
        self.nodes[node.index()].list
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].first_child
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].next
    }

    /// The scalar bytes of a leaf, `None` when the leaf has no value.
    pub fn scalar_value(&self, node: NodeId) -> Result<Option<&[u8]>, CorruptScalar> {
        match self.nodes[node.index()].value {
            None => Ok(None),
            Some(ValueRange { offset, len }) => {
                let end = offset.saturating_add(len);
                self.values.get(offset..end).map(Some).ok_or(CorruptScalar {
                    offset,
                    end,
                    arena: self.values.len(),
                })
            }
        }
    }

    pub fn attr_name(&self, attr: AttrId) -> &str {
        self.attrs.attr_for_id(attr)
    }

    pub fn lookup_attr(&self, attr: &str) -> Option<AttrId> {
        self.attrs.lookup(attr)
    }
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}
