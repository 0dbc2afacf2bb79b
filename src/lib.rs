//! GraphQL response shaping for Dgraph query results.
//!
//! Executing a rewritten database query yields a physical result tree:
//! linked lists of attribute-tagged nodes whose leaves carry pre-encoded
//! JSON. This crate joins that tree with the operation's selection set and
//! produces the GraphQL response body: keys in selection order, `[]`/`null`
//! filling, non-null violations bubbled to the nearest nullable ancestor,
//! `@skip`/`@include` and interface fragments honored, `__typename`
//! resolved from the harvested type predicate, and GeoJSON values completed
//! into their GraphQL object shapes.
//!
//! The entry point is [`encoder::encode_graphql`].

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod encoder;
pub mod graphql;
pub mod interner;
pub mod json_ext;
pub mod schema;
pub mod tree;

pub use encoder::encode_graphql;
pub use graphql::Response;
pub use schema::Field;
pub use schema::FieldType;
pub use tree::NodeId;
pub use tree::ResultTree;
