//! The response shaper.
//!
//! [`encode_graphql`] walks two differently shaped structures at the same
//! time: the physical result tree the database produced, and the selection
//! set the GraphQL layer produced. The two streams are not aligned. The
//! tree may carry internal predicates (`dgraph.type`, `dgraph.uid`) no
//! selection asked for, a selection may have no data at all, and one list
//! selection may span several consecutive tree nodes. The join advances an
//! index into the selection set and a sibling pointer into the tree, one
//! dispatch rule per iteration, and emits response JSON directly into a
//! byte buffer.
//!
//! Failure to complete a value is reported as [`InvalidValue`] and bubbles
//! up the recursion until a nullable field absorbs it by rewinding the
//! buffer and writing `null`, per the GraphQL error handling rules.

mod geo;

use bytes::Bytes;
use serde_json_bytes::Value;

use crate::graphql::Error;
use crate::graphql::Response;
use crate::interner::AttrId;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::schema::expected_non_null;
use crate::schema::Field;
use crate::schema::FieldType;
use crate::schema::InvalidValue;
use crate::schema::ERR_EXPECTED_LIST;
use crate::schema::ERR_EXPECTED_SCALAR;
use crate::schema::ERR_EXPECTED_SINGLE_ITEM;
use crate::schema::TYPENAME;
use crate::tree::NodeId;
use crate::tree::ResultTree;
use crate::tree::ROOT_ATTR;
use crate::tree::TYPE_PREDICATE;

use geo::complete_geo_object;

// The selection depth the GraphQL layer validates against is far below
// this; the guard only exists so a bypassed validation cannot overflow the
// stack.
const RECURSION_LIMIT: usize = 512;

/// Intermediate structure for arguments passed through the entire shaping.
struct FormatParameters<'a> {
    variables: &'a Object,
    errors: Vec<Error>,
}

/// Shapes the result tree hanging off `root` into a GraphQL response.
///
/// `root` must be the synthetic `_root_` node; its children carry the data
/// for `root_selections`, the top-level fields of the operation.
/// `variables` back any `@skip`/`@include` conditions in the selections.
///
/// The returned [`Response`] holds the shaped bytes, or `data: None` when a
/// non-null violation could not be absorbed below the root, plus all field
/// errors in traversal order.
#[tracing::instrument(skip_all, level = "trace")]
pub fn encode_graphql(
    tree: &ResultTree,
    root: NodeId,
    root_selections: &[Field],
    variables: &Object,
) -> Response {
    let encoder = Encoder {
        tree,
        type_attr: tree.lookup_attr(TYPE_PREDICATE),
        root_attr: tree.lookup_attr(ROOT_ATTR),
    };
    let mut parameters = FormatParameters {
        variables,
        errors: Vec::new(),
    };
    let mut out = Vec::with_capacity(1024);
    let ok = encoder
        .encode(
            root,
            &mut out,
            &mut parameters,
            root_selections,
            None,
            &mut Path::default(),
            0,
        )
        .is_ok();
    if !ok {
        tracing::debug!("a non-null violation reached the root, response data is null");
    }
    Response::builder()
        .and_data(ok.then(|| Bytes::from(out)))
        .errors(parameters.errors)
        .build()
}

/// How one iteration of the join advances, given the current selection and
/// the current tree node.
#[derive(Clone, Copy, Debug)]
enum Step {
    /// `__typename` consumes no tree node.
    Typename,
    /// No data for this selection; the node belongs to a later one.
    Missing,
    /// List selection, list node: one list item.
    ListItem,
    /// Non-list selection, non-list node (or any node at the root).
    Single,
    /// Non-list selection but the tree returned a list.
    UnexpectedList,
    /// List selection but the tree returned a single item.
    UnexpectedSingle,
}

struct Encoder<'a> {
    tree: &'a ResultTree,
    type_attr: Option<AttrId>,
    root_attr: Option<AttrId>,
}

impl Encoder<'_> {
    /// Emits the value of `node` under `child_selection_set`. `Err` means
    /// the value could not be completed and the caller must either write
    /// `null` in its place or keep propagating.
    #[allow(clippy::too_many_arguments)]
    fn encode(
        &self,
        node: NodeId,
        out: &mut Vec<u8>,
        parameters: &mut FormatParameters<'_>,
        child_selection_set: &[Field],
        parent_field: Option<&Field>,
        parent_path: &mut Path,
        depth: usize,
    ) -> Result<(), InvalidValue> {
        // A node without children is a scalar value.
        let Some(first_child) = self.tree.first_child(node) else {
            return self.encode_scalar(node, out, parameters, parent_field, parent_path);
        };

        // GraphQL expected an object here, otherwise the query was invalid.
        if child_selection_set.is_empty() {
            parameters
                .errors
                .push(gql_error(parent_field, parent_path, ERR_EXPECTED_SCALAR));
            return Err(InvalidValue);
        }

        if depth >= RECURSION_LIMIT {
            parameters.errors.push(gql_error(
                parent_field,
                parent_path,
                format!("response nesting limit ({RECURSION_LIMIT}) exceeded"),
            ));
            return Err(InvalidValue);
        }

        out.push(b'{');

        // The planner writes dgraph.type first in every database query, so
        // its values sit at the head of the child list. Collect them now,
        // they drive fragment filtering and __typename below.
        let mut dgraph_types: Vec<String> = Vec::new();
        let mut child = Some(first_child);
        while let Some(type_child) = child {
            if Some(self.tree.attr(type_child)) != self.type_attr {
                break;
            }
            match self.tree.scalar_value(type_child) {
                Ok(Some(value)) => match unquote(value) {
                    Some(type_name) => dgraph_types.push(type_name.to_string()),
                    None => parameters.errors.push(
                        Error::builder()
                            .message(format!(
                                "invalid type name value: {}",
                                String::from_utf8_lossy(value)
                            ))
                            .path(parent_path.clone())
                            .build(),
                    ),
                },
                Ok(None) => parameters.errors.push(
                    Error::builder()
                        .message("missing type name value")
                        .path(parent_path.clone())
                        .build(),
                ),
                Err(err) => parameters.errors.push(
                    Error::builder()
                        .message(err.to_string())
                        .path(parent_path.clone())
                        .build(),
                ),
            }
            child = self.tree.next_sibling(type_child);
        }

        let at_root = self.root_attr == Some(self.tree.attr(node));

        // cnt counts how many consecutive nodes the current selection has
        // swallowed; the JSON key goes out on the first one. key_end_pos
        // remembers where the key ended so a failed value can be rewound to
        // a bare null, also when the failure hits a later item of the same
        // selection.
        let mut cnt: usize = 0;
        let mut i: usize = 0;
        let mut key_end_pos: usize = 0;

        // The join runs while both streams have something left: trailing
        // tree data no selection wants (dgraph.uid) falls off the selection
        // end, selections with no data left are null-filled after the loop.
        while let Some(cur) = child {
            if i >= child_selection_set.len() {
                break;
            }
            cnt += 1;
            let mut null_written = false;
            let cur_selection = &child_selection_set[i];
            let cur_selection_is_list = cur_selection.ty().list_type().is_some();
            let cur_attr = self.tree.attr(cur);
            let mut next = self.tree.next_sibling(cur);

            if skip_field(cur_selection, &dgraph_types, parameters.variables) {
                cnt = 0;
                i += 1;
                if i == child_selection_set.len() {
                    check_and_strip_comma(out);
                }
                // Drop any data the tree holds for the skipped field. There
                // may be none when the field came from a fragment.
                if self.tree.attr_name(cur_attr) == cur_selection.dgraph_alias() {
                    while let Some(n) = next {
                        if self.tree.attr(n) != cur_attr {
                            break;
                        }
                        next = self.tree.next_sibling(n);
                    }
                    child = next;
                }
                continue;
            }

            // Step 1: the JSON key, and the opening [ for list selections.
            if cnt == 1 {
                write_key(cur_selection, out);
                key_end_pos = out.len();
                if cur_selection_is_list {
                    out.push(b'[');
                }
            }

            let step = if cur_selection.name() == TYPENAME {
                Step::Typename
            } else if cur_selection.dgraph_alias() != self.tree.attr_name(cur_attr) {
                Step::Missing
            } else {
                // Data at the root carries the list flag regardless of the
                // query shape, so a single-valued selection still takes the
                // Single path there.
                match (cur_selection_is_list, self.tree.is_list(cur)) {
                    (true, true) => Step::ListItem,
                    (false, false) => Step::Single,
                    (false, true) if at_root => Step::Single,
                    (false, true) => Step::UnexpectedList,
                    (true, false) => Step::UnexpectedSingle,
                }
            };

            // Step 2: the value. A consumed node advances the tree cursor.
            let mut consumed = true;
            match step {
                Step::Typename => {
                    // Resolved from the harvested types, no tree node backs it.
                    out.push(b'"');
                    out.extend_from_slice(cur_selection.type_name(&dgraph_types).as_bytes());
                    out.push(b'"');
                    consumed = false;
                }
                Step::Missing => {
                    null_written = write_graphql_null(cur_selection, out, key_end_pos);
                    if !null_written {
                        parameters.errors.push(cur_selection.gql_errorf(
                            &child_path(parent_path, cur_selection),
                            expected_non_null(cur_selection.name(), cur_selection.ty()),
                        ));
                        return Err(InvalidValue);
                    }
                    consumed = false;
                }
                Step::ListItem => {
                    let item_pos = out.len();
                    parent_path.push(PathElement::Key(cur_selection.response_name().to_string()));
                    parent_path.push(PathElement::Index(cnt - 1));
                    let item = self.encode(
                        cur,
                        out,
                        parameters,
                        cur_selection.selection_set(),
                        Some(cur_selection),
                        parent_path,
                        depth + 1,
                    );
                    parent_path.pop();
                    parent_path.pop();
                    if item.is_err() {
                        // A failed item bubbles per the GraphQL rules: a
                        // nullable item type absorbs it in place, a nullable
                        // list absorbs it by nulling the whole list, and
                        // [T!]! keeps propagating. The error for the
                        // original failure is already recorded.
                        let ty = cur_selection.ty();
                        if ty.list_type().map_or(false, FieldType::nullable) {
                            out.truncate(item_pos);
                            out.extend_from_slice(b"null");
                        } else if ty.nullable() {
                            out.truncate(key_end_pos);
                            out.extend_from_slice(b"null");
                            null_written = true;
                            // The rest of this list's items are of no use.
                            while let Some(n) = next {
                                if self.tree.attr(n) != cur_attr {
                                    break;
                                }
                                next = self.tree.next_sibling(n);
                            }
                        } else {
                            return Err(InvalidValue);
                        }
                    }
                }
                Step::Single => {
                    parent_path.push(PathElement::Key(cur_selection.response_name().to_string()));
                    let value = self.encode(
                        cur,
                        out,
                        parameters,
                        cur_selection.selection_set(),
                        Some(cur_selection),
                        parent_path,
                        depth + 1,
                    );
                    parent_path.pop();
                    if value.is_err() {
                        null_written = write_graphql_null(cur_selection, out, key_end_pos);
                        if !null_written {
                            return Err(InvalidValue);
                        }
                    }
                }
                Step::UnexpectedList => {
                    parameters.errors.push(cur_selection.gql_errorf(
                        &child_path(parent_path, cur_selection),
                        ERR_EXPECTED_SINGLE_ITEM,
                    ));
                    null_written = write_graphql_null(cur_selection, out, key_end_pos);
                    if !null_written {
                        return Err(InvalidValue);
                    }
                    // None of the returned items can be used.
                    while let Some(n) = next {
                        if self.tree.attr(n) != cur_attr {
                            break;
                        }
                        next = self.tree.next_sibling(n);
                    }
                }
                Step::UnexpectedSingle => {
                    parameters.errors.push(cur_selection.gql_errorf(
                        &child_path(parent_path, cur_selection),
                        ERR_EXPECTED_LIST,
                    ));
                    null_written = write_graphql_null(cur_selection, out, key_end_pos);
                    if !null_written {
                        return Err(InvalidValue);
                    }
                }
            }
            if consumed {
                child = next;
            }

            // Step 3: close the selection once its data is exhausted. The
            // pseudo-values (typename, missing) produce exactly one value,
            // so they are done immediately; for the rest the selection runs
            // until the attribute under the cursor changes.
            let drained = match step {
                Step::Typename | Step::Missing => true,
                _ => next.map_or(true, |n| self.tree.attr(n) != cur_attr),
            };
            if drained {
                if cur_selection_is_list && !null_written {
                    out.push(b']');
                }
                cnt = 0;
                i += 1;
            }

            // Step 4: a comma after every value but the last. While a list
            // selection is still draining this separates its items.
            if i < child_selection_set.len() {
                out.push(b',');
            }
        }

        // The tree is exhausted but selections remain: they get null (or
        // []), with an error where null is not allowed.
        while i < child_selection_set.len() {
            let cur_selection = &child_selection_set[i];

            if skip_field(cur_selection, &dgraph_types, parameters.variables) {
                i += 1;
                if i == child_selection_set.len() {
                    check_and_strip_comma(out);
                }
                continue;
            }

            write_key(cur_selection, out);
            let key_end_pos = out.len();

            if cur_selection.name() == TYPENAME {
                out.push(b'"');
                out.extend_from_slice(cur_selection.type_name(&dgraph_types).as_bytes());
                out.push(b'"');
            } else if !write_graphql_null(cur_selection, out, key_end_pos) {
                parameters.errors.push(cur_selection.gql_errorf(
                    &child_path(parent_path, cur_selection),
                    expected_non_null(cur_selection.name(), cur_selection.ty()),
                ));
                return Err(InvalidValue);
            }

            i += 1;
            if i < child_selection_set.len() {
                out.push(b',');
            }
        }

        out.push(b'}');
        Ok(())
    }

    fn encode_scalar(
        &self,
        node: NodeId,
        out: &mut Vec<u8>,
        parameters: &mut FormatParameters<'_>,
        parent_field: Option<&Field>,
        parent_path: &Path,
    ) -> Result<(), InvalidValue> {
        let value = match self.tree.scalar_value(node) {
            Ok(value) => value,
            Err(err) => {
                parameters
                    .errors
                    .push(gql_error(parent_field, parent_path, err.to_string()));
                return Err(InvalidValue);
            }
        };

        // A leaf without a value is a top-level query that matched nothing.
        // For list queries the caller still renders [], and must be able to
        // tell this apart from a null first item, so succeed here; single
        // valued queries go through the caller's null handling instead.
        // No error needs recording either way.
        let Some(value) = value else {
            return match parent_field {
                Some(field) if field.ty().list_type().is_some() => Ok(()),
                _ => Err(InvalidValue),
            };
        };

        match parent_field {
            Some(field) if field.ty().is_geo() => {
                let geo = match Value::from_bytes(Bytes::copy_from_slice(value)) {
                    Ok(geo) => geo,
                    Err(err) => {
                        parameters
                            .errors
                            .push(gql_error(parent_field, parent_path, err.to_string()));
                        return Err(InvalidValue);
                    }
                };
                if let Err(err) = complete_geo_object(parent_path, field, &geo, out) {
                    parameters.errors.push(err);
                    return Err(InvalidValue);
                }
            }
            // The backend bytes are already a JSON literal, splice them.
            _ => out.extend_from_slice(value),
        }
        Ok(())
    }
}

fn write_key(field: &Field, out: &mut Vec<u8>) {
    out.push(b'"');
    out.extend_from_slice(field.response_name().as_bytes());
    out.extend_from_slice(b"\":");
}

/// Whether `field` takes part in this response at all: `@skip`/`@include`
/// can rule it out, and so can a fragment on a type the object is not.
fn skip_field(field: &Field, dgraph_types: &[String], variables: &Object) -> bool {
    if field.should_skip(variables) {
        return true;
    }
    !dgraph_types.is_empty() && !field.include_interface_field(dgraph_types)
}

/// Writes the "no data" value for `field`, rewinding whatever partial value
/// may sit after its key. Lists render as [] rather than null: an author
/// without posts is an empty collection, not a non-null violation. Returns
/// false when the field admits neither, and the failure must propagate.
fn write_graphql_null(field: &Field, out: &mut Vec<u8>, key_end_pos: usize) -> bool {
    out.truncate(key_end_pos);
    if field.ty().list_type().is_some() {
        out.extend_from_slice(b"[]");
    } else if field.ty().nullable() {
        out.extend_from_slice(b"null");
    } else {
        return false;
    }
    true
}

fn check_and_strip_comma(out: &mut Vec<u8>) {
    if out.last() == Some(&b',') {
        out.pop();
    }
}

fn child_path(parent_path: &Path, field: &Field) -> Path {
    let mut path = parent_path.clone();
    path.push(PathElement::Key(field.response_name().to_string()));
    path
}

fn gql_error(parent_field: Option<&Field>, path: &Path, message: impl Into<String>) -> Error {
    match parent_field {
        Some(field) => field.gql_errorf(path, message),
        None => Error::builder().message(message).path(path.clone()).build(),
    }
}

/// Strips the quotes off a JSON string literal like `"Human"`. Type names
/// never contain escapes, anything fancier is malformed.
fn unquote(value: &[u8]) -> Option<&str> {
    let inner = value.strip_prefix(b"\"")?.strip_suffix(b"\"")?;
    let inner = std::str::from_utf8(inner).ok()?;
    (!inner.contains('\\')).then_some(inner)
}
