use serde::Deserialize;
use serde::Serialize;

use crate::graphql::Error;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::schema::FieldType;

/// Runtime condition behind an `@include` or `@skip` directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Yes,
    No,
    Variable(String),
}

impl Condition {
    pub(crate) fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

impl IncludeSkip {
    pub fn new(include: Condition, skip: Condition) -> Self {
        Self { include, skip }
    }

    pub fn should_skip(&self, variables: &Object) -> bool {
        // Using .unwrap_or is legit here because the GraphQL layer has
        // already checked that the variable is present and of the
        // correct type
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Default for IncludeSkip {
    fn default() -> Self {
        Self {
            include: Condition::Yes,
            skip: Condition::No,
        }
    }
}

/// One field of a selection set, carrying everything the shaper needs to
/// know about it: names, type, directives, sub-selections and the source
/// location for error reporting. The GraphQL layer builds these while
/// rewriting the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    alias: Option<String>,
    dgraph_alias: Option<String>,
    field_type: FieldType,
    selection_set: Vec<Field>,
    include_skip: IncludeSkip,
    type_condition: Option<String>,
    possible_types: Vec<String>,
    location: Option<Location>,
}

#[buildstructor::buildstructor]
impl Field {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        alias: Option<String>,
        dgraph_alias: Option<String>,
        field_type: FieldType,
        selections: Vec<Field>,
        include_skip: Option<IncludeSkip>,
        type_condition: Option<String>,
        possible_types: Vec<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            name,
            alias,
            dgraph_alias,
            field_type,
            selection_set: selections,
            include_skip: include_skip.unwrap_or_default(),
            type_condition,
            possible_types,
            location,
        }
    }
}

impl Field {
    /// The schema name of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key this field appears under in the response JSON.
    pub fn response_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The name the query rewriter used for this field in the database
    /// query, and hence the attribute its data carries in the result tree.
    pub fn dgraph_alias(&self) -> &str {
        self.dgraph_alias.as_deref().unwrap_or(&self.name)
    }

    pub fn ty(&self) -> &FieldType {
        &self.field_type
    }

    pub fn selection_set(&self) -> &[Field] {
        &self.selection_set
    }

    pub fn should_skip(&self, variables: &Object) -> bool {
        self.include_skip.should_skip(variables)
    }

    /// Whether this field applies to an object whose concrete types are
    /// `dgraph_types`. A field spread from a fragment on a concrete type
    /// only applies when the object actually is of that type.
    pub fn include_interface_field(&self, dgraph_types: &[String]) -> bool {
        self.type_condition
            .as_ref()
            .map_or(true, |condition| dgraph_types.iter().any(|t| t == condition))
    }

    /// Resolves `__typename`: the first concrete type observed on the
    /// object that the schema allows here, falling back to the statically
    /// known type.
    pub fn type_name<'a>(&'a self, dgraph_types: &'a [String]) -> &'a str {
        dgraph_types
            .iter()
            .find(|t| self.possible_types.iter().any(|p| p == *t))
            .or(self.possible_types.first())
            .map(String::as_str)
            .unwrap_or_else(|| self.field_type.name())
    }

    /// Builds a field error at `path`, attached to this field's source
    /// location when one is known.
    pub fn gql_errorf(&self, path: &Path, message: impl Into<String>) -> Error {
        let builder = Error::builder().message(message).path(path.clone());
        match &self.location {
            Some(location) => builder.location(location.clone()).build(),
            None => builder.build(),
        }
    }
}
