//! The selection-set model consumed by the shaper.
//!
//! The GraphQL layer builds [`Field`] trees while it rewrites the incoming
//! operation into a database query; the shaper only reads them back.

mod field;
mod field_type;

pub use field::Condition;
pub use field::Field;
pub use field::IncludeSkip;
pub use field_type::FieldType;
pub use field_type::InvalidValue;

pub const TYPENAME: &str = "__typename";

// GeoJSON type names.
pub const POINT: &str = "Point";
pub const POLYGON: &str = "Polygon";
pub const MULTI_POLYGON: &str = "MultiPolygon";
pub const POINT_LIST: &str = "PointList";

// GraphQL-side field names of the geo object types.
pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";
pub const COORDINATES: &str = "coordinates";
pub const POINTS: &str = "points";
pub const POLYGONS: &str = "polygons";

// Error messages are part of the wire contract, existing clients match on
// them verbatim.
pub const ERR_EXPECTED_SCALAR: &str = "Expected a scalar value, but got an object.";
pub const ERR_EXPECTED_SINGLE_ITEM: &str =
    "A list was returned, but GraphQL was expecting just one item.";
pub const ERR_EXPECTED_LIST: &str =
    "A single item was returned, but GraphQL was expecting a list.";

/// The message recorded when a non-nullable field has no data.
pub fn expected_non_null(field_name: &str, field_type: &FieldType) -> String {
    format!(
        "Non-nullable field '{field_name}' (type {field_type}) was not present in result from Dgraph."
    )
}
