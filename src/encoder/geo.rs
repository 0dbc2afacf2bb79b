//! GeoJSON value completion.
//!
//! Geo predicates come back from the database as raw GeoJSON objects
//! (`{"type":"Point","coordinates":[…]}`). GraphQL exposes them as `Point`,
//! `Polygon` and `MultiPolygon` object types instead, so the raw coordinate
//! arrays are re-shaped here, emitting only the subfields the selection set
//! asked for.

use serde_json_bytes::Value;

use super::write_key;
use crate::graphql::Error;
use crate::json_ext::Path;
use crate::schema::Field;
use crate::schema::COORDINATES;
use crate::schema::LATITUDE;
use crate::schema::LONGITUDE;
use crate::schema::MULTI_POLYGON;
use crate::schema::POINT;
use crate::schema::POINTS;
use crate::schema::POLYGON;
use crate::schema::POLYGONS;
use crate::schema::TYPENAME;

/// Builds the GraphQL result object for a geo value. Supports `Point`,
/// `Polygon` and `MultiPolygon`.
pub(crate) fn complete_geo_object(
    path: &Path,
    field: &Field,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let object = value.as_object();
    let Some(coordinates) = object
        .and_then(|o| o.get(COORDINATES))
        .and_then(Value::as_array)
    else {
        return Err(field.gql_errorf(
            path,
            format!("missing coordinates in geojson value: {value}"),
        ));
    };

    let typ = object
        .and_then(|o| o.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    match typ {
        POINT => complete_point(path, field, coordinates, out),
        POLYGON => complete_polygon(path, field, coordinates, out),
        MULTI_POLYGON => complete_multi_polygon(path, field, coordinates, out),
        _ => Err(field.gql_errorf(path, format!("unsupported geo type: {typ}"))),
    }
}

/// Turns `[12.32, 123.32]` into `{"longitude":12.32,"latitude":123.32}`,
/// keyed by whatever subset of the Point fields was selected.
fn complete_point(
    path: &Path,
    field: &Field,
    coordinate: &[Value],
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let (Some(longitude), Some(latitude)) = (coordinate.first(), coordinate.get(1)) else {
        return Err(field.gql_errorf(
            path,
            "missing coordinates in geojson value: expected [longitude, latitude]",
        ));
    };

    let mut comma = "";
    out.push(b'{');
    for f in field.selection_set() {
        out.extend_from_slice(comma.as_bytes());
        write_key(f, out);

        match f.name() {
            LONGITUDE => out.extend_from_slice(longitude.to_string().as_bytes()),
            LATITUDE => out.extend_from_slice(latitude.to_string().as_bytes()),
            TYPENAME => out.extend_from_slice(b"\"Point\""),
            _ => out.extend_from_slice(b"null"),
        }
        comma = ",";
    }
    out.push(b'}');
    Ok(())
}

/// Converts one polygon, an array of rings each holding points:
/// `[[[22.22,11.11],[16.16,15.15]],…]` becomes
/// `{"coordinates":[{"points":[{"latitude":11.11,"longitude":22.22},…]},…]}`.
fn complete_polygon(
    path: &Path,
    field: &Field,
    polygon: &[Value],
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let mut comma1 = "";
    out.push(b'{');
    for f1 in field.selection_set() {
        out.extend_from_slice(comma1.as_bytes());
        write_key(f1, out);

        match f1.name() {
            COORDINATES => {
                let mut comma2 = "";
                out.push(b'[');
                for ring in polygon {
                    out.extend_from_slice(comma2.as_bytes());
                    out.push(b'{');
                    let mut comma3 = "";
                    for f2 in f1.selection_set() {
                        out.extend_from_slice(comma3.as_bytes());
                        write_key(f2, out);

                        match f2.name() {
                            POINTS => {
                                let mut comma4 = "";
                                out.push(b'[');
                                for point in ring.as_array().map(Vec::as_slice).unwrap_or_default()
                                {
                                    out.extend_from_slice(comma4.as_bytes());
                                    complete_point(
                                        path,
                                        f2,
                                        point.as_array().map(Vec::as_slice).unwrap_or_default(),
                                        out,
                                    )?;
                                    comma4 = ",";
                                }
                                out.push(b']');
                            }
                            TYPENAME => out.extend_from_slice(b"\"PointList\""),
                            _ => out.extend_from_slice(b"null"),
                        }
                        comma3 = ",";
                    }
                    out.push(b'}');
                    comma2 = ",";
                }
                out.push(b']');
            }
            TYPENAME => out.extend_from_slice(b"\"Polygon\""),
            _ => out.extend_from_slice(b"null"),
        }
        comma1 = ",";
    }
    out.push(b'}');
    Ok(())
}

fn complete_multi_polygon(
    path: &Path,
    field: &Field,
    multi_polygon: &[Value],
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let mut comma1 = "";
    out.push(b'{');
    for f in field.selection_set() {
        out.extend_from_slice(comma1.as_bytes());
        write_key(f, out);

        match f.name() {
            POLYGONS => {
                let mut comma2 = "";
                out.push(b'[');
                for polygon in multi_polygon {
                    out.extend_from_slice(comma2.as_bytes());
                    complete_polygon(
                        path,
                        f,
                        polygon.as_array().map(Vec::as_slice).unwrap_or_default(),
                        out,
                    )?;
                    comma2 = ",";
                }
                out.push(b']');
            }
            TYPENAME => out.extend_from_slice(b"\"MultiPolygon\""),
            _ => out.extend_from_slice(b"null"),
        }
        comma1 = ",";
    }
    out.push(b'}');
    Ok(())
}
