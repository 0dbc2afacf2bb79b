use bytes::Bytes;

use crate::graphql::Error;

/// A shaped GraphQL response body.
///
/// `data` holds the raw, already-encoded JSON produced by the shaper. It is
/// `None` when a non-null violation reached the root and the whole response
/// must collapse to `"data": null`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Response {
    /// The response data as pre-encoded JSON bytes.
    pub data: Option<Bytes>,

    /// The graphql errors encountered while shaping, in traversal order.
    pub errors: Vec<Error>,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Bytes>, errors: Vec<Error>) -> Self {
        Self { data, errors }
    }

    /// Splices the raw data bytes and the serialized error list into the
    /// standard `{"data":…,"errors":[…]}` envelope.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::with_capacity(
            self.data.as_ref().map(Bytes::len).unwrap_or_default() + 32,
        );
        out.extend_from_slice(b"{\"data\":");
        match &self.data {
            Some(data) => out.extend_from_slice(data),
            None => out.extend_from_slice(b"null"),
        }
        if !self.errors.is_empty() {
            out.extend_from_slice(b",\"errors\":");
            serde_json::to_writer(&mut out, &self.errors)?;
        }
        out.push(b'}');
        Ok(out)
    }
}
