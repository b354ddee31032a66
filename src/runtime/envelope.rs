//! The `{data, errors}` response envelope and the client-visible error.
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::decode::{DecodeError, decode_envelope};
use super::target::{BoxError, Destination};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.message);
        }
        let path = self.path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".");
        write!(f, "{path}: {}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("returned error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),
}

/// A failed round trip. Slots are independent: a 500 carrying an `errors`
/// array fills both `network` and `graphql`.
#[derive(Debug, Default)]
pub struct ClientError {
    pub network: Option<NetworkError>,
    pub graphql: Vec<GraphqlError>,
    /// Only set when the transport itself succeeded.
    pub decode: Option<DecodeError>,
}

impl ClientError {
    fn is_empty(&self) -> bool {
        self.network.is_none() && self.graphql.is_empty() && self.decode.is_none()
    }
}

impl From<NetworkError> for ClientError {
    fn from(network: NetworkError) -> Self {
        ClientError {
            network: Some(network),
            ..ClientError::default()
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(network) = &self.network {
            parts.push(network.to_string());
        }
        parts.extend(self.graphql.iter().map(|err| format!("graphql: {err}")));
        if let Some(decode) = &self.decode {
            parts.push(decode.to_string());
        }
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match (&self.network, &self.decode) {
            (Some(network), _) => Some(network),
            (None, Some(decode)) => Some(decode),
            (None, None) => None,
        }
    }
}

/// Checks `status`, then decodes `body` with `data` receiving the `data` member.
pub fn handle_response(status: u16, body: &[u8], data: &mut (dyn Destination + 'static)) -> Result<(), ClientError> {
    let mut error = ClientError::default();
    if !(200..300).contains(&status) {
        error.network = Some(NetworkError::Status {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }
    match decode_envelope(body, data) {
        Ok(envelope) => {
            if error.network.is_none() && envelope.errors.is_empty() && !envelope.has_data {
                error.decode = Some(DecodeError::MissingData);
            }
            error.graphql = envelope.errors;
        }
        Err(decode) => {
            error.graphql = salvage_errors(body);
            if error.network.is_none() {
                error.decode = Some(decode);
            } else {
                debug!(status, %decode, "undecodable error response");
            }
        }
    }
    if error.is_empty() { Ok(()) } else { Err(error) }
}

/// The `errors` member alone, for bodies whose `data` did not fit the destination.
#[derive(Deserialize)]
struct ErrorsOnly {
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

fn salvage_errors(body: &[u8]) -> Vec<GraphqlError> {
    match serde_json::from_slice::<ErrorsOnly>(body) {
        Ok(envelope) => envelope.errors.unwrap_or_default(),
        Err(err) => {
            debug!(%err, "no errors member in undecodable body");
            Vec::new()
        }
    }
}
