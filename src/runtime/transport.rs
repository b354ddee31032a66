//! Request encoding and the transport seam. No HTTP client ships here.
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::envelope::{ClientError, NetworkError, handle_response};
use super::target::{BoxError, Destination};
use crate::ir::Operation;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub operation_name: String,
    pub query: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, serde_json::Value>,
}

impl GraphqlRequest {
    pub fn for_operation(operation: &Operation, variables: IndexMap<String, serde_json::Value>) -> Self {
        GraphqlRequest {
            operation_name: operation.name.clone(),
            query: operation.query.clone(),
            variables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one encoded request body and returns whatever came back.
pub trait Transport {
    fn send(&self, body: Vec<u8>) -> Result<RawResponse, BoxError>;
}

impl<F> Transport for F
where
    F: Fn(Vec<u8>) -> Result<RawResponse, BoxError>,
{
    fn send(&self, body: Vec<u8>) -> Result<RawResponse, BoxError> {
        self(body)
    }
}

pub struct Client<T> {
    transport: T,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Client { transport }
    }

    pub fn execute(&self, request: &GraphqlRequest, data: &mut (dyn Destination + 'static)) -> Result<(), ClientError> {
        let body = serde_json::to_vec(request).map_err(NetworkError::Encode)?;
        debug!(operation = %request.operation_name, bytes = body.len(), "sending operation");
        let response = self.transport.send(body).map_err(NetworkError::Transport)?;
        handle_response(response.status, &response.body, data)
    }
}
