//! Decoding side: destinations, the fan-out decoder, the response envelope
//! and the transport seam.
pub mod decode;
pub mod dynamic;
pub mod envelope;
pub mod target;
pub mod transport;

pub use decode::{DecodeError, decode, decode_into};
pub use envelope::{ClientError, GraphqlError, Location, NetworkError, PathSegment, handle_response};
pub use target::{
    BoxError, Destination, Embed, MapTarget, Member, OptionalTarget, Scalar, ScalarTarget, SequenceTarget,
    StructTarget, Target, UnmarshalGraphql,
};
pub use transport::{Client, GraphqlRequest, RawResponse, Transport};
