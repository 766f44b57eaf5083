//! Point-to-point TCP plumbing. Every message is a protobuf message in a length-delimited frame.
mod connection;
mod endpoint;
mod error;

pub(crate) use connection::Connection;
pub(crate) use endpoint::bind;
pub(crate) use endpoint::dial_with_retry;
pub(crate) use endpoint::RetryPolicy;
pub use error::TransportError;
