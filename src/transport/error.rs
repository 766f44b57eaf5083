use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(SocketAddr),

    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("Connection I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Peer closed the connection before sending a message")]
    Closed,

    #[error("Peer has no routable address")]
    NoRoute,
}
