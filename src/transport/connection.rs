use crate::transport::TransportError;
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Connection frames protobuf messages over a TCP stream.
///
/// Wire format per message:
/// | 4 bytes (big-endian) | variable length  |
/// |  length              | protobuf message |
pub(crate) struct Connection {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Connection {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
        }
    }

    pub(crate) async fn send<M: prost::Message>(&mut self, message: &M) -> Result<(), TransportError> {
        let mut buf = BytesMut::with_capacity(message.encoded_len());
        message.encode(&mut buf)?;
        self.framed.send(buf.freeze()).await?;

        Ok(())
    }

    /// Returns `None` once the peer has closed its end of the stream.
    pub(crate) async fn recv<M: prost::Message + Default>(&mut self) -> Result<Option<M>, TransportError> {
        match self.framed.next().await {
            None => Ok(None),
            Some(Ok(frame)) => Ok(Some(M::decode(frame.freeze())?)),
            Some(Err(e)) => Err(TransportError::Io(e)),
        }
    }

    /// Like `recv()`, but a closed stream is an error.
    pub(crate) async fn recv_expected<M: prost::Message + Default>(&mut self) -> Result<M, TransportError> {
        self.recv().await?.ok_or(TransportError::Closed)
    }

    /// Flush anything buffered and shut down our write half.
    pub(crate) async fn close(mut self) -> Result<(), TransportError> {
        SinkExt::<bytes::Bytes>::close(&mut self.framed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ProtoPing, ProtoServerId};
    use tokio::net::TcpListener;

    async fn connected_pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, server) = tokio::join!(TcpStream::connect(addr), listener.accept());

        (Connection::new(client.unwrap()), Connection::new(server.unwrap().0))
    }

    #[tokio::test]
    async fn frames_keep_message_boundaries() {
        let (mut client, mut server) = connected_pair().await;

        client.send(&ProtoPing { sender_id: 1 }).await.unwrap();
        client.send(&ProtoServerId { server_id: 7 }).await.unwrap();
        client.close().await.unwrap();

        let ping: ProtoPing = server.recv_expected().await.unwrap();
        assert_eq!(ping.sender_id, 1);
        let new_server: ProtoServerId = server.recv_expected().await.unwrap();
        assert_eq!(new_server.server_id, 7);
        assert!(server.recv::<ProtoPing>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_stream_is_an_error_when_a_message_is_expected() {
        let (client, mut server) = connected_pair().await;
        client.close().await.unwrap();

        let result = server.recv_expected::<ProtoPing>().await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
