use crate::transport::{Connection, TransportError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{self, Duration};

/// RetryPolicy bounds how hard we try to reach a peer before declaring it dead. Every dial site
/// (ping, propagation, membership broadcast, bootstrap) goes through `dial_with_retry()` with one
/// of these, so they all classify dead peers the same way.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: u32,
    pub(crate) connect_timeout: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(attempts: u32, connect_timeout: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            connect_timeout,
        }
    }

    pub(crate) fn once(connect_timeout: Duration) -> Self {
        Self::new(1, connect_timeout)
    }
}

/// Dial `addr`, retrying immediately up to `policy.attempts` times. Returns the last error if
/// every attempt fails.
pub(crate) async fn dial_with_retry(addr: SocketAddr, policy: RetryPolicy) -> Result<Connection, TransportError> {
    let mut attempt = 1;
    loop {
        match dial(addr, policy.connect_timeout).await {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(_) => attempt += 1,
        }
    }
}

async fn dial(addr: SocketAddr, connect_timeout: Duration) -> Result<Connection, TransportError> {
    let stream = match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
        Err(_elapsed) => return Err(TransportError::ConnectTimeout(addr)),
    };
    stream.set_nodelay(true)?;

    Ok(Connection::new(stream))
}

pub(crate) async fn bind(addr: SocketAddr) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ProtoPing;

    #[tokio::test]
    async fn dial_reaches_listener() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let policy = RetryPolicy::new(2, Duration::from_millis(200));
        let (dialed, accepted) = tokio::join!(dial_with_retry(addr, policy), listener.accept());

        let mut client = dialed.unwrap();
        let mut server = Connection::new(accepted.unwrap().0);
        client.send(&ProtoPing { sender_id: 9 }).await.unwrap();
        let ping: ProtoPing = server.recv_expected().await.unwrap();
        assert_eq!(ping.sender_id, 9);
    }

    #[tokio::test]
    async fn dial_gives_up_after_all_attempts() {
        // Grab a free port, then release it so nothing is listening there.
        let addr = {
            let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
            listener.local_addr().unwrap()
        };

        let policy = RetryPolicy::new(2, Duration::from_millis(200));
        let result = dial_with_retry(addr, policy).await;
        assert!(matches!(
            result,
            Err(TransportError::Connect { .. }) | Err(TransportError::ConnectTimeout(_))
        ));
    }

    #[tokio::test]
    async fn bind_reports_port_in_use() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let result = bind(addr).await;
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn retry_policy_always_tries_at_least_once() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(1)).attempts, 1);
        assert_eq!(RetryPolicy::once(Duration::from_millis(1)).attempts, 1);
    }
}
