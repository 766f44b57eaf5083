use crate::command::{ApplicationCommand, CommandResponse, MalformedMessage};
use crate::transport::{self, RetryPolicy, TransportError};
use crate::wire::{ProtoCommandResponse, ProtoEnvelope};
use std::convert::TryFrom;
use std::net::SocketAddr;
use tokio::time::Duration;

/// BackendClient is what the front-end tier uses to talk to the master. One connection per
/// command.
#[derive(Clone, Debug)]
pub struct BackendClient {
    master_addr: SocketAddr,
    policy: RetryPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Backend unavailable: {0}")]
    Transport(#[from] TransportError),
    #[error("Backend sent a malformed response: {0}")]
    Malformed(#[from] MalformedMessage),
}

impl BackendClient {
    pub fn new(master_addr: SocketAddr) -> Self {
        BackendClient {
            master_addr,
            policy: RetryPolicy::new(2, Duration::from_secs(1)),
        }
    }

    pub async fn send(&self, command: ApplicationCommand) -> Result<CommandResponse, ClientError> {
        let mut connection = transport::dial_with_retry(self.master_addr, self.policy).await?;
        connection.send(&ProtoEnvelope::from(command)).await?;
        let response: ProtoCommandResponse = connection.recv_expected().await?;

        Ok(CommandResponse::try_from(response)?)
    }
}
