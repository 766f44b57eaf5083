use crate::command::{ApplicationCommand, Command, CommandResponse, StatusCode};
use crate::replica::{self, ReplicaContext};
use crate::store::now_millis;
use crate::transport::Connection;
use crate::wire::{ProtoCommandResponse, ProtoEnvelope};
use std::convert::TryFrom;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Handle one inbound connection on its own task.
pub(crate) fn spawn_handler(ctx: &ReplicaContext, stream: TcpStream, peer: SocketAddr) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        handle_connection(ctx, Connection::new(stream), peer).await;
    });
}

/// Every connection carries exactly one envelope. Replication commands are applied to membership
/// and get no answer. Application commands are answered with one response.
async fn handle_connection(ctx: ReplicaContext, mut connection: Connection, peer: SocketAddr) {
    let logger = ctx.logger.new(slog::o!("peer" => peer.to_string()));

    let envelope: ProtoEnvelope = match connection.recv_expected().await {
        Ok(envelope) => envelope,
        Err(e) => {
            slog::debug!(logger, "No command received: {}", e);
            return;
        }
    };

    let response = match Command::try_from(envelope) {
        Ok(Command::Replication(command)) => {
            slog::debug!(logger, "Received {}", command.name());
            replica::handle_replication_command(&ctx, command);
            None
        }
        Ok(Command::Application(command)) => {
            slog::debug!(logger, "Received {}", command.name());
            Some(execute(&ctx, command).await)
        }
        Err(e) => {
            slog::warn!(logger, "Malformed command: {}", e);
            Some(CommandResponse::failed(StatusCode::DecodeError))
        }
    };

    if let Some(response) = response {
        if let Err(e) = connection.send(&ProtoCommandResponse::from(response)).await {
            slog::warn!(logger, "Failed to send response: {}", e);
            return;
        }
    }
    if let Err(e) = connection.close().await {
        slog::debug!(logger, "Closing connection: {}", e);
    }
}

/// The master stamps and relays the command to every follower before running it locally.
/// Followers just run it.
pub(crate) async fn execute(ctx: &ReplicaContext, mut command: ApplicationCommand) -> CommandResponse {
    if ctx.membership.is_master() {
        command.stamp_if_unstamped(now_millis());
        replica::propagate_request(ctx, &command).await;
    }

    ctx.directory.apply(command).await
}
