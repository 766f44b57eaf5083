use crate::command::ReplicationCommand;
use crate::replica::ReplicaContext;
use crate::server;
use crate::transport::TransportError;
use tokio::net::TcpListener;
use tokio::time;

/// Serve commands until nothing has connected for a whole accept timeout, which means the master
/// stopped pinging us. Any connection resets the deadline.
pub(crate) async fn serve_until_timeout(ctx: &ReplicaContext, listener: &TcpListener) -> Result<(), TransportError> {
    loop {
        match time::timeout(ctx.options.follower_accept_timeout, listener.accept()).await {
            Ok(Ok((stream, peer))) => server::spawn_handler(ctx, stream, peer),
            Ok(Err(e)) => return Err(TransportError::Io(e)),
            Err(_elapsed) => {
                slog::warn!(
                    ctx.logger,
                    "No contact for {:?}. Presuming master {:?} dead.",
                    ctx.options.follower_accept_timeout,
                    ctx.membership.master_id()
                );
                return Ok(());
            }
        }
    }
}

/// Apply a membership update from the master.
pub(crate) fn handle_replication_command(ctx: &ReplicaContext, command: ReplicationCommand) {
    match command {
        ReplicationCommand::SendPing { sender } => {
            if ctx.membership.is_master() {
                slog::warn!(ctx.logger, "Ignoring ping from {}. We are master.", sender);
            } else if ctx.membership.accept_ping(sender) {
                slog::info!(ctx.logger, "Following new master {}", sender);
            }
        }
        ReplicationCommand::NewServer(id) => {
            if ctx.membership.add(id) {
                slog::info!(ctx.logger, "Server {} joined", id);
            }
        }
        ReplicationCommand::DeadServer(id) => {
            if ctx.membership.remove(id) {
                slog::info!(ctx.logger, "Server {} died", id);
            }
        }
        ReplicationCommand::ConstructFilesystem(assignment) => {
            slog::warn!(
                ctx.logger,
                "Ignoring assignment of id {} outside of bootstrap",
                assignment.new_id
            );
        }
    }
}
