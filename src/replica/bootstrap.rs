use crate::command::{Command, MalformedMessage, ReplicationCommand};
use crate::membership::ServerId;
use crate::replica::handoff::BootstrapSide;
use crate::replica::ReplicaContext;
use crate::store::{StoreError, UserRecord};
use crate::transport::{self, RetryPolicy, TransportError};
use crate::wire::{ProtoEnvelope, ProtoUserRecord};
use std::convert::TryFrom;
use tokio::net::TcpListener;

const RECORD_BUFFER: usize = 64;

pub(crate) enum Role {
    Master,
    /// Joined an existing master. The follower listener is already bound, so the master can
    /// reach us as soon as it has handed out our id.
    Follower { listener: TcpListener },
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum BootstrapError {
    #[error("Failed to receive replica assignment: {0}")]
    Assignment(TransportError),
    #[error("Expected a replica assignment, received {0}")]
    UnexpectedCommand(&'static str),
    #[error("Malformed replica assignment: {0}")]
    Malformed(#[from] MalformedMessage),
    #[error("No follower port available for assigned id {0}")]
    NoFollowerPort(ServerId),
    #[error("Failed to listen as follower: {0}")]
    Listen(TransportError),
    #[error("Data loader exited before reporting")]
    LoaderExited,
    #[error("Failed to load user records: {0}")]
    Store(#[from] StoreError),
}

/// Find out whether a master already exists. If nobody answers on the bootstrap port we become
/// the master. Otherwise we join as a follower and take the master's copy of every user record.
///
/// Either way, this returns only after the directory has been loaded.
pub(crate) async fn determine_role(ctx: &ReplicaContext, handoff: BootstrapSide) -> Result<Role, BootstrapError> {
    let bootstrap_addr = ctx.ports().bootstrap_addr();
    let policy = RetryPolicy::once(ctx.options.connect_timeout);
    let mut connection = match transport::dial_with_retry(bootstrap_addr, policy).await {
        Ok(connection) => connection,
        Err(e) => {
            slog::info!(
                ctx.logger,
                "Nobody answered at {} ({}). Starting as master {}.",
                bootstrap_addr,
                e,
                ctx.options.master_id
            );
            ctx.membership
                .become_initial_master(ctx.options.master_id, ctx.ports().master_command_port);
            let users = handoff.master_decided().await?;
            slog::info!(ctx.logger, "Master is up with {} users", users);

            return Ok(Role::Master);
        }
    };

    let envelope: ProtoEnvelope = connection.recv_expected().await.map_err(BootstrapError::Assignment)?;
    let assignment = match Command::try_from(envelope)? {
        Command::Replication(ReplicationCommand::ConstructFilesystem(assignment)) => assignment,
        other => return Err(BootstrapError::UnexpectedCommand(other.name())),
    };

    let listen_addr = ctx
        .ports()
        .follower_addr(assignment.new_id)
        .ok_or(BootstrapError::NoFollowerPort(assignment.new_id))?;
    let listener = transport::bind(listen_addr).await.map_err(BootstrapError::Listen)?;
    ctx.membership.adopt_assignment(
        assignment.new_id,
        &assignment.server_list,
        assignment.master_id,
        listen_addr.port(),
    );
    slog::info!(
        ctx.logger,
        "Joined as follower {} of master {:?}. Members: {:?}",
        assignment.new_id,
        assignment.master_id,
        assignment.server_list
    );

    let (records_tx, pending) = handoff.follower_decided(RECORD_BUFFER)?;
    loop {
        let proto = match connection.recv::<ProtoUserRecord>().await {
            Ok(Some(proto)) => proto,
            Ok(None) => break,
            Err(e) => {
                slog::warn!(ctx.logger, "User record stream broke off: {}", e);
                break;
            }
        };
        let record = match UserRecord::try_from(proto) {
            Ok(record) => record,
            Err(e) => {
                slog::warn!(ctx.logger, "Malformed user record ends the stream: {}", e);
                break;
            }
        };
        if records_tx.send(record).await.is_err() {
            // The loader failed. `pending` has the reason.
            break;
        }
    }
    drop(records_tx);

    let users = pending.wait().await?;
    if let Err(e) = connection.close().await {
        slog::debug!(ctx.logger, "Closing bootstrap connection: {}", e);
    }
    slog::info!(ctx.logger, "Follower is up with {} users", users);

    Ok(Role::Follower { listener })
}
