use crate::command::{ApplicationCommand, CommandResponse, MalformedMessage, ReplicaAssignment, ReplicationCommand};
use crate::membership::ServerId;
use crate::replica::{DutyTasks, ReplicaContext};
use crate::server;
use crate::transport::{self, Connection, TransportError};
use crate::wire::{ProtoCommandResponse, ProtoEnvelope, ProtoUserRecord};
use futures::future;
use std::convert::TryFrom;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::time::{self, Duration};

/// Serve as master on `listener` until accepting fails. The ping loop and the new replica loop
/// run alongside and are stopped when this returns (or is dropped).
pub(crate) async fn run(ctx: &ReplicaContext, listener: TcpListener) -> TransportError {
    let mut duties = DutyTasks::new();
    duties.spawn(ping_loop(ctx.clone()));
    duties.spawn(accept_new_replicas(ctx.clone()));

    slog::info!(ctx.logger, "Serving commands as master on {:?}", listener.local_addr());
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => server::spawn_handler(ctx, stream, peer),
            Err(e) => return TransportError::Io(e),
        }
    }
}

async fn ping_loop(ctx: ReplicaContext) {
    let mut interval = time::interval(ctx.options.ping_interval);
    loop {
        interval.tick().await;
        ping_all(&ctx).await;
    }
}

/// Ping every peer once. Peers that can't be reached are removed and everyone else is told.
pub(crate) async fn ping_all(ctx: &ReplicaContext) {
    let self_id = match ctx.membership.self_id() {
        Some(id) => id,
        None => return,
    };

    let ping = ProtoEnvelope::from(ReplicationCommand::SendPing { sender: self_id });
    let unreachable = notify_all(ctx, &ping, ctx.membership.peers()).await;
    for peer in unreachable {
        remove_dead_server(ctx, peer).await;
    }
}

/// Remove `dead` from membership and tell every remaining peer. Peers that can't be reached
/// while being told are left for the next ping round.
pub(crate) async fn remove_dead_server(ctx: &ReplicaContext, dead: ServerId) {
    if !ctx.membership.remove(dead) {
        return;
    }
    slog::warn!(ctx.logger, "Removed dead server {}", dead);

    let notice = ProtoEnvelope::from(ReplicationCommand::DeadServer(dead));
    notify_all(ctx, &notice, ctx.membership.peers_except(dead)).await;
}

/// Tell every peer except the newcomer that `new_id` has joined.
pub(crate) async fn send_new_server(ctx: &ReplicaContext, new_id: ServerId) {
    let notice = ProtoEnvelope::from(ReplicationCommand::NewServer(new_id));
    let unreachable = notify_all(ctx, &notice, ctx.membership.peers_except(new_id)).await;
    for peer in unreachable {
        remove_dead_server(ctx, peer).await;
    }
}

/// Send a fire-and-forget envelope to each recipient concurrently. Returns the recipients that
/// couldn't be dialed.
async fn notify_all(ctx: &ReplicaContext, envelope: &ProtoEnvelope, recipients: Vec<ServerId>) -> Vec<ServerId> {
    let notifications = recipients.into_iter().map(|peer| async move {
        let reachable = notify(ctx, peer, envelope).await;
        (peer, reachable)
    });

    future::join_all(notifications)
        .await
        .into_iter()
        .filter(|(_, reachable)| !reachable)
        .map(|(peer, _)| peer)
        .collect()
}

async fn notify(ctx: &ReplicaContext, peer: ServerId, envelope: &ProtoEnvelope) -> bool {
    let mut connection = match ctx.dial_peer(peer).await {
        Ok(connection) => connection,
        Err(e) => {
            slog::info!(ctx.logger, "Server {} is unreachable: {}", peer, e);
            return false;
        }
    };

    // The peer answered the dial, so it's alive even if the send fails.
    if let Err(e) = connection.send(envelope).await {
        slog::warn!(ctx.logger, "Failed to notify server {}: {}", peer, e);
    }
    let _ = connection.close().await;

    true
}

#[derive(Debug, thiserror::Error)]
enum RelayError {
    #[error("unreachable: {0}")]
    Unreachable(TransportError),
    #[error("exchange failed: {0}")]
    Exchange(#[from] TransportError),
    #[error("no response within {0:?}")]
    NoResponse(Duration),
    #[error("malformed response: {0}")]
    Malformed(#[from] MalformedMessage),
}

/// Relay an application command to every follower before it runs locally. Followers that can't
/// be dialed are treated as dead. The local result is authoritative, so follower failures are
/// only logged. A follower gets as long to answer as it would wait for our pings.
pub(crate) async fn propagate_request(ctx: &ReplicaContext, command: &ApplicationCommand) {
    let envelope = ProtoEnvelope::from(command.clone());
    let envelope = &envelope;
    let relays = ctx.membership.peers().into_iter().map(|peer| async move {
        let result = relay(ctx, peer, envelope).await;
        (peer, result)
    });

    let mut dead = Vec::new();
    for (peer, result) in future::join_all(relays).await {
        match result {
            Ok(response) if !response.success => slog::info!(
                ctx.logger,
                "Server {} did not apply {}: {}",
                peer,
                command.name(),
                response.status
            ),
            Ok(_) => {}
            Err(RelayError::Unreachable(e)) => {
                slog::info!(ctx.logger, "Server {} is unreachable: {}", peer, e);
                dead.push(peer);
            }
            Err(e) => slog::warn!(ctx.logger, "Relaying {} to server {}: {}", command.name(), peer, e),
        }
    }

    for peer in dead {
        remove_dead_server(ctx, peer).await;
    }
}

async fn relay(ctx: &ReplicaContext, peer: ServerId, envelope: &ProtoEnvelope) -> Result<CommandResponse, RelayError> {
    let mut connection = ctx.dial_peer(peer).await.map_err(RelayError::Unreachable)?;
    connection.send(envelope).await?;
    let deadline = ctx.options.follower_accept_timeout;
    let response: ProtoCommandResponse = time::timeout(deadline, connection.recv_expected())
        .await
        .map_err(|_| RelayError::NoResponse(deadline))??;

    Ok(CommandResponse::try_from(response)?)
}

async fn accept_new_replicas(ctx: ReplicaContext) {
    let bootstrap_addr = ctx.ports().bootstrap_addr();
    let listener = match transport::bind(bootstrap_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            slog::error!(ctx.logger, "New replicas can't join: {}", e);
            return;
        }
    };

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => welcome_new_replica(&ctx, Connection::new(stream), peer).await,
            Err(e) => slog::warn!(ctx.logger, "Failed to accept new replica: {}", e),
        }
    }
}

async fn welcome_new_replica(ctx: &ReplicaContext, connection: Connection, peer: SocketAddr) {
    let (new_id, server_list) = ctx.membership.admit_new_replica();
    slog::info!(ctx.logger, "Admitting {} as server {}", peer, new_id);

    let assignment = ReplicaAssignment {
        new_id,
        server_list,
        master_id: ctx.membership.self_id(),
    };
    match transfer_filesystem(ctx, connection, assignment).await {
        Ok(users) => slog::info!(ctx.logger, "Sent {} users to server {}", users, new_id),
        // Already a member. If it never comes up, the ping loop will remove it.
        Err(e) => slog::warn!(ctx.logger, "Failed to bring up server {}: {}", new_id, e),
    }

    send_new_server(ctx, new_id).await;
}

async fn transfer_filesystem(
    ctx: &ReplicaContext,
    mut connection: Connection,
    assignment: ReplicaAssignment,
) -> Result<usize, TransportError> {
    connection
        .send(&ProtoEnvelope::from(ReplicationCommand::ConstructFilesystem(assignment)))
        .await?;

    let records = ctx.directory.snapshot().await;
    for record in &records {
        connection.send(&ProtoUserRecord::from(record)).await?;
    }
    connection.close().await?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ReplicaOptions;
    use crate::command::{Command, StatusCode};
    use crate::replica::test_context;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    const FOLLOWER_PORT_BASE: u16 = 38_400;

    fn options() -> ReplicaOptions {
        ReplicaOptions {
            master_command_port: Some(38_300),
            bootstrap_port: Some(38_301),
            follower_port_base: Some(FOLLOWER_PORT_BASE),
            ping_interval: Some(Duration::from_millis(200)),
            follower_accept_timeout: Some(Duration::from_millis(600)),
            connect_timeout: Some(Duration::from_millis(50)),
            ..ReplicaOptions::default()
        }
    }

    /// How a fake follower answers application commands.
    #[derive(Clone)]
    enum Reply {
        With(ProtoCommandResponse),
        Stall,
    }

    fn options_with_follower_base(follower_port_base: u16) -> ReplicaOptions {
        ReplicaOptions {
            follower_port_base: Some(follower_port_base),
            ..options()
        }
    }

    /// Listen on a follower port and forward every decoded envelope.
    async fn fake_follower(id: u32) -> mpsc::UnboundedReceiver<Command> {
        let accepted = ProtoCommandResponse::from(CommandResponse::accepted());
        fake_follower_replying(FOLLOWER_PORT_BASE, id, Reply::With(accepted)).await
    }

    async fn fake_follower_replying(
        follower_port_base: u16,
        id: u32,
        reply: Reply,
    ) -> mpsc::UnboundedReceiver<Command> {
        let addr = SocketAddr::from(([127, 0, 0, 1], follower_port_base + id as u16));
        let listener = TcpListener::bind(addr).await.unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let mut connection = Connection::new(stream);
                let envelope: ProtoEnvelope = connection.recv_expected().await.unwrap();
                let command = Command::try_from(envelope).unwrap();
                let answers = matches!(command, Command::Application(_));
                if tx.send(command).is_err() {
                    return;
                }
                if !answers {
                    continue;
                }
                match reply.clone() {
                    Reply::With(response) => connection.send(&response).await.unwrap(),
                    Reply::Stall => {
                        tokio::spawn(async move {
                            time::sleep(Duration::from_secs(30)).await;
                            drop(connection);
                        });
                    }
                }
            }
        });

        rx
    }

    fn signup(username: &str) -> ApplicationCommand {
        ApplicationCommand::Signup {
            username: username.into(),
            password: "pw".into(),
        }
    }

    fn master_with_peers(options: ReplicaOptions, peers: &[u32]) -> ReplicaContext {
        let ctx = test_context(options);
        ctx.membership.become_initial_master(ServerId::new(1), 38_300);
        for id in peers {
            ctx.membership.add(ServerId::new(*id));
        }
        ctx
    }

    fn member_ids(ctx: &ReplicaContext) -> Vec<u32> {
        let mut ids: Vec<u32> = ctx
            .membership
            .snapshot()
            .active_servers
            .iter()
            .map(|id| id.as_u32())
            .collect();
        ids.sort_unstable();
        ids
    }

    async fn next_commands(rx: &mut mpsc::UnboundedReceiver<Command>, count: usize) -> Vec<Command> {
        let mut commands = Vec::with_capacity(count);
        for _ in 0..count {
            let command = time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("Timed out waiting for a notification")
                .expect("Fake follower exited");
            commands.push(command);
        }
        commands
    }

    #[tokio::test]
    async fn unreachable_peer_is_removed_and_announced() {
        // -- setup --
        let ctx = test_context(options());
        ctx.membership.become_initial_master(ServerId::new(1), 38_300);
        for id in 2..=4 {
            ctx.membership.add(ServerId::new(id));
        }
        let mut follower_2 = fake_follower(2).await;
        let mut follower_3 = fake_follower(3).await;
        // Nothing listens for server 4, so both dial attempts are refused.

        // -- execute --
        ping_all(&ctx).await;

        // -- verify --
        let members: HashSet<ServerId> = ctx.membership.snapshot().active_servers.into_iter().collect();
        let expected: HashSet<ServerId> = [1, 2, 3].iter().copied().map(ServerId::new).collect();
        assert_eq!(members, expected);

        for follower in vec![&mut follower_2, &mut follower_3] {
            let commands = next_commands(follower, 2).await;
            assert_eq!(
                commands,
                vec![
                    Command::Replication(ReplicationCommand::SendPing {
                        sender: ServerId::new(1)
                    }),
                    Command::Replication(ReplicationCommand::DeadServer(ServerId::new(4))),
                ]
            );
        }
    }

    #[tokio::test]
    async fn new_server_is_announced_to_everyone_else() {
        // -- setup --
        let mut options = options();
        options.follower_port_base = Some(FOLLOWER_PORT_BASE + 20);
        let ctx = test_context(options);
        ctx.membership.become_initial_master(ServerId::new(1), 38_300);
        ctx.membership.add(ServerId::new(2));
        let (new_id, _) = ctx.membership.admit_new_replica();
        let addr = SocketAddr::from(([127, 0, 0, 1], FOLLOWER_PORT_BASE + 22));
        let listener = TcpListener::bind(addr).await.unwrap();

        // -- execute --
        let (_, accepted) = tokio::join!(send_new_server(&ctx, new_id), listener.accept());

        // -- verify --
        let mut connection = Connection::new(accepted.unwrap().0);
        let envelope: ProtoEnvelope = connection.recv_expected().await.unwrap();
        assert_eq!(
            Command::try_from(envelope).unwrap(),
            Command::Replication(ReplicationCommand::NewServer(new_id))
        );
        assert_eq!(new_id, ServerId::new(3));
        // Server 2 listened and answered; the newcomer itself was never dialed.
        assert_eq!(ctx.membership.snapshot().active_servers.len(), 3);
    }

    #[tokio::test]
    async fn rejected_command_keeps_follower() {
        // -- setup --
        let base = FOLLOWER_PORT_BASE + 40;
        let ctx = master_with_peers(options_with_follower_base(base), &[2]);
        let rejected = ProtoCommandResponse::from(CommandResponse::failed(StatusCode::DuplicateUser));
        let mut follower_2 = fake_follower_replying(base, 2, Reply::With(rejected)).await;

        // -- execute --
        propagate_request(&ctx, &signup("alice")).await;

        // -- verify --
        assert_eq!(
            next_commands(&mut follower_2, 1).await,
            vec![Command::Application(signup("alice"))]
        );
        assert_eq!(member_ids(&ctx), vec![1, 2]);
    }

    #[tokio::test]
    async fn garbled_response_keeps_follower() {
        let base = FOLLOWER_PORT_BASE + 60;
        let ctx = master_with_peers(options_with_follower_base(base), &[2]);
        let garbled = ProtoCommandResponse {
            success: true,
            status: 9_999,
            data: None,
        };
        let mut follower_2 = fake_follower_replying(base, 2, Reply::With(garbled)).await;

        propagate_request(&ctx, &signup("alice")).await;

        next_commands(&mut follower_2, 1).await;
        assert_eq!(member_ids(&ctx), vec![1, 2]);
    }

    #[tokio::test]
    async fn silent_follower_does_not_block_propagation() {
        let base = FOLLOWER_PORT_BASE + 80;
        let ctx = master_with_peers(options_with_follower_base(base), &[2]);
        let mut follower_2 = fake_follower_replying(base, 2, Reply::Stall).await;

        // The follower accept timeout is 600ms.
        time::timeout(Duration::from_secs(2), propagate_request(&ctx, &signup("alice")))
            .await
            .expect("Propagation waited on a silent follower");

        next_commands(&mut follower_2, 1).await;
        assert_eq!(member_ids(&ctx), vec![1, 2]);
    }

    #[tokio::test]
    async fn unreachable_follower_is_dropped_during_propagation() {
        let base = FOLLOWER_PORT_BASE + 100;
        let ctx = master_with_peers(options_with_follower_base(base), &[2, 3]);
        let accepted = ProtoCommandResponse::from(CommandResponse::accepted());
        let mut follower_2 = fake_follower_replying(base, 2, Reply::With(accepted)).await;
        // Nothing listens for server 3.

        propagate_request(&ctx, &signup("alice")).await;

        assert_eq!(member_ids(&ctx), vec![1, 2]);
        assert_eq!(
            next_commands(&mut follower_2, 2).await,
            vec![
                Command::Application(signup("alice")),
                Command::Replication(ReplicationCommand::DeadServer(ServerId::new(3))),
            ]
        );
    }
}
