use crate::membership::{ElectionOutcome, MembershipError};
use crate::replica::ReplicaContext;
use crate::transport::{self, TransportError};
use tokio::net::TcpListener;

/// The master went silent. Drop it and let the lowest remaining id win.
pub(crate) fn hold(ctx: &ReplicaContext) -> Result<ElectionOutcome, MembershipError> {
    let presumed_dead = ctx.membership.master_id();
    let outcome = ctx.membership.hold_election(ctx.ports().master_command_port)?;

    match outcome {
        ElectionOutcome::Promoted => slog::info!(
            ctx.logger,
            "Won election after losing master {:?}. Taking over.",
            presumed_dead
        ),
        ElectionOutcome::Follower { master_id } => slog::info!(
            ctx.logger,
            "Lost election after losing master {:?}. Expecting {} to take over.",
            presumed_dead,
            master_id
        ),
    }

    Ok(outcome)
}

/// Bind the master command port after winning an election. If it's still taken, we give up the
/// promotion.
pub(crate) async fn take_over(ctx: &ReplicaContext) -> Result<TcpListener, TransportError> {
    match transport::bind(ctx.ports().master_addr()).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            slog::error!(ctx.logger, "Can't take over as master: {}", e);
            ctx.membership.demote();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ReplicaOptions;
    use crate::membership::ServerId;
    use crate::replica::test_context;

    #[tokio::test]
    async fn take_over_fails_when_port_is_taken() {
        // -- setup --
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let ctx = test_context(ReplicaOptions {
            master_command_port: Some(port),
            ..ReplicaOptions::default()
        });
        ctx.membership
            .adopt_assignment(ServerId::new(2), &[ServerId::new(1)], Some(ServerId::new(1)), 5102);

        // -- execute --
        let outcome = hold(&ctx).unwrap();
        let result = take_over(&ctx).await;

        // -- verify --
        assert_eq!(outcome, ElectionOutcome::Promoted);
        assert!(result.is_err());
        assert!(!ctx.membership.is_master());
    }
}
