use crate::membership::ElectionOutcome;
use crate::replica::bootstrap::{self, BootstrapError, Role};
use crate::replica::{election, follower, handoff, master, ReplicaContext};
use crate::server::ReplicaShutdownSignal;
use crate::transport;
use rand::Rng;
use tokio::net::TcpListener;
use tokio::time::{self, Duration};

/// Replica drives one process through its roles: bootstrap, then master or follower, and back to
/// bootstrap whenever a role can't be held.
pub(crate) struct Replica {
    ctx: ReplicaContext,
}

impl Replica {
    pub(crate) fn new(ctx: ReplicaContext) -> Self {
        Replica { ctx }
    }

    pub(crate) async fn run_until(self, shutdown: ReplicaShutdownSignal) {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => slog::info!(self.ctx.logger, "Replica shutting down"),
        }
    }

    async fn run(&self) {
        loop {
            match self.bootstrap().await {
                Ok(Role::Master) => self.run_as_master().await,
                Ok(Role::Follower { listener }) => self.run_as_follower(listener).await,
                Err(e) => slog::warn!(self.ctx.logger, "Bootstrap failed: {}", e),
            }

            self.ctx.membership.reset_servers();
            let delay = self.rebootstrap_delay();
            slog::info!(self.ctx.logger, "Bootstrapping again in {:?}", delay);
            time::sleep(delay).await;
        }
    }

    async fn bootstrap(&self) -> Result<Role, BootstrapError> {
        let (bootstrap_side, loader_side) = handoff::channel();
        let (role, ()) = tokio::join!(
            bootstrap::determine_role(&self.ctx, bootstrap_side),
            loader_side.load(&self.ctx.directory),
        );

        role
    }

    async fn run_as_master(&self) {
        let addr = self.ctx.ports().master_addr();
        match transport::bind(addr).await {
            Ok(listener) => self.serve_as_master(listener).await,
            Err(e) => {
                slog::error!(self.ctx.logger, "Can't serve as master: {}", e);
                self.ctx.membership.demote();
            }
        }
    }

    async fn serve_as_master(&self, listener: TcpListener) {
        let e = master::run(&self.ctx, listener).await;
        slog::error!(self.ctx.logger, "Master stopped accepting commands: {}", e);
        self.ctx.membership.demote();
    }

    async fn run_as_follower(&self, listener: TcpListener) {
        loop {
            if let Err(e) = follower::serve_until_timeout(&self.ctx, &listener).await {
                slog::error!(self.ctx.logger, "Follower stopped accepting commands: {}", e);
                return;
            }

            match election::hold(&self.ctx) {
                Ok(ElectionOutcome::Follower { .. }) => {}
                Ok(ElectionOutcome::Promoted) => {
                    drop(listener);
                    if let Ok(master_listener) = election::take_over(&self.ctx).await {
                        self.serve_as_master(master_listener).await;
                    }
                    return;
                }
                Err(e) => {
                    slog::error!(self.ctx.logger, "Can't hold election: {}", e);
                    return;
                }
            }
        }
    }

    fn rebootstrap_delay(&self) -> Duration {
        let min = self.ctx.options.rebootstrap_min_delay;
        let max = self.ctx.options.rebootstrap_max_delay;
        if min >= max {
            return min;
        }

        rand::thread_rng().gen_range(min..=max)
    }
}
