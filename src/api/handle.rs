use crate::membership::{Membership, MembershipSnapshot};
use crate::server::ReplicaShutdownHandle;
use crate::store::{UserDirectory, UserRecord};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// ReplicaHandle is the owner's view of a running replica. Dropping it stops the replica.
pub struct ReplicaHandle {
    membership: Arc<Membership>,
    directory: Arc<UserDirectory>,
    shutdown: ReplicaShutdownHandle,
    task: JoinHandle<()>,
}

impl ReplicaHandle {
    pub(crate) fn new(
        membership: Arc<Membership>,
        directory: Arc<UserDirectory>,
        shutdown: ReplicaShutdownHandle,
        task: JoinHandle<()>,
    ) -> Self {
        ReplicaHandle {
            membership,
            directory,
            shutdown,
            task,
        }
    }

    /// Who this replica is, who it thinks is master, and who it thinks is alive.
    pub fn status(&self) -> MembershipSnapshot {
        self.membership.snapshot()
    }

    pub async fn user(&self, username: &str) -> Option<UserRecord> {
        self.directory.get(username).await
    }

    /// Stop the replica and wait until it has released its ports.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        // A panic in the replica task is already reported by the runtime.
        let _ = self.task.await;
    }
}
