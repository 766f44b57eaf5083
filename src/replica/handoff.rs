use crate::replica::BootstrapError;
use crate::store::{StoreError, UserDirectory, UserRecord};
use tokio::sync::{mpsc, oneshot};

// Bootstrap and data loading run side by side. Bootstrap first tells the loader which role was
// decided (phase 1), then waits for the loader to report that the directory is ready (phase 2).
// Only then does the replica start serving in its new role.

pub(crate) enum RoleDecided {
    /// Load the directory from the local record store.
    Master,
    /// Replace the directory with what the master streams in.
    Follower { records: mpsc::Receiver<UserRecord> },
}

type DataLoaded = Result<usize, StoreError>;

pub(crate) struct BootstrapSide {
    role_tx: oneshot::Sender<RoleDecided>,
    loaded_rx: oneshot::Receiver<DataLoaded>,
}

pub(crate) struct LoaderSide {
    role_rx: oneshot::Receiver<RoleDecided>,
    loaded_tx: oneshot::Sender<DataLoaded>,
}

/// Phase 2 of a follower handoff, which completes once the record stream has been drained.
pub(crate) struct PendingLoad {
    loaded_rx: oneshot::Receiver<DataLoaded>,
}

pub(crate) fn channel() -> (BootstrapSide, LoaderSide) {
    let (role_tx, role_rx) = oneshot::channel();
    let (loaded_tx, loaded_rx) = oneshot::channel();

    (BootstrapSide { role_tx, loaded_rx }, LoaderSide { role_rx, loaded_tx })
}

impl BootstrapSide {
    /// Returns the number of users loaded.
    pub(crate) async fn master_decided(self) -> Result<usize, BootstrapError> {
        self.role_tx
            .send(RoleDecided::Master)
            .map_err(|_| BootstrapError::LoaderExited)?;

        PendingLoad {
            loaded_rx: self.loaded_rx,
        }
        .wait()
        .await
    }

    /// Returns where to push the master's records. Drop the sender once the stream ends.
    pub(crate) fn follower_decided(
        self,
        capacity: usize,
    ) -> Result<(mpsc::Sender<UserRecord>, PendingLoad), BootstrapError> {
        let (records_tx, records) = mpsc::channel(capacity);
        self.role_tx
            .send(RoleDecided::Follower { records })
            .map_err(|_| BootstrapError::LoaderExited)?;

        Ok((
            records_tx,
            PendingLoad {
                loaded_rx: self.loaded_rx,
            },
        ))
    }
}

impl PendingLoad {
    pub(crate) async fn wait(self) -> Result<usize, BootstrapError> {
        match self.loaded_rx.await {
            Ok(loaded) => Ok(loaded?),
            Err(_) => Err(BootstrapError::LoaderExited),
        }
    }
}

impl LoaderSide {
    /// Wait for bootstrap to pick a role, then fill `directory` accordingly. Returns quietly if
    /// bootstrap gave up before picking one.
    pub(crate) async fn load(self, directory: &UserDirectory) {
        let loaded = match self.role_rx.await {
            Ok(RoleDecided::Master) => directory.load_all().await,
            Ok(RoleDecided::Follower { records }) => directory.install_all(records).await,
            Err(_) => return,
        };

        // Bootstrap may have bailed out in the meantime.
        let _ = self.loaded_tx.send(loaded);
    }
}
