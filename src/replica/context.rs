use crate::api::ReplicaOptionsValidated;
use crate::membership::{Membership, ServerId};
use crate::replica::PortLayout;
use crate::store::UserDirectory;
use crate::transport::{self, Connection, TransportError};
use std::sync::Arc;

/// Everything a replica's tasks share. Cheap to clone; every spawned task gets its own copy.
#[derive(Clone)]
pub(crate) struct ReplicaContext {
    pub logger: slog::Logger,
    pub membership: Arc<Membership>,
    pub directory: Arc<UserDirectory>,
    pub options: Arc<ReplicaOptionsValidated>,
}

impl ReplicaContext {
    pub(crate) fn ports(&self) -> &PortLayout {
        &self.options.ports
    }

    /// Dial a peer's follower port with the configured retry policy.
    pub(crate) async fn dial_peer(&self, peer: ServerId) -> Result<Connection, TransportError> {
        let addr = self.ports().follower_addr(peer).ok_or(TransportError::NoRoute)?;
        transport::dial_with_retry(addr, self.options.dial_policy()).await
    }
}

#[cfg(test)]
pub(crate) fn test_context(options: crate::api::ReplicaOptions) -> ReplicaContext {
    use crate::store::InMemoryRecordStore;
    use std::convert::TryFrom;

    let logger = slog::Logger::root(slog::Discard, slog::o!());
    let options = ReplicaOptionsValidated::try_from(options).expect("Invalid test options");

    ReplicaContext {
        logger: logger.clone(),
        membership: Arc::new(Membership::new()),
        directory: Arc::new(UserDirectory::new(logger, Box::new(InMemoryRecordStore::new()))),
        options: Arc::new(options),
    }
}
