use crate::api::options::ReplicaOptionsValidated;
use crate::api::ReplicaHandle;
use crate::membership::Membership;
use crate::replica::{Replica, ReplicaContext};
use crate::server;
use crate::store::{DiskRecordStore, InMemoryRecordStore, RecordStore, StoreError, UserDirectory};
use crate::ReplicaOptions;
use std::convert::TryFrom;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ReplicaConfig {
    // Where user records are persisted. Records only live in memory when unset.
    pub data_directory: Option<PathBuf>,
    pub info_logger: slog::Logger,
    pub options: ReplicaOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicaCreationError {
    #[error("Illegal options for configuring replica: {0}")]
    IllegalOptions(String),
    #[error("Record store initialization failure: {0}")]
    RecordStore(#[from] StoreError),
}

/// Create a replica and start it on the current tokio runtime. It bootstraps, takes whatever role
/// it finds, and keeps going until the returned handle is shut down or dropped.
pub async fn try_create_replica(config: ReplicaConfig) -> Result<ReplicaHandle, ReplicaCreationError> {
    let root_logger = config.info_logger;

    let options = ReplicaOptionsValidated::try_from(config.options)
        .map_err(|e| ReplicaCreationError::IllegalOptions(e.to_string()))?;

    let store: Box<dyn RecordStore> = match config.data_directory {
        Some(directory) => {
            let store_logger = root_logger.new(slog::o!("component" => "store"));
            Box::new(DiskRecordStore::open(store_logger, directory).await?)
        }
        None => Box::new(InMemoryRecordStore::new()),
    };
    let directory = Arc::new(UserDirectory::new(root_logger.clone(), store));
    let membership = Arc::new(Membership::new());

    let ctx = ReplicaContext {
        logger: root_logger,
        membership: membership.clone(),
        directory: directory.clone(),
        options: Arc::new(options),
    };

    let (shutdown_handle, shutdown_signal) = server::shutdown_signal();
    let replica = Replica::new(ctx);
    let task = tokio::spawn(replica.run_until(shutdown_signal));

    Ok(ReplicaHandle::new(membership, directory, shutdown_handle, task))
}
