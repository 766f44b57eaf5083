//! This mod is meant to hold most of the code for the library's client-facing API.
mod client;
mod handle;
mod options;
mod wiring;

pub use client::BackendClient;
pub use client::ClientError;
pub use handle::ReplicaHandle;
pub use options::ReplicaOptions;
pub use wiring::try_create_replica;
pub use wiring::ReplicaConfig;
pub use wiring::ReplicaCreationError;

// So the replica can read its validated options.
pub(crate) use options::ReplicaOptionsValidated;
