//! Inbound side of a replica: one task per accepted connection, plus the shutdown signal that
//! stops the whole replica.
mod server;
mod shutdown;

pub(crate) use server::spawn_handler;
pub(crate) use shutdown::shutdown_signal;
pub(crate) use shutdown::ReplicaShutdownHandle;
pub(crate) use shutdown::ReplicaShutdownSignal;
