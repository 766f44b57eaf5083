mod bootstrap;
mod context;
mod duties;
mod election;
mod follower;
mod handoff;
mod master;
mod ports;
mod replica;

pub(crate) use bootstrap::BootstrapError;
pub(crate) use context::ReplicaContext;
pub(crate) use duties::DutyTasks;
pub(crate) use follower::handle_replication_command;
pub(crate) use master::propagate_request;
pub(crate) use ports::PortLayout;
pub(crate) use replica::Replica;
#[cfg(test)]
pub(crate) use context::test_context;
