mod command;
mod response;
mod status;

pub use command::ApplicationCommand;
pub use command::Command;
pub use command::MalformedMessage;
pub use command::ReplicaAssignment;
pub use command::ReplicationCommand;
pub use response::CommandResponse;
pub use response::ResponseData;
pub use status::StatusCode;
