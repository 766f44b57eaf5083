mod api;
mod command;
mod membership;
mod replica;
mod server;
mod store;
mod transport;
mod wire {
    include!("../generated/chirp.rs");
}

pub use api::try_create_replica;
pub use api::BackendClient;
pub use api::ClientError;
pub use api::ReplicaConfig;
pub use api::ReplicaCreationError;
pub use api::ReplicaHandle;
pub use api::ReplicaOptions;
pub use command::ApplicationCommand;
pub use command::CommandResponse;
pub use command::MalformedMessage;
pub use command::ResponseData;
pub use command::StatusCode;
pub use membership::MembershipSnapshot;
pub use membership::ServerId;
pub use store::Post;
pub use store::StoreError;
pub use store::UserRecord;
pub use transport::TransportError;
