use crate::membership::ServerId;
use crate::store::datetime_from_millis;
use crate::wire::proto_envelope;
use crate::wire::{
    ProtoChirp, ProtoConstructFilesystem, ProtoCredentials, ProtoEnvelope, ProtoPing, ProtoServerId, ProtoUserPair,
    ProtoUsername,
};
use chrono::{DateTime, Utc};
use std::convert::TryFrom;

/// Command is the decoded form of an envelope. Payloads are typed per command kind, so nothing
/// downstream of the wire boundary needs to guess what it was handed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Replication(ReplicationCommand),
    Application(ApplicationCommand),
}

/// Commands replicas send each other to keep membership in sync. Fire-and-forget.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplicationCommand {
    SendPing { sender: ServerId },
    NewServer(ServerId),
    DeadServer(ServerId),
    ConstructFilesystem(ReplicaAssignment),
}

/// What the master tells a replica that has just joined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplicaAssignment {
    pub new_id: ServerId,
    pub server_list: Vec<ServerId>,
    pub master_id: Option<ServerId>,
}

/// Commands from the front-end tier. The master relays these to every follower before running
/// them itself, and every receiver answers with one `CommandResponse`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplicationCommand {
    Signup { username: String, password: String },
    DeleteAccount { username: String },
    Login { username: String, password: String },
    Follow { username: String, target: String },
    Unfollow { username: String, target: String },
    Search { searcher: String, target: String },
    Chirp {
        username: String,
        message: String,
        // Set by the master before propagation so that every replica stores the same time.
        posted_at: Option<DateTime<Utc>>,
    },
    GetChirps { username: String },
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MalformedMessage {
    #[error("Envelope carries no command")]
    EmptyEnvelope,
    #[error("Unknown status code {0}")]
    UnknownStatusCode(i32),
    #[error("Timestamp {0}ms is out of range")]
    InvalidTimestamp(i64),
    #[error("Server id 0 in {0}")]
    InvalidServerId(&'static str),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Replication(c) => c.name(),
            Command::Application(c) => c.name(),
        }
    }
}

impl ReplicationCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ReplicationCommand::SendPing { .. } => "SendPing",
            ReplicationCommand::NewServer(_) => "NewServer",
            ReplicationCommand::DeadServer(_) => "DeadServer",
            ReplicationCommand::ConstructFilesystem(_) => "ConstructFilesystem",
        }
    }
}

impl ApplicationCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationCommand::Signup { .. } => "Signup",
            ApplicationCommand::DeleteAccount { .. } => "DeleteAccount",
            ApplicationCommand::Login { .. } => "Login",
            ApplicationCommand::Follow { .. } => "Follow",
            ApplicationCommand::Unfollow { .. } => "Unfollow",
            ApplicationCommand::Search { .. } => "Search",
            ApplicationCommand::Chirp { .. } => "Chirp",
            ApplicationCommand::GetChirps { .. } => "GetChirps",
        }
    }

    pub(crate) fn stamp_if_unstamped(&mut self, now: DateTime<Utc>) {
        if let ApplicationCommand::Chirp { posted_at, .. } = self {
            if posted_at.is_none() {
                posted_at.replace(now);
            }
        }
    }
}

// ------- Conversions --------

// Ids start at 1. Zero is proto3's "unset".
fn server_id_from_wire(raw: u32) -> Option<ServerId> {
    match raw {
        0 => None,
        id => Some(ServerId::new(id)),
    }
}

fn required_server_id(raw: u32, field: &'static str) -> Result<ServerId, MalformedMessage> {
    server_id_from_wire(raw).ok_or(MalformedMessage::InvalidServerId(field))
}

impl From<Command> for ProtoEnvelope {
    fn from(command: Command) -> Self {
        match command {
            Command::Replication(c) => c.into(),
            Command::Application(c) => c.into(),
        }
    }
}

impl From<ReplicationCommand> for ProtoEnvelope {
    fn from(command: ReplicationCommand) -> Self {
        let command = match command {
            ReplicationCommand::SendPing { sender } => proto_envelope::Command::SendPing(ProtoPing {
                sender_id: sender.as_u32(),
            }),
            ReplicationCommand::NewServer(id) => proto_envelope::Command::NewServer(ProtoServerId {
                server_id: id.as_u32(),
            }),
            ReplicationCommand::DeadServer(id) => proto_envelope::Command::DeadServer(ProtoServerId {
                server_id: id.as_u32(),
            }),
            ReplicationCommand::ConstructFilesystem(assignment) => {
                proto_envelope::Command::ConstructFilesystem(ProtoConstructFilesystem {
                    new_id: assignment.new_id.as_u32(),
                    server_list: assignment.server_list.iter().map(|id| id.as_u32()).collect(),
                    master_id: assignment.master_id.map(|id| id.as_u32()).unwrap_or(0),
                })
            }
        };

        ProtoEnvelope { command: Some(command) }
    }
}

impl From<ApplicationCommand> for ProtoEnvelope {
    fn from(command: ApplicationCommand) -> Self {
        let command = match command {
            ApplicationCommand::Signup { username, password } => {
                proto_envelope::Command::Signup(ProtoCredentials { username, password })
            }
            ApplicationCommand::DeleteAccount { username } => {
                proto_envelope::Command::DeleteAccount(ProtoUsername { username })
            }
            ApplicationCommand::Login { username, password } => {
                proto_envelope::Command::Login(ProtoCredentials { username, password })
            }
            ApplicationCommand::Follow { username, target } => {
                proto_envelope::Command::Follow(ProtoUserPair { username, target })
            }
            ApplicationCommand::Unfollow { username, target } => {
                proto_envelope::Command::Unfollow(ProtoUserPair { username, target })
            }
            ApplicationCommand::Search { searcher, target } => proto_envelope::Command::Search(ProtoUserPair {
                username: searcher,
                target,
            }),
            ApplicationCommand::Chirp {
                username,
                message,
                posted_at,
            } => proto_envelope::Command::Chirp(ProtoChirp {
                username,
                message,
                posted_at_millis: posted_at.map(|t| t.timestamp_millis()).unwrap_or(0),
            }),
            ApplicationCommand::GetChirps { username } => {
                proto_envelope::Command::GetChirps(ProtoUsername { username })
            }
        };

        ProtoEnvelope { command: Some(command) }
    }
}

impl TryFrom<ProtoEnvelope> for Command {
    type Error = MalformedMessage;

    fn try_from(envelope: ProtoEnvelope) -> Result<Self, Self::Error> {
        use proto_envelope::Command as Proto;

        let command = match envelope.command.ok_or(MalformedMessage::EmptyEnvelope)? {
            Proto::SendPing(ping) => Command::Replication(ReplicationCommand::SendPing {
                sender: required_server_id(ping.sender_id, "SendPing.sender_id")?,
            }),
            Proto::NewServer(payload) => Command::Replication(ReplicationCommand::NewServer(required_server_id(
                payload.server_id,
                "NewServer.server_id",
            )?)),
            Proto::DeadServer(payload) => Command::Replication(ReplicationCommand::DeadServer(required_server_id(
                payload.server_id,
                "DeadServer.server_id",
            )?)),
            Proto::ConstructFilesystem(payload) => {
                let server_list = payload
                    .server_list
                    .into_iter()
                    .map(|id| required_server_id(id, "ConstructFilesystem.server_list"))
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Replication(ReplicationCommand::ConstructFilesystem(ReplicaAssignment {
                    new_id: required_server_id(payload.new_id, "ConstructFilesystem.new_id")?,
                    server_list,
                    master_id: server_id_from_wire(payload.master_id),
                }))
            }
            Proto::Signup(c) => Command::Application(ApplicationCommand::Signup {
                username: c.username,
                password: c.password,
            }),
            Proto::DeleteAccount(u) => {
                Command::Application(ApplicationCommand::DeleteAccount { username: u.username })
            }
            Proto::Login(c) => Command::Application(ApplicationCommand::Login {
                username: c.username,
                password: c.password,
            }),
            Proto::Follow(pair) => Command::Application(ApplicationCommand::Follow {
                username: pair.username,
                target: pair.target,
            }),
            Proto::Unfollow(pair) => Command::Application(ApplicationCommand::Unfollow {
                username: pair.username,
                target: pair.target,
            }),
            Proto::Search(pair) => Command::Application(ApplicationCommand::Search {
                searcher: pair.username,
                target: pair.target,
            }),
            Proto::Chirp(chirp) => {
                let posted_at = match chirp.posted_at_millis {
                    0 => None,
                    millis => Some(datetime_from_millis(millis)?),
                };
                Command::Application(ApplicationCommand::Chirp {
                    username: chirp.username,
                    message: chirp.message,
                    posted_at,
                })
            }
            Proto::GetChirps(u) => Command::Application(ApplicationCommand::GetChirps { username: u.username }),
        };

        Ok(command)
    }
}
