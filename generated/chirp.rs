/// Every connection between replicas (and from the front-end tier) starts with
/// exactly one envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoEnvelope {
    #[prost(
        oneof = "proto_envelope::Command",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub command: ::core::option::Option<proto_envelope::Command>,
}
/// Nested message and enum types in `ProtoEnvelope`.
pub mod proto_envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Command {
        /// Replication plumbing. Fire-and-forget, no response.
        #[prost(message, tag = "1")]
        SendPing(super::ProtoPing),
        #[prost(message, tag = "2")]
        NewServer(super::ProtoServerId),
        #[prost(message, tag = "3")]
        DeadServer(super::ProtoServerId),
        /// Sent by the master to a joining replica, followed on the same
        /// connection by zero or more ProtoUserRecord frames and then EOF.
        #[prost(message, tag = "4")]
        ConstructFilesystem(super::ProtoConstructFilesystem),
        /// Application commands. Each is answered with one ProtoCommandResponse.
        #[prost(message, tag = "5")]
        Signup(super::ProtoCredentials),
        #[prost(message, tag = "6")]
        DeleteAccount(super::ProtoUsername),
        #[prost(message, tag = "7")]
        Login(super::ProtoCredentials),
        #[prost(message, tag = "8")]
        Follow(super::ProtoUserPair),
        #[prost(message, tag = "9")]
        Unfollow(super::ProtoUserPair),
        #[prost(message, tag = "10")]
        Search(super::ProtoUserPair),
        #[prost(message, tag = "11")]
        Chirp(super::ProtoChirp),
        #[prost(message, tag = "12")]
        GetChirps(super::ProtoUsername),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPing {
    #[prost(uint32, tag = "1")]
    pub sender_id: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoServerId {
    #[prost(uint32, tag = "1")]
    pub server_id: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConstructFilesystem {
    #[prost(uint32, tag = "1")]
    pub new_id: u32,
    #[prost(uint32, repeated, tag = "2")]
    pub server_list: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, tag = "3")]
    pub master_id: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoCredentials {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoUsername {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoUserPair {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub target: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoChirp {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// 0 means "not stamped yet".
    #[prost(int64, tag = "3")]
    pub posted_at_millis: i64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoCommandResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(enumeration = "ProtoStatusCode", tag = "2")]
    pub status: i32,
    #[prost(oneof = "proto_command_response::Data", tags = "3, 4")]
    pub data: ::core::option::Option<proto_command_response::Data>,
}
/// Nested message and enum types in `ProtoCommandResponse`.
pub mod proto_command_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "3")]
        SearchResult(super::ProtoSearchResult),
        #[prost(message, tag = "4")]
        Posts(super::ProtoPostList),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoSearchResult {
    #[prost(bool, tag = "1")]
    pub following: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPostList {
    #[prost(message, repeated, tag = "1")]
    pub posts: ::prost::alloc::vec::Vec<ProtoPost>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPost {
    #[prost(string, tag = "1")]
    pub poster: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub posted_at_millis: i64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoUserRecord {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub following: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "4")]
    pub followed_by: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "5")]
    pub posts: ::prost::alloc::vec::Vec<ProtoPost>,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoStatusCode {
    Accepted = 0,
    UserFound = 1,
    UserNotFound = 2,
    UserFollowed = 3,
    UserNotFollowed = 4,
    IncorrectPassword = 5,
    DuplicateUser = 6,
    ConnectionError = 7,
    InternalError = 8,
    EncodeError = 9,
    DecodeError = 10,
}
