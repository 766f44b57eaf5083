use crate::command::MalformedMessage;
use crate::wire::ProtoStatusCode;
use std::convert::TryFrom;
use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StatusCode {
    Accepted,
    UserFound,
    UserNotFound,
    UserFollowed,
    UserNotFollowed,
    IncorrectPassword,
    DuplicateUser,
    ConnectionError,
    InternalError,
    EncodeError,
    DecodeError,
}

impl StatusCode {
    /// Message shown to the end user by the front-end tier.
    pub fn text(&self) -> &'static str {
        match self {
            StatusCode::Accepted => "Command Accepted and Executed Successfully",
            StatusCode::UserFound => "User Found",
            StatusCode::UserNotFound => "User Does Not Exist",
            StatusCode::UserFollowed => "User Followed",
            StatusCode::UserNotFollowed => "User Not Followed",
            StatusCode::IncorrectPassword => "Password Is Incorrect",
            StatusCode::DuplicateUser => "User Already Exists",
            StatusCode::ConnectionError => "Server Connection Error",
            StatusCode::InternalError => "I'm sorry dave, I'm afraid I can't do that",
            StatusCode::EncodeError => "Message Encode Error",
            StatusCode::DecodeError => "Message Decode Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl From<StatusCode> for ProtoStatusCode {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::Accepted => ProtoStatusCode::Accepted,
            StatusCode::UserFound => ProtoStatusCode::UserFound,
            StatusCode::UserNotFound => ProtoStatusCode::UserNotFound,
            StatusCode::UserFollowed => ProtoStatusCode::UserFollowed,
            StatusCode::UserNotFollowed => ProtoStatusCode::UserNotFollowed,
            StatusCode::IncorrectPassword => ProtoStatusCode::IncorrectPassword,
            StatusCode::DuplicateUser => ProtoStatusCode::DuplicateUser,
            StatusCode::ConnectionError => ProtoStatusCode::ConnectionError,
            StatusCode::InternalError => ProtoStatusCode::InternalError,
            StatusCode::EncodeError => ProtoStatusCode::EncodeError,
            StatusCode::DecodeError => ProtoStatusCode::DecodeError,
        }
    }
}

impl TryFrom<i32> for StatusCode {
    type Error = MalformedMessage;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        let proto = ProtoStatusCode::from_i32(raw).ok_or(MalformedMessage::UnknownStatusCode(raw))?;
        let status = match proto {
            ProtoStatusCode::Accepted => StatusCode::Accepted,
            ProtoStatusCode::UserFound => StatusCode::UserFound,
            ProtoStatusCode::UserNotFound => StatusCode::UserNotFound,
            ProtoStatusCode::UserFollowed => StatusCode::UserFollowed,
            ProtoStatusCode::UserNotFollowed => StatusCode::UserNotFollowed,
            ProtoStatusCode::IncorrectPassword => StatusCode::IncorrectPassword,
            ProtoStatusCode::DuplicateUser => StatusCode::DuplicateUser,
            ProtoStatusCode::ConnectionError => StatusCode::ConnectionError,
            ProtoStatusCode::InternalError => StatusCode::InternalError,
            ProtoStatusCode::EncodeError => StatusCode::EncodeError,
            ProtoStatusCode::DecodeError => StatusCode::DecodeError,
        };

        Ok(status)
    }
}
