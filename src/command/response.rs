use crate::command::{MalformedMessage, StatusCode};
use crate::store::Post;
use crate::wire::proto_command_response;
use crate::wire::{ProtoCommandResponse, ProtoPost, ProtoPostList, ProtoSearchResult, ProtoStatusCode};
use std::convert::TryFrom;

/// The answer to every application command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandResponse {
    pub success: bool,
    pub status: StatusCode,
    pub data: ResponseData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResponseData {
    None,
    Search { following: bool },
    Posts(Vec<Post>),
}

impl CommandResponse {
    pub fn accepted() -> Self {
        Self::succeeded(StatusCode::Accepted, ResponseData::None)
    }

    pub fn succeeded(status: StatusCode, data: ResponseData) -> Self {
        CommandResponse {
            success: true,
            status,
            data,
        }
    }

    pub fn failed(status: StatusCode) -> Self {
        CommandResponse {
            success: false,
            status,
            data: ResponseData::None,
        }
    }
}

impl From<CommandResponse> for ProtoCommandResponse {
    fn from(response: CommandResponse) -> Self {
        let data = match response.data {
            ResponseData::None => None,
            ResponseData::Search { following } => {
                Some(proto_command_response::Data::SearchResult(ProtoSearchResult { following }))
            }
            ResponseData::Posts(posts) => Some(proto_command_response::Data::Posts(ProtoPostList {
                posts: posts.iter().map(ProtoPost::from).collect(),
            })),
        };

        ProtoCommandResponse {
            success: response.success,
            status: ProtoStatusCode::from(response.status) as i32,
            data,
        }
    }
}

impl TryFrom<ProtoCommandResponse> for CommandResponse {
    type Error = MalformedMessage;

    fn try_from(proto: ProtoCommandResponse) -> Result<Self, Self::Error> {
        let data = match proto.data {
            None => ResponseData::None,
            Some(proto_command_response::Data::SearchResult(search)) => ResponseData::Search {
                following: search.following,
            },
            Some(proto_command_response::Data::Posts(list)) => ResponseData::Posts(
                list.posts
                    .into_iter()
                    .map(Post::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(CommandResponse {
            success: proto.success,
            status: StatusCode::try_from(proto.status)?,
            data,
        })
    }
}
