use crate::command::MalformedMessage;
use crate::wire::{ProtoPost, ProtoUserRecord};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::convert::TryFrom;

/// Everything we know about one user. This is also the unit of bulk transfer when a new
/// replica joins.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub following: BTreeSet<String>,
    pub followed_by: Vec<String>,
    pub posts: Vec<Post>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Post {
    pub poster: String,
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        UserRecord {
            username: username.into(),
            password: password.into(),
            following: BTreeSet::new(),
            followed_by: Vec::new(),
            posts: Vec::new(),
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password == password
    }

    pub fn is_following(&self, other: &str) -> bool {
        self.following.contains(other)
    }

    pub(crate) fn write_post(&mut self, message: String, posted_at: DateTime<Utc>) {
        self.posts.push(Post {
            poster: self.username.clone(),
            message,
            posted_at,
        });
    }
}

/// Current time at millisecond precision, which is what survives the wire.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis()).single().unwrap_or(now)
}

pub(crate) fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, MalformedMessage> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(MalformedMessage::InvalidTimestamp(millis))
}

// ------- Conversions --------

impl From<&Post> for ProtoPost {
    fn from(post: &Post) -> Self {
        ProtoPost {
            poster: post.poster.clone(),
            message: post.message.clone(),
            posted_at_millis: post.posted_at.timestamp_millis(),
        }
    }
}

impl TryFrom<ProtoPost> for Post {
    type Error = MalformedMessage;

    fn try_from(proto: ProtoPost) -> Result<Self, Self::Error> {
        Ok(Post {
            poster: proto.poster,
            message: proto.message,
            posted_at: datetime_from_millis(proto.posted_at_millis)?,
        })
    }
}

impl From<&UserRecord> for ProtoUserRecord {
    fn from(record: &UserRecord) -> Self {
        ProtoUserRecord {
            username: record.username.clone(),
            password: record.password.clone(),
            following: record.following.iter().cloned().collect(),
            followed_by: record.followed_by.clone(),
            posts: record.posts.iter().map(ProtoPost::from).collect(),
        }
    }
}

impl TryFrom<ProtoUserRecord> for UserRecord {
    type Error = MalformedMessage;

    fn try_from(proto: ProtoUserRecord) -> Result<Self, Self::Error> {
        let posts = proto
            .posts
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserRecord {
            username: proto.username,
            password: proto.password,
            following: proto.following.into_iter().collect(),
            followed_by: proto.followed_by,
            posts,
        })
    }
}
