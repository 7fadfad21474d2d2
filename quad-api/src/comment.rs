use std::fmt;

use uuid::Uuid;

use crate::{Error, PostId, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "comment {}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub score: i64,
    pub created_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_text("content", &self.content)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct CommentEdit {
    pub content: String,
}

impl CommentEdit {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_text("content", &self.content)
    }
}
