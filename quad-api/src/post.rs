use std::{collections::BTreeSet, fmt};

use uuid::Uuid;

use crate::{CourseId, Error, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn stub() -> PostId {
        PostId(STUB_UUID)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post {}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,

    /// `None` for posts living in the general/explore space
    pub course_id: Option<CourseId>,
    pub professor: Option<String>,
    pub tags: BTreeSet<String>,

    /// Always equal to the sum of the votes cast on this post, the author's
    /// implicit upvote included
    pub score: i64,
    pub created_at: Time,
}

impl Post {
    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub course_id: Option<CourseId>,
    pub professor: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_text("title", &self.title)?;
        crate::validate_text("content", &self.content)?;
        if let Some(c) = &self.course_id {
            crate::validate_name(&c.0)?;
        }
        if let Some(p) = &self.professor {
            crate::validate_text("professor", p)?;
        }
        for t in &self.tags {
            crate::validate_name(t)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
}

impl PostEdit {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_text("title", &self.title)?;
        crate::validate_text("content", &self.content)?;
        Ok(())
    }
}
