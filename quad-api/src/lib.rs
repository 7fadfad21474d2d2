use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

/// Number of posts returned by listings when the client does not ask for a limit
pub const DEFAULT_LIMIT: u32 = 50;

/// Listings never return more than this many posts, whatever the client asks for
pub const MAX_LIMIT: u32 = 500;

/// Score a general post must reach before it shows up in feeds through a followed tag
pub const DEFAULT_TAG_SCORE_FLOOR: i64 = 10;

mod auth;
pub use auth::{AuthToken, NewSession};

mod comment;
pub use comment::{Comment, CommentEdit, CommentId, NewComment};

mod course;
pub use course::{Course, CourseId, NewCourse};

mod error;
pub use error::Error;

mod feed;
pub use feed::{FeedQuery, Follows, ListQuery, OwnPostsQuery, SortBy};

mod follow;
pub use follow::{FollowAction, FollowCourse, FollowTag, ProfessorPreference};

mod post;
pub use post::{NewPost, Post, PostEdit, PostId};

mod user;
pub use user::{NewUser, User, UserId};

mod vote;
pub use vote::{NewVote, TargetType, VoteChange, VoteDirection, VoteOutcome, VoteTarget};

// Validation functions, that are used to validate data received by the server.
// They return an error if the data is invalid, and Ok(()) otherwise.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Validates a user-visible field that must carry actual text
pub fn validate_text(field: &str, s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::InvalidField(String::from(field)));
    }
    Ok(())
}

/// User names, course ids and tag names all live in URLs and comma-separated lists
pub fn validate_name(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == ',' || c == '/') {
        return Err(Error::InvalidName(String::from(s)));
    }
    Ok(())
}

pub fn clamp_limit(limit: Option<u32>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reject_separators() {
        assert!(validate_name("cmpt120").is_ok());
        assert!(validate_name("study-tips").is_ok());
        assert_eq!(
            validate_name("study tips"),
            Err(Error::InvalidName(String::from("study tips")))
        );
        assert_eq!(validate_name(""), Err(Error::InvalidName(String::new())));
        assert!(validate_name("a,b").is_err());
        assert_eq!(
            validate_name("nul\0"),
            Err(Error::NullByteInString(String::from("nul\0")))
        );
    }

    #[test]
    fn text_must_not_be_blank() {
        assert!(validate_text("title", "Final exam tips").is_ok());
        assert_eq!(
            validate_text("title", "   "),
            Err(Error::InvalidField(String::from("title")))
        );
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT as usize);
        assert_eq!(clamp_limit(Some(3)), 3);
        assert_eq!(clamp_limit(Some(u32::MAX)), MAX_LIMIT as usize);
    }
}
