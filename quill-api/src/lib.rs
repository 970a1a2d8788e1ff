use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod auth;
pub use auth::{AuthToken, NewSession};

mod comment;
pub use comment::{AuthorRef, Comment, CommentEdit, CommentId, NewComment};

mod error;
pub use error::Error;

mod post;
pub use post::{NewPost, Post, PostId};

mod user;
pub use user::{Actor, NewUser, Role, User, UserId};

/// Postgres refuses null bytes in TEXT columns, so every user-provided string goes through this
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

/// Comment bodies must have at least one non-whitespace character
pub fn validate_comment_text(text: &str) -> Result<(), Error> {
    validate_string(text)?;
    if text.trim().is_empty() {
        return Err(Error::EmptyComment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_validation() {
        assert_eq!(validate_comment_text("hello"), Ok(()));
        assert_eq!(validate_comment_text("  hi  "), Ok(()));
        assert_eq!(validate_comment_text(""), Err(Error::EmptyComment));
        assert_eq!(validate_comment_text(" \n\t "), Err(Error::EmptyComment));
        assert_eq!(
            validate_comment_text("a\0b"),
            Err(Error::NullByteInString(String::from("a\0b")))
        );
    }
}
