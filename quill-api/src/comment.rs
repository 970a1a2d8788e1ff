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

/// Denormalized view of the comment's author, as of the time the comment was fetched
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,

    /// None for a top-level comment
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    pub post_id: PostId,
    pub author_ref: AuthorRef,
    pub body: String,
    pub created_at: Time,
}

impl Comment {
    pub fn author_id(&self) -> UserId {
        self.author_ref.id
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub comment_text: String,
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    // See comments on other `validate` functions throughout quill-api
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_comment_text(&self.comment_text)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEdit {
    pub comment_text: String,
}

impl CommentEdit {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_comment_text(&self.comment_text)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn comment_wire_format_is_camel_case() {
        let c = Comment {
            id: CommentId::stub(),
            parent_id: None,
            post_id: PostId::stub(),
            author_ref: AuthorRef {
                id: UserId::stub(),
                name: String::from("ann"),
                avatar_url: None,
            },
            body: String::from("first"),
            created_at: chrono::Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["parentId"], json!(null));
        assert_eq!(v["postId"], json!("ffffffff-ffff-ffff-ffff-ffffffffffff"));
        assert_eq!(v["authorRef"]["name"], json!("ann"));
        assert!(v["authorRef"].get("avatarUrl").is_none());
        assert_eq!(v["createdAt"], json!("2023-01-02T03:04:05Z"));
    }

    #[test]
    fn new_comment_accepts_missing_parent() {
        let c: NewComment =
            serde_json::from_value(json!({ "commentText": "hi", "parentId": null })).unwrap();
        assert_eq!(c.parent_id, None);
        assert_eq!(c.validate(), Ok(()));

        let c = NewComment {
            comment_text: String::from("   "),
            parent_id: Some(CommentId::stub()),
        };
        assert_eq!(c.validate(), Err(Error::EmptyComment));
    }
}
