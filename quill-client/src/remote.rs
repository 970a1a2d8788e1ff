use async_trait::async_trait;

use crate::api::{Comment, CommentEdit, CommentId, Error, NewComment, PostId};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not talk to the server: {0:#}")]
    Transport(anyhow::Error),

    #[error(transparent)]
    Api(#[from] Error),

    #[error("Deleting a comment needs to be confirmed first")]
    Unconfirmed,
}

impl ClientError {
    pub fn api(&self) -> Option<&Error> {
        match self {
            ClientError::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// The backend, as seen by a comment thread.
///
/// Every method is a single request: no retries, no local caching.
#[async_trait]
pub trait CommentApi {
    /// All the comments of `post`, flat and in no particular order
    async fn fetch_comments(&self, post: PostId) -> Result<Vec<Comment>, ClientError>;

    async fn create_comment(&self, post: PostId, c: NewComment) -> Result<Comment, ClientError>;

    async fn edit_comment(&self, id: CommentId, e: CommentEdit) -> Result<Comment, ClientError>;

    /// Also deletes all the replies to `id`, recursively
    async fn delete_comment(&self, id: CommentId) -> Result<(), ClientError>;
}
