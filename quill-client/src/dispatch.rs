use crate::{
    api::{self, Actor, CommentEdit, CommentId, Error, NewComment, PostId},
    build_tree, find_node, ClientError, CommentApi, CommentNode, RenderedLine, ThreadView,
};

/// The comment thread of one post, as displayed to one actor.
///
/// The server is the only source of truth: every successful mutation is
/// followed by a `refresh`, and the local forest is never edited in place.
/// Failures are recorded in `notice` and leave the forest untouched.
pub struct Thread<A> {
    api: A,
    post: PostId,
    actor: Option<Actor>,
    forest: Vec<CommentNode>,
    view: ThreadView,
    notice: Option<String>,
}

impl<A: CommentApi> Thread<A> {
    /// `actor` is `None` when nobody is logged in
    pub fn new(api: A, post: PostId, actor: Option<Actor>) -> Thread<A> {
        Thread {
            api,
            post,
            actor,
            forest: Vec::new(),
            view: ThreadView::new(),
            notice: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn post(&self) -> PostId {
        self.post
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn set_actor(&mut self, actor: Option<Actor>) {
        self.actor = actor;
    }

    pub fn forest(&self) -> &[CommentNode] {
        &self.forest
    }

    pub fn view(&self) -> &ThreadView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ThreadView {
        &mut self.view
    }

    /// Message describing the last failure, if any
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn render(&self) -> Vec<RenderedLine> {
        self.view.render(&self.forest, self.actor.as_ref())
    }

    /// Show every reply currently in the thread
    pub fn expand_all(&mut self) {
        self.view.expand_all(&self.forest);
    }

    pub fn toggle(&mut self, id: CommentId) {
        self.view.toggle(id);
    }

    fn fail<T>(&mut self, err: ClientError) -> Result<T, ClientError> {
        tracing::warn!(post=?self.post, "comment thread operation failed: {err}");
        self.notice = Some(err.to_string());
        Err(err)
    }

    /// Re-fetch the flat comment list and rebuild the forest from scratch.
    ///
    /// On failure the forest is emptied rather than left half-stale.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.api.fetch_comments(self.post).await {
            Ok(comments) => {
                tracing::debug!(post=?self.post, num_comments=comments.len(), "fetched comments");
                self.forest = build_tree(comments);
                self.view.retain(&self.forest);
                self.notice = None;
                Ok(())
            }
            Err(err) => {
                self.forest = Vec::new();
                self.fail(err)
            }
        }
    }

    fn require_actor(&self) -> Result<Actor, ClientError> {
        self.actor.ok_or(ClientError::Api(Error::NotLoggedIn))
    }

    /// Checks that the current actor may edit or delete `id`
    fn require_modifiable(&self, id: CommentId) -> Result<(), ClientError> {
        let actor = self.require_actor()?;
        let node = find_node(&self.forest, &id).ok_or(Error::CommentNotFound(id))?;
        match actor.can_modify(node) {
            true => Ok(()),
            false => Err(ClientError::Api(Error::PermissionDenied)),
        }
    }

    /// Post a new comment, top-level if `parent` is `None`
    pub async fn create(
        &mut self,
        parent: Option<CommentId>,
        text: &str,
    ) -> Result<(), ClientError> {
        let checks = self.require_actor().and_then(|_| {
            api::validate_comment_text(text)?;
            if let Some(parent) = parent {
                find_node(&self.forest, &parent).ok_or(Error::CommentNotFound(parent))?;
            }
            Ok(())
        });
        if let Err(err) = checks {
            return self.fail(err);
        }
        let new = NewComment {
            comment_text: String::from(text),
            parent_id: parent,
        };
        if let Err(err) = self.api.create_comment(self.post, new).await {
            return self.fail(err);
        }
        if let Some(parent) = parent {
            self.view.close_reply(parent);
            self.view.expand(parent);
        }
        self.refresh().await
    }

    pub async fn reply(&mut self, parent: CommentId, text: &str) -> Result<(), ClientError> {
        self.create(Some(parent), text).await
    }

    /// Post the draft of the reply box opened under `parent`
    pub async fn submit_reply(&mut self, parent: CommentId) -> Result<(), ClientError> {
        let draft = String::from(self.view.reply_draft(&parent).unwrap_or(""));
        self.create(Some(parent), &draft).await
    }

    pub async fn edit(&mut self, id: CommentId, text: &str) -> Result<(), ClientError> {
        let checks = self
            .require_modifiable(id)
            .and_then(|()| Ok(api::validate_comment_text(text)?));
        if let Err(err) = checks {
            return self.fail(err);
        }
        let edit = CommentEdit {
            comment_text: String::from(text),
        };
        if let Err(err) = self.api.edit_comment(id, edit).await {
            return self.fail(err);
        }
        self.view.cancel_edit(id);
        self.refresh().await
    }

    /// Save the draft of a comment currently in edit mode
    pub async fn submit_edit(&mut self, id: CommentId) -> Result<(), ClientError> {
        let draft = String::from(self.view.edit_draft(&id).unwrap_or(""));
        self.edit(id, &draft).await
    }

    /// First step of a deletion: ask for confirmation
    pub fn request_delete(&mut self, id: CommentId) -> Result<(), ClientError> {
        if let Err(err) = self.require_modifiable(id) {
            return self.fail(err);
        }
        self.view.request_delete(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self, id: CommentId) {
        self.view.cancel_delete(id);
    }

    /// Second step of a deletion: the comment and all its replies go away
    pub async fn confirm_delete(&mut self, id: CommentId) -> Result<(), ClientError> {
        if !self.view.is_confirming_delete(&id) {
            return self.fail(ClientError::Unconfirmed);
        }
        if let Err(err) = self.require_modifiable(id) {
            return self.fail(err);
        }
        if let Err(err) = self.api.delete_comment(id).await {
            return self.fail(err);
        }
        self.view.cancel_delete(id);
        self.refresh().await
    }
}
