use anyhow::Context;
use async_trait::async_trait;

use crate::{
    api::{
        Actor, AuthToken, Comment, CommentEdit, CommentId, Error, NewComment, NewPost,
        NewSession, NewUser, PostId,
    },
    ClientError, CommentApi,
};

/// `CommentApi` over HTTP, talking to quill-server
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
    host: String,
    token: Option<AuthToken>,
}

impl HttpApi {
    pub fn new(host: String, token: Option<AuthToken>) -> HttpApi {
        HttpApi {
            client: reqwest::Client::new(),
            host: String::from(host.trim_end_matches('/')),
            token,
        }
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.token
    }

    async fn send<R>(
        &self,
        req: reqwest::RequestBuilder,
        token: Option<AuthToken>,
    ) -> Result<R, ClientError>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let req = match token {
            Some(token) => req.bearer_auth(token.0),
            None => req,
        };
        let resp = req
            .send()
            .await
            .context("sending request")
            .map_err(ClientError::Transport)?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .context("receiving response body")
            .map_err(ClientError::Transport)?;
        if status.is_success() {
            return serde_json::from_slice(&body)
                .with_context(|| format!("parsing response body {body:?}"))
                .map_err(ClientError::Transport);
        }
        tracing::debug!(%status, ?body, "server returned an error");
        match Error::parse(&body) {
            Ok(err) => Err(ClientError::Api(err)),
            Err(err) => Err(ClientError::Transport(
                err.context(format!("server answered with status {status}")),
            )),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Log in, and use the resulting session for all further requests
    pub async fn login(&mut self, session: &NewSession) -> Result<AuthToken, ClientError> {
        let token: AuthToken = self
            .send(self.client.post(self.url("/api/auth")).json(session), None)
            .await?;
        self.token = Some(token);
        Ok(token)
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.send::<()>(self.client.post(self.url("/api/unauth")), self.token)
            .await?;
        self.token = None;
        Ok(())
    }

    pub async fn whoami(&self) -> Result<Actor, ClientError> {
        self.send(self.client.get(self.url("/api/whoami")), self.token)
            .await
    }

    pub async fn admin_create_user(
        &self,
        admin: AuthToken,
        user: &NewUser,
    ) -> Result<(), ClientError> {
        self.send(
            self.client
                .post(self.url("/api/admin/create-user"))
                .json(user),
            Some(admin),
        )
        .await
    }

    pub async fn admin_create_post(
        &self,
        admin: AuthToken,
        post: &NewPost,
    ) -> Result<(), ClientError> {
        self.send(
            self.client
                .post(self.url("/api/admin/create-post"))
                .json(post),
            Some(admin),
        )
        .await
    }
}

#[async_trait]
impl CommentApi for HttpApi {
    async fn fetch_comments(&self, post: PostId) -> Result<Vec<Comment>, ClientError> {
        self.send(
            self.client.get(self.url(&format!("/comments/{}", post.0))),
            self.token,
        )
        .await
    }

    async fn create_comment(&self, post: PostId, c: NewComment) -> Result<Comment, ClientError> {
        self.send(
            self.client
                .post(self.url(&format!("/posts/{}/comment", post.0)))
                .json(&c),
            self.token,
        )
        .await
    }

    async fn edit_comment(&self, id: CommentId, e: CommentEdit) -> Result<Comment, ClientError> {
        self.send(
            self.client
                .put(self.url(&format!("/comments/{}", id.0)))
                .json(&e),
            self.token,
        )
        .await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), ClientError> {
        self.send(
            self.client.delete(self.url(&format!("/comments/{}", id.0))),
            self.token,
        )
        .await
    }
}
