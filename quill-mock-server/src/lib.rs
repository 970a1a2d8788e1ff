use std::{
    collections::{btree_map, BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use quill_client::{
    api::{
        Actor, AuthToken, AuthorRef, Comment, CommentEdit, CommentId, Error, NewComment, NewPost,
        NewSession, NewUser, Post, PostId, Role, Time, UserId, Uuid,
    },
    ClientError, CommentApi,
};
use tokio::sync::{Mutex, MutexGuard};

/// Cost used for the password hashes of the users created by tests
pub const TEST_BCRYPT_COST: u32 = 4;

/// In-memory implementation of everything quill-server does
#[derive(Debug, Default)]
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    posts: HashMap<PostId, Post>,
    comments: Vec<Comment>,
    last_time: Option<Time>,
}

#[derive(Debug)]
struct DbUser {
    name: String,
    pass: String,
    pass_hash: String,
    role: Role,
    sessions: HashSet<AuthToken>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    /// Return name & pass for user number `id`
    pub fn test_get_user_info(&self, id: usize) -> (&str, &str) {
        let u = self
            .users
            .values()
            .nth(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()));
        (&u.name, &u.pass)
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    pub fn test_create_user(&mut self, name: &str, password: &str, role: Role) -> UserId {
        let id = UserId(Uuid::new_v4());
        let hash = bcrypt::hash(password, TEST_BCRYPT_COST).expect("hashing test password");
        self.admin_create_user(
            NewUser {
                id,
                name: String::from(name),
                initial_password_hash: hash,
                role,
            },
            String::from(password),
        )
        .expect("creating test user");
        id
    }

    pub fn test_create_post(&mut self, author: UserId, title: &str) -> PostId {
        let id = PostId(Uuid::new_v4());
        self.admin_create_post(NewPost {
            id,
            author_id: author,
            title: String::from(title),
        })
        .expect("creating test post");
        id
    }

    pub fn test_login(&mut self, name: &str, password: &str) -> AuthToken {
        self.auth(NewSession {
            user: String::from(name),
            password: String::from(password),
        })
        .expect("logging test user in")
    }

    /// Creation date for a new comment: microsecond precision like postgres,
    /// and strictly increasing so that tests get a predictable order
    fn now(&mut self) -> Time {
        let now = Utc::now();
        let mut now = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1000));
        if let Some(last) = self.last_time {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_time = Some(now);
        now
    }

    pub fn admin_create_user(&mut self, u: NewUser, password: String) -> Result<(), Error> {
        u.validate()?;

        if self.users.values().any(|db| db.name == u.name) {
            return Err(Error::NameAlreadyUsed(u.name));
        }

        match self.users.entry(u.id) {
            btree_map::Entry::Occupied(_) => Err(Error::UuidAlreadyUsed(u.id.0)),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(DbUser {
                    name: u.name,
                    pass: password,
                    pass_hash: u.initial_password_hash,
                    role: u.role,
                    sessions: HashSet::new(),
                });
                Ok(())
            }
        }
    }

    pub fn admin_create_post(&mut self, p: NewPost) -> Result<(), Error> {
        p.validate()?;
        if self.posts.contains_key(&p.id) {
            return Err(Error::UuidAlreadyUsed(p.id.0));
        }
        let created_at = self.now();
        self.posts.insert(
            p.id,
            Post {
                id: p.id,
                author_id: p.author_id,
                title: p.title,
                created_at,
            },
        );
        Ok(())
    }

    pub fn auth(&mut self, s: NewSession) -> Result<AuthToken, Error> {
        s.validate()?;
        for u in self.users.values_mut() {
            if u.name == s.user {
                if !bcrypt::verify(&s.password, &u.pass_hash).unwrap_or(false) {
                    return Err(Error::PermissionDenied);
                }
                let tok = AuthToken(Uuid::new_v4());
                u.sessions.insert(tok);
                return Ok(tok);
            }
        }
        Err(Error::PermissionDenied)
    }

    fn resolve(&self, tok: Option<AuthToken>) -> Result<(UserId, &DbUser), Error> {
        let tok = tok.ok_or(Error::NotLoggedIn)?;
        self.users
            .iter()
            .find(|(_, u)| u.sessions.contains(&tok))
            .map(|(id, u)| (*id, u))
            .ok_or(Error::NotLoggedIn)
    }

    fn resolve_actor(&self, tok: Option<AuthToken>) -> Result<Actor, Error> {
        let (id, u) = self.resolve(tok)?;
        Ok(Actor { id, role: u.role })
    }

    pub fn unauth(&mut self, tok: Option<AuthToken>) -> Result<(), Error> {
        let (id, _) = self.resolve(tok)?;
        if let (Some(u), Some(tok)) = (self.users.get_mut(&id), tok) {
            u.sessions.remove(&tok);
        }
        Ok(())
    }

    pub fn whoami(&self, tok: Option<AuthToken>) -> Result<Actor, Error> {
        self.resolve_actor(tok)
    }

    pub fn fetch_comments(&self, post: PostId) -> Result<Vec<Comment>, Error> {
        if !self.posts.contains_key(&post) {
            return Err(Error::PostNotFound(post));
        }
        Ok(self
            .comments
            .iter()
            .filter(|c| c.post_id == post)
            .cloned()
            .collect())
    }

    fn comment(&self, id: CommentId) -> Result<&Comment, Error> {
        self.comments
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::CommentNotFound(id))
    }

    pub fn create_comment(
        &mut self,
        tok: Option<AuthToken>,
        post: PostId,
        c: NewComment,
    ) -> Result<Comment, Error> {
        let actor = self.resolve_actor(tok)?;
        c.validate()?;
        if !self.posts.contains_key(&post) {
            return Err(Error::PostNotFound(post));
        }
        if let Some(parent) = c.parent_id {
            if self.comment(parent)?.post_id != post {
                return Err(Error::CommentNotFound(parent));
            }
        }
        let author_ref = AuthorRef {
            id: actor.id,
            name: self.users[&actor.id].name.clone(),
            avatar_url: None,
        };
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            parent_id: c.parent_id,
            post_id: post,
            author_ref,
            body: c.comment_text,
            created_at: self.now(),
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn edit_comment(
        &mut self,
        tok: Option<AuthToken>,
        id: CommentId,
        e: CommentEdit,
    ) -> Result<Comment, Error> {
        let actor = self.resolve_actor(tok)?;
        e.validate()?;
        if !actor.can_modify(self.comment(id)?) {
            return Err(Error::PermissionDenied);
        }
        let c = self
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::CommentNotFound(id))?;
        c.body = e.comment_text;
        Ok(c.clone())
    }

    pub fn delete_comment(&mut self, tok: Option<AuthToken>, id: CommentId) -> Result<(), Error> {
        let actor = self.resolve_actor(tok)?;
        if !actor.can_modify(self.comment(id)?) {
            return Err(Error::PermissionDenied);
        }
        let mut doomed = HashSet::new();
        doomed.insert(id);
        // replies always come after their parent
        for c in self.comments.iter() {
            if c.parent_id.map(|p| doomed.contains(&p)).unwrap_or(false) {
                doomed.insert(c.id);
            }
        }
        self.comments.retain(|c| !doomed.contains(&c.id));
        Ok(())
    }
}

/// `CommentApi` handle on a shared `MockServer`, as seen by one session
#[derive(Clone, Debug)]
pub struct MockApi {
    server: Arc<Mutex<MockServer>>,
    token: Option<AuthToken>,
    offline: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl MockApi {
    pub fn new(server: Arc<Mutex<MockServer>>, token: Option<AuthToken>) -> MockApi {
        MockApi {
            server,
            token,
            offline: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// While offline, every request fails as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests that were attempted through this handle
    pub fn num_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<MutexGuard<'_, MockServer>, ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Transport(anyhow::anyhow!(
                "mock server is offline"
            )));
        }
        Ok(self.server.lock().await)
    }
}

#[async_trait]
impl CommentApi for MockApi {
    async fn fetch_comments(&self, post: PostId) -> Result<Vec<Comment>, ClientError> {
        Ok(self.connect().await?.fetch_comments(post)?)
    }

    async fn create_comment(&self, post: PostId, c: NewComment) -> Result<Comment, ClientError> {
        Ok(self.connect().await?.create_comment(self.token, post, c)?)
    }

    async fn edit_comment(&self, id: CommentId, e: CommentEdit) -> Result<Comment, ClientError> {
        Ok(self.connect().await?.edit_comment(self.token, id, e)?)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), ClientError> {
        Ok(self.connect().await?.delete_comment(self.token, id)?)
    }
}
