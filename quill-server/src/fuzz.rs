#![cfg(test)]

use async_recursion::async_recursion;
use bolero::generator::TypeGenerator;
use axum::{
    extract::FromRequestParts,
    http::{self, request},
};
use quill_api::{
    Actor, Comment, CommentEdit, CommentId, Error as ApiError, NewComment, NewPost, NewSession,
    NewUser, PostId, Role, UserId,
};
use quill_client::{build_tree, CommentNode};
use quill_mock_server::{MockServer, TEST_BCRYPT_COST};
use std::{cmp, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe, path::Path};
use tower::{Service, ServiceExt};

use crate::{extractors::*, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn build_pg_cluster(data: &Path) -> postgresfixture::cluster::Cluster {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    postgresfixture::cluster::Cluster::new(
        data,
        runtime.expect("postgresql seems to not be installed in path"),
    )
}

/// Spin up a throwaway postgres cluster with the migrations applied
fn with_test_db(test: impl FnOnce(tokio::runtime::Runtime, sqlx::PgPool)) {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
    let test = AssertUnwindSafe(test);
    let lockfile = tempfile::tempfile().expect("creating tempfile");
    let datadir = tempfile::tempdir().expect("creating tempdir");
    let datadir_path: &Path = datadir.as_ref();
    let cluster = build_pg_cluster(datadir_path);
    let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
    postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
        let test = test;
        cluster.createdb("test_db").expect("creating test_db database");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed initializing tokio runtime");
        let pool = runtime.block_on(async move {
            let pool = create_sqlx_pool(&format!(
                "postgresql://?host={}&dbname=test_db",
                datadir_path
            ))
            .await
            .expect("creating sqlx pool");
            MIGRATOR
                .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                .await
                .expect("failed applying migrations");
            pool
        });
        (test.0)(runtime, pool)
    })
    .expect("coordinating spinup and shutdown of the pg cluster");
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        #[ignore = "requires postgresql binaries in PATH"]
        fn $name() {
            with_test_db(|runtime, pool| {
                let runtime = AssertUnwindSafe(runtime);
                let pool = AssertUnwindSafe(pool);
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        // run the test
                        let idle_before = pool.num_idle();
                        let v_str = format!("{v:?}");
                        let idle_after_res: Result<usize, _> = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on(async move {
                                    let () = $fn(pool.clone(), v).await;
                                    let mut idle_after = pool.num_idle();
                                    let wait_release_since = std::time::Instant::now();
                                    while idle_after < idle_before
                                        && wait_release_since.elapsed()
                                            <= std::time::Duration::from_secs(1)
                                    {
                                        tokio::task::yield_now().await;
                                        idle_after = pool.num_idle();
                                    }
                                    idle_after
                                })
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            let mut conn =
                                pool.acquire().await.expect("getting db cleanup connection");
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&mut *conn)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        match idle_after_res {
                            Err(e) => std::panic::resume_unwind(e),
                            Ok(idle_after) => assert!(
                                idle_after >= idle_before,
                                "test {} held onto pool after exiting test: before there were {idle_before} connections, and after there were {idle_after} with value {v_str}",
                                stringify!($name)
                            ),
                        }
                    });
            })
        }
    };
}

do_tokio_test!(fuzz_preauth_header, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

do_tokio_test!(fuzz_preauth_cookie, String, |cookie| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::COOKIE, cookie)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(Error::Api(ApiError::NotLoggedIn)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

const NAMES: [&str; 5] = ["alice", "bob", "carol", "dave", "not valid"];
const TEXTS: [&str; 5] = ["hello", "a reply", "", "  \n", "null\0byte"];

/// Session, post and comment numbers are resized to the ones that exist at
/// the time the operation runs; `None` means "not logged in" or "unknown"
#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateUser {
        name: usize,
        role: usize,
        reuse_id: bool,
    },
    Auth {
        uid: usize,
        wrong_password: bool,
    },
    Unauth {
        sid: Option<usize>,
    },
    Whoami {
        sid: Option<usize>,
    },
    CreatePost {
        uid: usize,
        reuse_id: bool,
    },
    FetchComments {
        pid: Option<usize>,
    },
    CreateComment {
        sid: Option<usize>,
        pid: Option<usize>,
        parent: Option<usize>,
        text: usize,
    },
    EditComment {
        sid: Option<usize>,
        cid: usize,
        text: usize,
    },
    DeleteComment {
        sid: Option<usize>,
        cid: usize,
    },
}

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
            panic!(
                r#"
                    Failed parsing resp body!

                    The error is the following:
                    ---
                    {err}
                    ---

                    Response body is:
                    ---
                    {body:?}
                    ---

                    Request was:
                    ---
                    {req_body:?}
                    ---
                "#
            )
        }));
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<AuthToken>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(token) => req.header(http::header::AUTHORIZATION, format!("bearer {}", token.0)),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

/// Comment ids are picked by each side, so they cannot be compared directly
fn normalize_err(err: ApiError) -> ApiError {
    match err {
        ApiError::CommentNotFound(_) => ApiError::CommentNotFound(CommentId::stub()),
        err => err,
    }
}

fn compare<T>(name: &str, app_res: Result<T, ApiError>, mock_res: Result<T, ApiError>)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res.map_err(normalize_err),
        mock_res.map_err(normalize_err),
        "app and mock did not return the same result for {name}"
    );
}

/// What a comment looks like once ids and dates are set aside
#[derive(Debug, Eq, Ord, PartialEq, PartialOrd)]
struct Shape {
    author: String,
    body: String,
    replies: Vec<Shape>,
}

fn shape(forest: &[CommentNode]) -> Vec<Shape> {
    let mut res = forest
        .iter()
        .map(|n| Shape {
            author: n.author_ref.name.clone(),
            body: n.body.clone(),
            replies: shape(&n.replies),
        })
        .collect::<Vec<_>>();
    // dates may tie on the app side, making the sibling order unspecified
    res.sort();
    res
}

fn shape_of(comment: &Comment) -> (String, String) {
    (comment.author_ref.name.clone(), comment.body.clone())
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

struct Session {
    app: AuthToken,
    mock: AuthToken,
}

struct Pair {
    app: CommentId,
    mock: CommentId,
}

struct ComparativeFuzzer {
    admin_token: AuthToken,
    app: Router,
    mock: MockServer,
    users: Vec<UserId>,
    sessions: Vec<Session>,
    posts: Vec<PostId>,
    comments: Vec<Pair>,
}

impl ComparativeFuzzer {
    async fn new(pool: sqlx::PgPool) -> ComparativeFuzzer {
        let admin_token = AuthToken(Uuid::new_v4());
        let app = app(pool, Some(admin_token)).await;
        ComparativeFuzzer {
            admin_token,
            app,
            mock: MockServer::new(),
            users: Vec::new(),
            sessions: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn session(&self, sid: Option<usize>) -> (Option<AuthToken>, Option<AuthToken>) {
        match sid.and_then(|sid| resize_int(sid, ..self.sessions.len())) {
            Some(sid) => (Some(self.sessions[sid].app), Some(self.sessions[sid].mock)),
            None => (None, None),
        }
    }

    fn post(&self, pid: Option<usize>) -> PostId {
        match pid.and_then(|pid| resize_int(pid, ..self.posts.len())) {
            Some(pid) => self.posts[pid],
            None => PostId(Uuid::new_v4()),
        }
    }

    fn comment(&self, cid: usize) -> Option<&Pair> {
        resize_int(cid, ..self.comments.len()).map(|cid| &self.comments[cid])
    }

    #[async_recursion]
    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::CreateUser {
                name,
                role,
                reuse_id,
            } => {
                let id = match (reuse_id, self.users.first()) {
                    (true, Some(id)) => *id,
                    _ => UserId(Uuid::new_v4()),
                };
                let name = NAMES[name % NAMES.len()];
                let role = [Role::Member, Role::Moderator, Role::Admin][role % 3];
                let password = format!("{name}-password");
                let new_user = NewUser {
                    id,
                    name: String::from(name),
                    initial_password_hash: bcrypt::hash(&password, TEST_BCRYPT_COST)
                        .expect("hashing test password"),
                    role,
                };
                let app_res: Result<(), _> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/admin/create-user",
                    Some(self.admin_token),
                    &new_user,
                )
                .await;
                let mock_res = self.mock.admin_create_user(new_user, password);
                if app_res.is_ok() && mock_res.is_ok() {
                    self.users.push(id);
                }
                compare("CreateUser", app_res, mock_res);
            }
            FuzzOp::Auth {
                uid,
                wrong_password,
            } => {
                if let Some(uid) = resize_int(uid, ..self.mock.test_num_users()) {
                    let (user, password) = self.mock.test_get_user_info(uid);
                    let session = NewSession {
                        user: String::from(user),
                        password: match wrong_password {
                            true => format!("not {password}"),
                            false => String::from(password),
                        },
                    };
                    let app_tok =
                        run_on_app(&mut self.app, "POST", "/api/auth", None, &session).await;
                    let mock_tok = self.mock.auth(session);
                    if let (&Ok(app), &Ok(mock)) = (&app_tok, &mock_tok) {
                        self.sessions.push(Session { app, mock });
                    }
                    compare("Auth", app_tok.map(|_| ()), mock_tok.map(|_| ()));
                } else {
                    self.execute_fuzz_op(FuzzOp::CreateUser {
                        name: 0,
                        role: 0,
                        reuse_id: false,
                    })
                    .await;
                    self.execute_fuzz_op(FuzzOp::Auth {
                        uid,
                        wrong_password,
                    })
                    .await;
                }
            }
            FuzzOp::Unauth { sid } => {
                let (app_tok, mock_tok) = self.session(sid);
                compare(
                    "Unauth",
                    run_on_app(&mut self.app, "POST", "/api/unauth", app_tok, &()).await,
                    self.mock.unauth(mock_tok),
                );
            }
            FuzzOp::Whoami { sid } => {
                let (app_tok, mock_tok) = self.session(sid);
                compare::<Actor>(
                    "Whoami",
                    run_on_app(&mut self.app, "GET", "/api/whoami", app_tok, &()).await,
                    self.mock.whoami(mock_tok),
                );
            }
            FuzzOp::CreatePost { uid, reuse_id } => {
                let id = match (reuse_id, self.posts.first()) {
                    (true, Some(id)) => *id,
                    _ => PostId(Uuid::new_v4()),
                };
                let author_id = resize_int(uid, ..self.users.len())
                    .map(|uid| self.users[uid])
                    .unwrap_or(UserId::stub());
                let new_post = NewPost {
                    id,
                    author_id,
                    title: String::from("a post"),
                };
                let app_res: Result<(), _> = run_on_app(
                    &mut self.app,
                    "POST",
                    "/api/admin/create-post",
                    Some(self.admin_token),
                    &new_post,
                )
                .await;
                let mock_res = self.mock.admin_create_post(new_post);
                if app_res.is_ok() && mock_res.is_ok() {
                    self.posts.push(id);
                }
                compare("CreatePost", app_res, mock_res);
            }
            FuzzOp::FetchComments { pid } => {
                let post = self.post(pid);
                let app_res: Result<Vec<Comment>, _> = run_on_app(
                    &mut self.app,
                    "GET",
                    &format!("/comments/{}", post.0),
                    None,
                    &(),
                )
                .await;
                let mock_res = self.mock.fetch_comments(post);
                compare(
                    "FetchComments",
                    app_res.map(|c| shape(&build_tree(c))),
                    mock_res.map(|c| shape(&build_tree(c))),
                );
            }
            FuzzOp::CreateComment {
                sid,
                pid,
                parent,
                text,
            } => {
                let (app_tok, mock_tok) = self.session(sid);
                let post = self.post(pid);
                let (app_parent, mock_parent) = match parent.and_then(|p| self.comment(p)) {
                    Some(p) => (Some(p.app), Some(p.mock)),
                    None => (None, None),
                };
                let text = String::from(TEXTS[text % TEXTS.len()]);
                let app_res: Result<Comment, _> = run_on_app(
                    &mut self.app,
                    "POST",
                    &format!("/posts/{}/comment", post.0),
                    app_tok,
                    &NewComment {
                        comment_text: text.clone(),
                        parent_id: app_parent,
                    },
                )
                .await;
                let mock_res = self.mock.create_comment(
                    mock_tok,
                    post,
                    NewComment {
                        comment_text: text,
                        parent_id: mock_parent,
                    },
                );
                if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
                    assert_eq!(app.post_id, mock.post_id);
                    self.comments.push(Pair {
                        app: app.id,
                        mock: mock.id,
                    });
                }
                compare(
                    "CreateComment",
                    app_res.map(|c| shape_of(&c)),
                    mock_res.map(|c| shape_of(&c)),
                );
            }
            FuzzOp::EditComment { sid, cid, text } => {
                let Some(&Pair { app: app_id, mock: mock_id }) = self.comment(cid) else {
                    return;
                };
                let (app_tok, mock_tok) = self.session(sid);
                let edit = CommentEdit {
                    comment_text: String::from(TEXTS[text % TEXTS.len()]),
                };
                let app_res: Result<Comment, _> = run_on_app(
                    &mut self.app,
                    "PUT",
                    &format!("/comments/{}", app_id.0),
                    app_tok,
                    &edit,
                )
                .await;
                let mock_res = self.mock.edit_comment(mock_tok, mock_id, edit);
                compare(
                    "EditComment",
                    app_res.map(|c| shape_of(&c)),
                    mock_res.map(|c| shape_of(&c)),
                );
            }
            FuzzOp::DeleteComment { sid, cid } => {
                let Some(&Pair { app: app_id, mock: mock_id }) = self.comment(cid) else {
                    return;
                };
                let (app_tok, mock_tok) = self.session(sid);
                compare(
                    "DeleteComment",
                    run_on_app(
                        &mut self.app,
                        "DELETE",
                        &format!("/comments/{}", app_id.0),
                        app_tok,
                        &(),
                    )
                    .await,
                    self.mock.delete_comment(mock_tok, mock_id),
                );
            }
        }
    }
}

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool).await;
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);

#[test]
#[ignore = "requires postgresql binaries in PATH"]
fn thread_lifecycle() {
    with_test_db(|runtime, pool| {
        runtime.block_on(async move {
            let admin = AuthToken(Uuid::new_v4());
            let mut app = app(pool, Some(admin)).await;

            let new_user = |name: &'static str, role: Role| {
                let id = UserId(Uuid::new_v4());
                let user = NewUser {
                    id,
                    name: String::from(name),
                    initial_password_hash: bcrypt::hash(name, TEST_BCRYPT_COST)
                        .expect("hashing test password"),
                    role,
                };
                (id, user)
            };
            let (alice_id, alice) = new_user("alice", Role::Member);
            let (_, bob) = new_user("bob", Role::Member);
            let (_, moderator) = new_user("moderator", Role::Moderator);
            let mut tokens = Vec::new();
            for user in [alice, bob, moderator] {
                let () = run_on_app(
                    &mut app,
                    "POST",
                    "/api/admin/create-user",
                    Some(admin),
                    &user,
                )
                .await
                .expect("creating user");
                let session = NewSession {
                    user: user.name.clone(),
                    password: user.name.clone(),
                };
                let tok: AuthToken = run_on_app(&mut app, "POST", "/api/auth", None, &session)
                    .await
                    .expect("logging in");
                tokens.push(tok);
            }
            let (alice, bob, moderator) = (tokens[0], tokens[1], tokens[2]);

            let post = PostId(Uuid::new_v4());
            let () = run_on_app(
                &mut app,
                "POST",
                "/api/admin/create-post",
                Some(admin),
                &NewPost {
                    id: post,
                    author_id: alice_id,
                    title: String::from("hello world"),
                },
            )
            .await
            .expect("creating post");

            let fetch = format!("/comments/{}", post.0);
            let create = format!("/posts/{}/comment", post.0);
            let comments: Vec<Comment> = run_on_app(&mut app, "GET", &fetch, None, &())
                .await
                .expect("fetching empty thread");
            assert!(comments.is_empty());

            let comment = |tok, text: &str, parent| {
                let body = NewComment {
                    comment_text: String::from(text),
                    parent_id: parent,
                };
                (tok, body)
            };
            let (tok, body) = comment(alice, "root", None);
            let root: Comment = run_on_app(&mut app, "POST", &create, Some(tok), &body)
                .await
                .expect("posting root");
            assert_eq!(root.author_ref.name, "alice");
            assert_eq!(root.author_ref.id, alice_id);
            let (tok, body) = comment(bob, "first reply", Some(root.id));
            let reply: Comment = run_on_app(&mut app, "POST", &create, Some(tok), &body)
                .await
                .expect("posting reply");
            let (tok, body) = comment(alice, "nested", Some(reply.id));
            let _: Comment = run_on_app(&mut app, "POST", &create, Some(tok), &body)
                .await
                .expect("posting nested reply");
            let (tok, body) = comment(bob, "second root", None);
            let _: Comment = run_on_app(&mut app, "POST", &create, Some(tok), &body)
                .await
                .expect("posting second root");

            // anonymous users cannot post, blank comments are refused
            let (_, body) = comment(alice, "anonymous", None);
            assert_eq!(
                run_on_app::<_, Comment>(&mut app, "POST", &create, None, &body).await,
                Err(ApiError::NotLoggedIn)
            );
            let (tok, body) = comment(alice, "  ", None);
            assert_eq!(
                run_on_app::<_, Comment>(&mut app, "POST", &create, Some(tok), &body).await,
                Err(ApiError::EmptyComment)
            );

            let comments: Vec<Comment> = run_on_app(&mut app, "GET", &fetch, None, &())
                .await
                .expect("fetching thread");
            assert_eq!(comments.len(), 4);
            let forest = build_tree(comments);
            let bodies = quill_client::walk(&forest)
                .map(|(depth, n)| (depth, n.body.as_str()))
                .collect::<Vec<_>>();
            assert_eq!(
                bodies,
                vec![
                    (0, "root"),
                    (1, "first reply"),
                    (2, "nested"),
                    (0, "second root"),
                ]
            );

            // bob cannot touch alice's comment, the moderator can
            let edit = CommentEdit {
                comment_text: String::from("edited"),
            };
            let root_uri = format!("/comments/{}", root.id.0);
            assert_eq!(
                run_on_app::<_, Comment>(&mut app, "PUT", &root_uri, Some(bob), &edit).await,
                Err(ApiError::PermissionDenied)
            );
            assert_eq!(
                run_on_app::<_, ()>(&mut app, "DELETE", &root_uri, Some(bob), &()).await,
                Err(ApiError::PermissionDenied)
            );
            let edited: Comment = run_on_app(&mut app, "PUT", &root_uri, Some(moderator), &edit)
                .await
                .expect("moderating");
            assert_eq!(edited.body, "edited");
            assert_eq!(edited.author_ref.name, "alice");

            // deleting the root takes its replies along
            let () = run_on_app(&mut app, "DELETE", &root_uri, Some(alice), &())
                .await
                .expect("deleting root");
            let comments: Vec<Comment> = run_on_app(&mut app, "GET", &fetch, None, &())
                .await
                .expect("fetching thread after delete");
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].body, "second root");
            assert_eq!(
                run_on_app::<_, ()>(&mut app, "DELETE", &root_uri, Some(alice), &()).await,
                Err(ApiError::CommentNotFound(root.id))
            );

            let unknown = PostId(Uuid::new_v4());
            assert_eq!(
                run_on_app::<_, Vec<Comment>>(
                    &mut app,
                    "GET",
                    &format!("/comments/{}", unknown.0),
                    None,
                    &()
                )
                .await,
                Err(ApiError::PostNotFound(unknown))
            );
        })
    })
}
