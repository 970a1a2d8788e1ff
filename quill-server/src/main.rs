use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use quill_api::{AuthToken, Uuid};
use structopt::StructOpt;

mod db;
mod error;
mod extractors;
mod fuzz;
mod handlers;

pub use error::Error;
use extractors::{AppState, PgPool};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, StructOpt)]
#[structopt(
    name = "quill-server",
    about = "Serves the comment threads of the blog. DATABASE_URL must point to a postgres database, \
             and ADMIN_TOKEN (a uuid) enables the admin endpoints."
)]
struct Opt {
    /// Address to listen on
    #[structopt(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
}

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(db_url)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))
}

pub async fn app(db: sqlx::PgPool, admin_token: Option<AuthToken>) -> Router {
    let state = AppState {
        db: PgPool::new(db),
        admin_token,
    };
    Router::new()
        .route("/api/admin/create-user", post(handlers::admin_create_user))
        .route("/api/admin/create-post", post(handlers::admin_create_post))
        .route("/api/auth", post(handlers::auth))
        .route("/api/unauth", post(handlers::unauth))
        .route("/api/whoami", get(handlers::whoami))
        // GET takes a post id, PUT and DELETE a comment id
        .route(
            "/comments/:id",
            get(handlers::fetch_comments)
                .put(handlers::edit_comment)
                .delete(handlers::delete_comment),
        )
        .route("/posts/:id/comment", post(handlers::create_comment))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = Opt::from_args();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let admin_token = match std::env::var("ADMIN_TOKEN") {
        Ok(t) => Some(AuthToken(
            Uuid::try_parse(&t).context("ADMIN_TOKEN is not a valid uuid")?,
        )),
        Err(_) => {
            tracing::warn!("ADMIN_TOKEN is not set, admin endpoints will refuse all requests");
            None
        }
    };

    let db = create_sqlx_pool(&db_url).await?;
    MIGRATOR
        .run(&db)
        .await
        .context("running pending migrations")?;

    let app = app(db, admin_token).await;
    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
