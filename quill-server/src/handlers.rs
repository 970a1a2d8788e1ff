use anyhow::Context;
use axum::Json;
use quill_api::{
    Actor, AuthToken, Comment, CommentEdit, CommentId, NewComment, NewPost, NewSession, NewUser,
    PostId, Uuid,
};

use crate::{db, extractors::*, Error};

pub async fn admin_create_user(
    AdminAuth: AdminAuth,
    mut conn: PgConn,
    JsonBody(data): JsonBody<NewUser>,
) -> Result<Json<()>, Error> {
    data.validate()?;
    db::create_user(&mut *conn, data.clone()).await?;
    tracing::info!(id=?data.id, name=?data.name, role=%data.role, "created user");
    Ok(Json(()))
}

pub async fn admin_create_post(
    AdminAuth: AdminAuth,
    mut conn: PgConn,
    JsonBody(data): JsonBody<NewPost>,
) -> Result<Json<()>, Error> {
    data.validate()?;
    let id = data.id;
    db::create_post(&mut *conn, data).await?;
    tracing::info!(?id, "created post");
    Ok(Json(()))
}

pub async fn auth(
    mut conn: PgConn,
    JsonBody(data): JsonBody<NewSession>,
) -> Result<Json<AuthToken>, Error> {
    data.validate()?;
    Ok(Json(
        db::login_user(&mut *conn, &data)
            .await
            .context("logging user in")?
            .ok_or(Error::permission_denied())?,
    ))
}

pub async fn unauth(user: PreAuth, mut conn: PgConn) -> Result<Json<()>, Error> {
    match db::logout_user(&mut *conn, &user.0).await {
        Ok(true) => Ok(Json(())),
        Ok(false) => Err(Error::not_logged_in()),
        Err(e) => Err(Error::Anyhow(e)),
    }
}

pub async fn whoami(Auth(actor): Auth) -> Json<Actor> {
    Json(actor)
}

/// Readable by everyone, logged in or not
pub async fn fetch_comments(
    Path(post): Path<Uuid>,
    mut conn: PgConn,
) -> Result<Json<Vec<Comment>>, Error> {
    let comments = db::fetch_comments_for_post(&mut *conn, PostId(post)).await?;
    tracing::debug!(?post, num_comments = comments.len(), "fetched comments");
    Ok(Json(comments))
}

pub async fn create_comment(
    Auth(actor): Auth,
    mut conn: PgConn,
    Path(post): Path<Uuid>,
    JsonBody(data): JsonBody<NewComment>,
) -> Result<Json<Comment>, Error> {
    data.validate()?;
    let comment = db::insert_comment(
        &mut *conn,
        actor.id,
        PostId(post),
        data.parent_id,
        data.comment_text,
    )
    .await?;
    tracing::info!(id=?comment.id, parent=?comment.parent_id, author=?actor.id, "created comment");
    Ok(Json(comment))
}

pub async fn edit_comment(
    Auth(actor): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
    JsonBody(data): JsonBody<CommentEdit>,
) -> Result<Json<Comment>, Error> {
    data.validate()?;
    let id = CommentId(id);
    let comment = db::fetch_comment(&mut *conn, id).await?;
    if !actor.can_modify(&comment) {
        return Err(Error::permission_denied());
    }
    let comment = db::update_comment_body(&mut *conn, id, data.comment_text).await?;
    tracing::info!(?id, editor=?actor.id, "edited comment");
    Ok(Json(comment))
}

pub async fn delete_comment(
    Auth(actor): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<Json<()>, Error> {
    let id = CommentId(id);
    let comment = db::fetch_comment(&mut *conn, id).await?;
    if !actor.can_modify(&comment) {
        return Err(Error::permission_denied());
    }
    db::delete_comment(&mut *conn, id).await?;
    tracing::info!(?id, deleter=?actor.id, "deleted comment and its replies");
    Ok(Json(()))
}
