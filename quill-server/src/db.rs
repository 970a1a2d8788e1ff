use anyhow::Context;
use chrono::{Duration, Utc};
use quill_api::{
    Actor, AuthToken, AuthorRef, Comment, CommentId, NewPost, NewSession, NewUser, PostId, Role,
    Time, UserId, Uuid,
};
use sqlx::{postgres::PgRow, Row};

use crate::Error;

/// Current time, truncated to the microsecond precision postgres stores
pub fn now() -> Time {
    let now = Utc::now();
    now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1000))
}

pub async fn create_user(conn: &mut sqlx::PgConnection, user: NewUser) -> Result<(), Error> {
    let name_taken = sqlx::query("SELECT 1 FROM users WHERE name = $1")
        .bind(&user.name)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("checking whether user name {:?} is free", user.name))?;
    if name_taken.is_some() {
        return Err(Error::name_already_used(user.name));
    }
    let res = sqlx::query(
        "INSERT INTO users (id, name, password_hash, role) VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING",
    )
    .bind(user.id.0)
    .bind(&user.name)
    .bind(&user.initial_password_hash)
    .bind(user.role.as_str())
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting user {:?}", user.id))?;
    match res.rows_affected() {
        1 => Ok(()),
        _ => Err(Error::uuid_already_used(user.id.0)),
    }
}

/// Returns `None` if the user does not exist or the password is wrong
pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    session: &NewSession,
) -> anyhow::Result<Option<AuthToken>> {
    let user = sqlx::query("SELECT id, password_hash FROM users WHERE name = $1")
        .bind(&session.user)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("fetching password hash for {:?}", session.user))?;
    let Some(user) = user else {
        return Ok(None);
    };
    let user_id: Uuid = user.try_get("id").context("retrieving the id field")?;
    let hash: String = user
        .try_get("password_hash")
        .context("retrieving the password_hash field")?;
    if !bcrypt::verify(&session.password, &hash).unwrap_or(false) {
        return Ok(None);
    }

    let token = Uuid::new_v4();
    let now = now();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, login_time, last_active) VALUES ($1, $2, $3, $3)",
    )
    .bind(token)
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting session for user {user_id}"))?;
    Ok(Some(AuthToken(token)))
}

/// Returns `true` if the session existed
pub async fn logout_user(conn: &mut sqlx::PgConnection, token: &AuthToken) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token.0)
        .execute(conn)
        .await
        .context("deleting session")?;
    Ok(res.rows_affected() == 1)
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> Result<Actor, Error> {
    let row = sqlx::query(
        "
            UPDATE sessions
                SET last_active = $1
            FROM users
            WHERE sessions.id = $2
                AND users.id = sessions.user_id
            RETURNING users.id, users.role
        ",
    )
    .bind(now())
    .bind(token.0)
    .fetch_optional(conn)
    .await
    .context("recovering session")?
    .ok_or(Error::not_logged_in())?;
    let role: String = row.try_get("role").context("retrieving the role field")?;
    Ok(Actor {
        id: UserId(row.try_get("id").context("retrieving the id field")?),
        role: role.parse::<Role>().context("parsing the role field")?,
    })
}

pub async fn create_post(conn: &mut sqlx::PgConnection, post: NewPost) -> Result<(), Error> {
    let res = sqlx::query(
        "INSERT INTO posts (id, author_id, title, created_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING",
    )
    .bind(post.id.0)
    .bind(post.author_id.0)
    .bind(&post.title)
    .bind(now())
    .execute(conn)
    .await
    .with_context(|| format!("inserting post {:?}", post.id))?;
    match res.rows_affected() {
        1 => Ok(()),
        _ => Err(Error::uuid_already_used(post.id.0)),
    }
}

async fn check_post_exists(conn: &mut sqlx::PgConnection, post: PostId) -> Result<(), Error> {
    sqlx::query("SELECT 1 FROM posts WHERE id = $1")
        .bind(post.0)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("checking existence of post {post:?}"))?
        .ok_or(Error::post_not_found(post))?;
    Ok(())
}

const COMMENT_COLUMNS: &str = "
    c.id, c.parent_id, c.post_id, c.author_id, u.name AS author_name, c.body, c.created_at
";

fn comment_from_row(row: &PgRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.try_get("id").context("retrieving the id field")?),
        parent_id: row
            .try_get::<Option<Uuid>, _>("parent_id")
            .context("retrieving the parent_id field")?
            .map(CommentId),
        post_id: PostId(row.try_get("post_id").context("retrieving the post_id field")?),
        author_ref: AuthorRef {
            id: UserId(
                row.try_get("author_id")
                    .context("retrieving the author_id field")?,
            ),
            name: row
                .try_get("author_name")
                .context("retrieving the author_name field")?,
            avatar_url: None,
        },
        body: row.try_get("body").context("retrieving the body field")?,
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
    })
}

/// All the comments of a post, flat, oldest first
pub async fn fetch_comments_for_post(
    conn: &mut sqlx::PgConnection,
    post: PostId,
) -> Result<Vec<Comment>, Error> {
    check_post_exists(&mut *conn, post).await?;
    let rows = sqlx::query(&format!(
        "
            SELECT {COMMENT_COLUMNS}
                FROM comments c
            INNER JOIN users u
                ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at, c.id
        "
    ))
    .bind(post.0)
    .fetch_all(conn)
    .await
    .with_context(|| format!("fetching comments for post {post:?}"))?;
    Ok(rows
        .iter()
        .map(comment_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?)
}

pub async fn fetch_comment(
    conn: &mut sqlx::PgConnection,
    id: CommentId,
) -> Result<Comment, Error> {
    let row = sqlx::query(&format!(
        "
            SELECT {COMMENT_COLUMNS}
                FROM comments c
            INNER JOIN users u
                ON u.id = c.author_id
            WHERE c.id = $1
        "
    ))
    .bind(id.0)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("fetching comment {id:?}"))?
    .ok_or(Error::comment_not_found(id))?;
    Ok(comment_from_row(&row)?)
}

/// Insert a comment written by `author`, whose text was already validated
pub async fn insert_comment(
    conn: &mut sqlx::PgConnection,
    author: UserId,
    post: PostId,
    parent: Option<CommentId>,
    body: String,
) -> Result<Comment, Error> {
    check_post_exists(&mut *conn, post).await?;
    if let Some(parent) = parent {
        // the parent must exist, and in the same thread
        if fetch_comment(&mut *conn, parent).await?.post_id != post {
            return Err(Error::comment_not_found(parent));
        }
    }
    let id = CommentId(Uuid::new_v4());
    sqlx::query(
        "
            INSERT INTO comments (id, post_id, parent_id, author_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(id.0)
    .bind(post.0)
    .bind(parent.map(|p| p.0))
    .bind(author.0)
    .bind(&body)
    .bind(now())
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting comment {id:?} on post {post:?}"))?;
    fetch_comment(conn, id).await
}

pub async fn update_comment_body(
    conn: &mut sqlx::PgConnection,
    id: CommentId,
    body: String,
) -> Result<Comment, Error> {
    let res = sqlx::query("UPDATE comments SET body = $1 WHERE id = $2")
        .bind(&body)
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("updating body of comment {id:?}"))?;
    if res.rows_affected() != 1 {
        return Err(Error::comment_not_found(id));
    }
    fetch_comment(conn, id).await
}

/// Delete a comment along with all its replies, transitively
pub async fn delete_comment(conn: &mut sqlx::PgConnection, id: CommentId) -> Result<(), Error> {
    // replies go away through the ON DELETE CASCADE of comments.parent_id
    let res = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id.0)
        .execute(conn)
        .await
        .with_context(|| format!("deleting comment {id:?}"))?;
    match res.rows_affected() {
        1 => Ok(()),
        _ => Err(Error::comment_not_found(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_microsecond_precision() {
        for _ in 0..100 {
            assert_eq!(now().timestamp_subsec_nanos() % 1000, 0);
        }
    }
}
