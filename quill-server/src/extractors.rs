use std::ops::{Deref, DerefMut};

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use quill_api::{Actor, AuthToken, Uuid};

use crate::{db, Error};

/// Name of the cookie that can carry the session token, instead of the authorization header
pub const SESSION_COOKIE: &str = "session";

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: PgPool,
    pub admin_token: Option<AuthToken>,
}

#[derive(Clone)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    pub fn new(pool: sqlx::PgPool) -> PgPool {
        PgPool(pool)
    }

    pub async fn acquire(&self) -> Result<PgConn, Error> {
        Ok(PgConn(
            self.0.acquire().await.context("acquiring db connection")?,
        ))
    }
}

pub struct PgConn(sqlx::pool::PoolConnection<sqlx::Postgres>);

#[async_trait]
impl FromRequestParts<AppState> for PgConn {
    type Rejection = Error;

    async fn from_request_parts(
        _req: &mut request::Parts,
        state: &AppState,
    ) -> Result<PgConn, Error> {
        state.db.acquire().await
    }
}

impl Deref for PgConn {
    type Target = sqlx::PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

fn parse_bearer(auth: &http::HeaderValue) -> Result<AuthToken, Error> {
    let auth = auth.to_str().map_err(|_| Error::permission_denied())?;
    let mut auth = auth.split(' ');
    if !auth
        .next()
        .ok_or(Error::permission_denied())?
        .eq_ignore_ascii_case("bearer")
    {
        return Err(Error::permission_denied());
    }
    let token = auth.next().ok_or(Error::permission_denied())?;
    if !auth.next().is_none() {
        return Err(Error::permission_denied());
    }
    let token = Uuid::try_from(token).map_err(|_| Error::permission_denied())?;
    Ok(AuthToken(token))
}

fn parse_session_cookie(cookies: &http::HeaderValue) -> Option<Result<AuthToken, Error>> {
    let cookies = match cookies.to_str() {
        Ok(c) => c,
        Err(_) => return Some(Err(Error::permission_denied())),
    };
    cookies
        .split(';')
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| {
            Uuid::try_from(value.trim_matches('"'))
                .map(AuthToken)
                .map_err(|_| Error::permission_denied())
        })
}

/// The session token, if any, without checking it is still valid
pub struct PreAuth(pub AuthToken);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for PreAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<PreAuth, Error> {
        if let Some(auth) = req.headers.get(http::header::AUTHORIZATION) {
            return parse_bearer(auth).map(PreAuth);
        }
        for cookies in req.headers.get_all(http::header::COOKIE) {
            if let Some(token) = parse_session_cookie(cookies) {
                return token.map(PreAuth);
            }
        }
        Err(Error::not_logged_in())
    }
}

/// The actor on whose behalf the request is made
pub struct Auth(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &AppState) -> Result<Auth, Error> {
        let token = PreAuth::from_request_parts(req, state).await?.0;
        let mut conn = PgConn::from_request_parts(req, state).await?;
        Ok(Auth(db::recover_session(&mut *conn, token).await?))
    }
}

pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<AdminAuth, Error> {
        let token = PreAuth::from_request_parts(req, state).await?.0;
        if Some(token) == state.admin_token {
            Ok(AdminAuth)
        } else {
            Err(Error::permission_denied())
        }
    }
}

/// `axum::Json`, rejecting malformed bodies with an API error
#[derive(axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path`, rejecting malformed ids with an API error
#[derive(axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

#[cfg(test)]
mod tests {
    use quill_api::Error as ApiError;

    use super::*;

    async fn preauth(headers: &[(http::HeaderName, &str)]) -> Result<AuthToken, ApiError> {
        let mut req = http::Request::builder().method(http::Method::GET).uri("/");
        for (name, value) in headers {
            req = req.header(name, *value);
        }
        let mut req = req.body(()).unwrap().into_parts().0;
        match PreAuth::from_request_parts(&mut req, &()).await {
            Ok(PreAuth(tok)) => Ok(tok),
            Err(Error::Api(e)) => Err(e),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn token_from_header_or_cookie() {
        let tok = Uuid::new_v4();
        assert_eq!(
            preauth(&[(http::header::AUTHORIZATION, format!("Bearer {tok}").as_str())]).await,
            Ok(AuthToken(tok))
        );
        assert_eq!(
            preauth(&[(
                http::header::COOKIE,
                format!("theme=dark; {SESSION_COOKIE}={tok}").as_str(),
            )])
            .await,
            Ok(AuthToken(tok))
        );
        assert_eq!(
            preauth(&[(http::header::COOKIE, "theme=dark")]).await,
            Err(ApiError::NotLoggedIn)
        );
        assert_eq!(preauth(&[]).await, Err(ApiError::NotLoggedIn));
    }

    #[tokio::test]
    async fn malformed_body_is_an_api_error() {
        use axum::extract::FromRequest;

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri("/")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"commentText\": "))
            .unwrap();
        match JsonBody::<quill_api::NewComment>::from_request(req, &()).await {
            Err(Error::Api(ApiError::InvalidRequest(_))) => (),
            Err(e) => panic!("got unexpected error: {e}"),
            Ok(_) => panic!("truncated body was accepted"),
        }
    }

    #[tokio::test]
    async fn malformed_credentials_are_refused() {
        for auth in ["Basic abc", "Bearer", "Bearer not-a-uuid", "Bearer a b"] {
            assert_eq!(
                preauth(&[(http::header::AUTHORIZATION, auth)]).await,
                Err(ApiError::PermissionDenied),
                "for {auth:?}"
            );
        }
        assert_eq!(
            preauth(&[(http::header::COOKIE, "session=12")]).await,
            Err(ApiError::PermissionDenied)
        );
    }
}
