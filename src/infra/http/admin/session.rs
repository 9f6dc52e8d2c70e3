use std::net::SocketAddr;

use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::auth::AuthError;

use super::{AdminState, SESSION_COOKIE};
use crate::infra::http::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AdminState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let client = peer
        .map(|Extension(ConnectInfo(addr))| addr.ip().to_string())
        .unwrap_or_else(|| "local".to_string());

    let (allowed, _) = state.login_limiter.allow(&client);
    if !allowed {
        return Ok(ApiError::rate_limited(
            state.login_limiter.retry_after_secs(),
        ));
    }

    let issued = state.auth.login(&request.password).await?;
    state.login_limiter.reset(&client);

    let max_age = time::Duration::try_from(state.auth.session_ttl())
        .unwrap_or_else(|_| time::Duration::hours(12));
    let cookie = Cookie::build((SESSION_COOKIE, issued.token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(state.cookie_secure)
        .max_age(max_age);

    let body = SessionResponse {
        session_id: None,
        expires_at: issued.expires_at,
    };
    Ok((jar.add(cookie), Json(body)).into_response())
}

pub async fn current(
    State(state): State<AdminState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::Missing)?;
    let principal = state.auth.authenticate(&token).await?;

    Ok(Json(SessionResponse {
        session_id: Some(principal.session_id),
        expires_at: principal.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AdminState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.auth.logout(cookie.value()).await?;
    }

    let removal = Cookie::build(SESSION_COOKIE).path("/");
    Ok((jar.remove(removal), StatusCode::NO_CONTENT))
}
