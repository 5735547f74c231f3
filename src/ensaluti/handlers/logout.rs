use crate::auth::session::{CookieSession, SessionStore, Sessions};
use crate::ensaluti::handlers::{clear_cookie, session_id_from_headers, CookiePolicy};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

// axum handler for logout. Drops the server-side session and removes the
// cookie, then sends the client home.
pub async fn logout(
    sessions: Extension<Arc<Sessions>>,
    policy: Extension<CookiePolicy>,
    headers: HeaderMap,
) -> Response {
    let mut session =
        CookieSession::from_cookie(sessions.0.clone(), session_id_from_headers(&headers));
    session.clear();

    let mut response = Redirect::to("/").into_response();
    if let Ok(value) = HeaderValue::from_str(&clear_cookie(policy.0)) {
        response.headers_mut().append(SET_COOKIE, value);
    }

    response
}
