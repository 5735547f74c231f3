use crate::auth::session::{CookieSession, SessionStore, Sessions};
use crate::ensaluti::handlers::{escape_html, page, session_id_from_headers};
use axum::{extract::Extension, http::HeaderMap, response::Html};
use std::sync::Arc;

// axum handler for the authentication-status page
pub async fn index(sessions: Extension<Arc<Sessions>>, headers: HeaderMap) -> Html<String> {
    let session = CookieSession::from_cookie(sessions.0.clone(), session_id_from_headers(&headers));

    Html(index_page(session.subject().as_deref()))
}

fn index_page(subject: Option<&str>) -> String {
    let body = match subject {
        Some(username) => format!(
            "<h1>ensaluti</h1>\n<p>Signed in as <strong>{}</strong>.</p>\n<p><a href=\"/logout\">Log out</a></p>",
            escape_html(username)
        ),
        None => String::from(
            "<h1>ensaluti</h1>\n<p>Not signed in.</p>\n<p><a href=\"/login\">Log in</a></p>",
        ),
    };

    page(&body)
}
