use crate::auth::{
    rate_limit::{RateLimitAction, RateLimitDecision, RateLimiter},
    session::{CookieChange, CookieSession, Sessions},
    store::SqliteRecordStore,
    verifier::CredentialVerifier,
};
use crate::ensaluti::handlers::{
    escape_html, establish_cookie, extract_client_ip, page, session_id_from_headers, CookiePolicy,
};
use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;

/// The one message every failed login gets, regardless of the cause.
pub const LOGIN_ERROR_MESSAGE: &str = "Invalid username or password. Please try again.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    username: Option<String>,
    password: Option<SecretString>,
}

// axum handler for the login form
pub async fn login_form() -> Html<String> {
    Html(login_page(None))
}

// axum handler for login. Every failure collapses into the same re-rendered
// form: no 401, no per-cause message, no hint whether the username exists.
pub async fn login(
    headers: HeaderMap,
    verifier: Extension<Arc<CredentialVerifier<SqliteRecordStore>>>,
    sessions: Extension<Arc<Sessions>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    policy: Extension<CookiePolicy>,
    payload: Option<Form<LoginForm>>,
) -> Response {
    let form = match payload {
        Some(Form(form)) => form,
        None => LoginForm::default(),
    };

    let client = extract_client_ip(&headers);
    if limiter.check(client.as_deref(), RateLimitAction::Login) == RateLimitDecision::Limited {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let username = form.username.as_deref().unwrap_or_default();
    let candidate = form
        .password
        .as_ref()
        .map_or("", |password| password.expose_secret());

    let mut session =
        CookieSession::from_cookie(sessions.0.clone(), session_id_from_headers(&headers));

    match verifier.verify(username, candidate, &mut session).await {
        Ok(_subject) => {
            let mut response = Redirect::to("/").into_response();

            if let Some(CookieChange::Established(id)) = session.change() {
                let max_age = sessions
                    .get(id)
                    .is_some_and(|session| session.permanent())
                    .then(|| sessions.lifetime());
                if let Ok(value) = HeaderValue::from_str(&establish_cookie(id, max_age, policy.0)) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }

            response
        }

        // MissingInput, InvalidCredentials and StorageUnavailable all land
        // here with the same generic message and a plain 200.
        Err(_) => (StatusCode::OK, Html(login_page(Some(LOGIN_ERROR_MESSAGE)))).into_response(),
    }
}

pub(crate) fn login_page(error: Option<&str>) -> String {
    let notice = error.map_or_else(String::new, |message| {
        format!("<p class=\"error\">{}</p>\n", escape_html(message))
    });

    page(&format!(
        "<h1>Log in</h1>\n{notice}<form method=\"post\" action=\"/login\">\n\
         <label>Username <input name=\"username\" autocomplete=\"username\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\" autocomplete=\"current-password\"></label>\n\
         <button type=\"submit\">Log in</button>\n</form>"
    ))
}
