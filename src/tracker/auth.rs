use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

use crate::tracker::session::Session;

lazy_static! {
    /// Hidden-input signature carrying the one-time anti-forgery token on the
    /// tracker's login page.
    static ref CSRF_TOKEN: Regex = Regex::new(r#"name="csrf_token" value="([^"]+)""#).unwrap();
}

#[derive(Error, Debug)]
pub(crate) enum AuthError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("login page returned status {0}")]
    PageUnavailable(StatusCode),

    #[error("could not find anti-forgery token on login page")]
    TokenNotFound,

    #[error("login failed with status {0}")]
    LoginFailed(StatusCode),
}

/// Tracker account credentials for the login exchange.
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

/// Logs the session in against the tracker's web front-end.
///
/// Fetches the login page, scrapes the anti-forgery token from it and posts
/// the credentials together with that token. The token is single-use and only
/// valid for the POST that immediately follows its retrieval. A 2xx response
/// to the credential POST is treated as success; an invalid session surfaces
/// at the submission step instead.
pub(crate) fn authenticate(
    session: &Session,
    tracker_url: &str,
    credentials: &Credentials,
) -> Result<(), AuthError> {
    trace!("Fetching login page...");
    let response = session
        .client()
        .get(format!("{}/login.php", tracker_url))
        .send()?;
    if !response.status().is_success() {
        return Err(AuthError::PageUnavailable(response.status()));
    }

    let body = response.text()?;
    let token = extract_token(&body).ok_or(AuthError::TokenNotFound)?;
    trace!("Anti-forgery token scraped from login page");

    let form = [
        ("csrf_token", token),
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
    ];
    let response = session
        .client()
        .post(format!("{}/takelogin.php", tracker_url))
        .form(&form)
        .send()?;
    if !response.status().is_success() {
        return Err(AuthError::LoginFailed(response.status()));
    }

    info!("Authenticated as {}", credentials.username);
    Ok(())
}

fn extract_token(body: &str) -> Option<&str> {
    CSRF_TOKEN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}
