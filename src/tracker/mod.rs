use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub(crate) mod auth;
pub(crate) mod classify;
pub(crate) mod imagehost;
pub(crate) mod io;
pub(crate) mod nfo_fix;
pub(crate) mod release;
pub(crate) mod session;
pub(crate) mod store;
pub(crate) mod upload;

#[cfg(test)]
pub(crate) mod testing;

use auth::{AuthError, Credentials};
use session::Session;
use upload::{Submission, SubmissionError};

/// A web connector that manages the authenticated exchange with the tracker:
/// the login handshake first, then the single multipart submission over the
/// same session.
pub(crate) struct TrackerConnector {
    /// The session carrying the login cookies.
    session: Session,
    /// Base URL of the tracker's web front-end.
    base_url: String,
    /// API key woven into the upload endpoint path.
    api_key: String,
}

impl TrackerConnector {
    pub(crate) fn new(session: Session, base_url: &str, api_key: &str) -> Self {
        TrackerConnector {
            session,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Logs the session in against the tracker front-end.
    pub(crate) fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        auth::authenticate(&self.session, &self.base_url, credentials)
    }

    /// Submits the release and returns the tracker's response body.
    pub(crate) fn upload(&self, submission: Submission) -> Result<String, SubmissionError> {
        let spinner = spinner("Uploading release...");
        let result = upload::submit(&self.session, &self.upload_url(), submission);
        spinner.finish_and_clear();

        result
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/v1/upload.php", self.base_url, self.api_key)
    }
}

/// Spinner shown while a network call is in flight.
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(message.to_string());

    spinner
}
