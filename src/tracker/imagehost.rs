use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::tracker::session::Session;

#[derive(Error, Debug)]
pub(crate) enum ImageHostError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("image host login failed with status {0}")]
    LoginFailed(StatusCode),

    #[error("image host login did not establish a session")]
    SessionNotEstablished,

    #[error("image {} does not exist", .0.display())]
    MissingImage(PathBuf),

    #[error("image upload rejected with status {0}")]
    UploadRejected(StatusCode),

    #[error("unexpected upload response: {0}")]
    BadResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One uploaded image in the host's response, rendered into a public URL as
/// `{host}/{code}.{ext}`.
#[derive(Deserialize, Debug)]
struct UploadedImage {
    code: String,
    ext: String,
}

/// Client for the image-hosting service: one login, then batch uploads of
/// screenshot files as multipart form data.
pub(crate) struct ImageHost<'a> {
    session: &'a Session,
    base_url: String,
    api_key: String,
}

impl<'a> ImageHost<'a> {
    pub(crate) fn new(session: &'a Session, base_url: &str, api_key: &str) -> Self {
        ImageHost {
            session,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Logs in with the account email and password. Unlike the tracker login,
    /// a 2xx here is not proof of anything: the host answers a failed login
    /// with a friendly 200 page, so the response body must carry the
    /// logged-in marker before the session counts as established.
    pub(crate) fn authenticate(&self, email: &str, password: &str) -> Result<(), ImageHostError> {
        let form = [("email", email), ("pass", password), ("login", "")];
        let response = self
            .session
            .client()
            .post(format!("{}/login.php", self.base_url))
            .form(&form)
            .send()?;

        if !response.status().is_success() {
            return Err(ImageHostError::LoginFailed(response.status()));
        }
        if !response.text()?.contains("/logout.php") {
            return Err(ImageHostError::SessionNotEstablished);
        }

        info!("Authenticated against image host as {}", email);
        Ok(())
    }

    /// Uploads `images` as one multipart batch and returns a public URL per
    /// image, in upload order. Every path is checked before the first byte
    /// goes out; a single missing file fails the whole batch.
    pub(crate) fn upload(&self, images: &[PathBuf]) -> Result<Vec<String>, ImageHostError> {
        for image in images {
            if !image.is_file() {
                return Err(ImageHostError::MissingImage(image.clone()));
            }
        }

        let mut form = Form::new().text("api_key", self.api_key.clone());
        for (i, image) in images.iter().enumerate() {
            let part = Part::bytes(std::fs::read(image)?)
                .file_name(file_name(image))
                .mime_str("image/png")?;
            form = form.part(format!("file-upload[{}]", i), part);
        }

        let response = self
            .session
            .client()
            .post(format!("{}/upload.php", self.base_url))
            .multipart(form)
            .send()?;
        if !response.status().is_success() {
            return Err(ImageHostError::UploadRejected(response.status()));
        }

        let uploaded: Vec<UploadedImage> = serde_json::from_str(&response.text()?)?;
        Ok(uploaded
            .iter()
            .map(|image| self.image_url(image))
            .collect())
    }

    fn image_url(&self, image: &UploadedImage) -> String {
        format!("{}/{}.{}", self.base_url, image.code, image.ext)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.png")
        .to_string()
}
