use std::io;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// IMDB title identifier: two-letter prefix followed by 7 or 8 digits.
    static ref IMDB_ID: Regex = Regex::new(r"tt\d{7,8}").unwrap();
}

#[derive(Error, Debug)]
pub(crate) enum ReleaseError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("could not find imdb id in file {}", .0.display())]
    ImdbIdNotFound(PathBuf),

    #[error("media info file {} is not valid JSON: {}", .0.display(), .1)]
    InvalidMediainfo(PathBuf, #[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads a required file into memory, mapping a missing path to
/// [`ReleaseError::FileNotFound`] up front. Contents are owned so no handle
/// stays open past this call, whatever happens later in the run.
pub(crate) fn read_required(path: &Path) -> Result<Vec<u8>, ReleaseError> {
    if !path.is_file() {
        return Err(ReleaseError::FileNotFound(path.to_path_buf()));
    }

    Ok(std::fs::read(path)?)
}

/// Extracts the IMDB id from NFO content. NFOs are frequently CP437-flavored,
/// so the bytes are decoded lossily; the id itself is plain ASCII.
pub(crate) fn imdb_id(nfo_path: &Path, nfo_content: &[u8]) -> Result<String, ReleaseError> {
    let text = String::from_utf8_lossy(nfo_content);
    match IMDB_ID.find(&text) {
        Some(found) => Ok(found.as_str().to_string()),
        None => Err(ReleaseError::ImdbIdNotFound(nfo_path.to_path_buf())),
    }
}

/// Reads the media-technical metadata file. The content is passed through to
/// the tracker unmodified, but it must at least parse as JSON so a stray path
/// or truncated dump fails here instead of inside the upload form.
pub(crate) fn mediainfo(path: &Path) -> Result<String, ReleaseError> {
    let content = read_required(path)?;
    let text = String::from_utf8_lossy(&content).into_owned();

    if let Err(e) = serde_json::from_str::<serde_json::Value>(&text) {
        return Err(ReleaseError::InvalidMediainfo(path.to_path_buf(), e));
    }

    Ok(text)
}
