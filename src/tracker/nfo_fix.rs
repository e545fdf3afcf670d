use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::tracker::session::Session;

lazy_static! {
    static ref NFO_FILE: Regex = Regex::new(r"(?i)\.nfo$").unwrap();
}

/// Canonical NFO details for a release, as reported by the lookup API.
#[derive(Deserialize, Debug)]
pub(crate) struct NfoDetails {
    release: String,
    nfo: Vec<String>,
    nfolink: Vec<String>,
}

impl NfoDetails {
    fn canonical_name(&self) -> Result<&str> {
        self.nfo
            .first()
            .map(String::as_str)
            .with_context(|| format!("lookup returned no nfo for {}", self.release))
    }

    fn download_url(&self) -> Result<&str> {
        self.nfolink
            .first()
            .map(String::as_str)
            .with_context(|| format!("lookup returned no nfo link for {}", self.release))
    }
}

/// Replaces a mismatched local NFO with the canonical one.
///
/// Looks the release up by directory name, compares the canonical NFO
/// filename against whatever `*.nfo` sits in the directory and, when they
/// differ, swaps the local file out for a fresh download. The canonical
/// content is fetched before the old file is removed.
pub(crate) fn fix(session: &Session, api_url: &str, directory: &Path) -> Result<()> {
    let release_name = directory
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("not a release directory: {}", directory.display()))?;

    let local = find_nfo(directory)?
        .with_context(|| format!("could not find nfo file in {}", directory.display()))?;
    let local_name = local
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    trace!("Local nfo: {}", local_name);

    let details = lookup(session, api_url, release_name)?;
    let canonical_name = details.canonical_name()?;

    if local_name == canonical_name {
        info!("{} already carries the canonical nfo", release_name);
        return Ok(());
    }

    info!("Replacing {} with {}", local_name, canonical_name);
    let content = download(session, details.download_url()?)?;
    std::fs::remove_file(&local)
        .with_context(|| format!("could not remove {}", local.display()))?;
    std::fs::write(directory.join(canonical_name), content)?;

    Ok(())
}

/// Queries the lookup API for the canonical NFO of `release_name`.
pub(crate) fn lookup(session: &Session, api_url: &str, release_name: &str) -> Result<NfoDetails> {
    let url = format!("{}/v1/nfo/{}", api_url, release_name);
    let response = session.client().get(&url).send()?;
    if !response.status().is_success() {
        bail!("nfo lookup failed with status {}", response.status());
    }

    Ok(response.json()?)
}

fn download(session: &Session, url: &str) -> Result<Vec<u8>> {
    let response = session.client().get(url).send()?;
    if !response.status().is_success() {
        bail!("nfo download failed with status {}", response.status());
    }

    Ok(response.bytes()?.to_vec())
}

/// Returns the first `*.nfo` file in `directory`, if any.
pub(crate) fn find_nfo(directory: &Path) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(directory)
        .with_context(|| format!("could not read {}", directory.display()))?
    {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| NFO_FILE.is_match(name));
        if path.is_file() && matches {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
