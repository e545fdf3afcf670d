use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use thiserror::Error;

use crate::tracker::classify::{Category, Classifier, ReleaseType, ReleaseTypePrompt, group_of};
use crate::tracker::release;
use crate::tracker::session::Session;
use crate::tracker::store::ClassificationStore;

/// Size-limit marker the upload form carries alongside the file parts.
const MAX_FILE_SIZE: &str = "4194304";

/// Bounded timeout on the submission POST. The login exchange deliberately
/// has none beyond the client's defaults.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub(crate) enum SubmissionError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("submission rejected with status {0}")]
    Rejected(StatusCode),
}

/// Everything the tracker's upload form needs for one release. File contents
/// are held as owned buffers, read before any network traffic starts.
#[derive(Debug)]
pub(crate) struct Submission {
    name: String,
    category: Category,
    release_type: ReleaseType,
    imdb_id: String,
    mediainfo: String,
    torrent_name: String,
    torrent: Vec<u8>,
    nfo_name: String,
    nfo: Vec<u8>,
}

impl Submission {
    /// Assembles the submission: reads the torrent, NFO and media-info files,
    /// extracts the IMDB id from the NFO and classifies the release. This is
    /// where an interactive prompt may block, before anything touches the
    /// network.
    pub(crate) fn build<S, P>(
        release_name: &str,
        torrent_path: &Path,
        nfo_path: &Path,
        mediainfo_path: &Path,
        classifier: &mut Classifier<S, P>,
    ) -> Result<Self>
    where
        S: ClassificationStore,
        P: ReleaseTypePrompt,
    {
        let torrent = release::read_required(torrent_path)?;
        let nfo = release::read_required(nfo_path)?;
        let imdb_id = release::imdb_id(nfo_path, &nfo)?;
        let mediainfo = release::mediainfo(mediainfo_path)?;

        let category = classifier.category(release_name)?;
        let group = group_of(release_name);
        let release_type = classifier.release_type(group)?;
        trace!(
            "Classified {} as {} / {}",
            release_name, category, release_type
        );

        Ok(Submission {
            name: release_name.to_string(),
            category,
            release_type,
            imdb_id,
            mediainfo,
            torrent_name: part_name(torrent_path),
            torrent,
            nfo_name: part_name(nfo_path),
            nfo,
        })
    }

    /// Binds the metadata and file parts into the multipart form the upload
    /// endpoint expects. Submissions are always anonymous.
    fn into_form(self) -> Result<Form, reqwest::Error> {
        let torrent = Part::bytes(self.torrent)
            .file_name(self.torrent_name)
            .mime_str("application/x-bittorrent")?;
        let nfo = Part::bytes(self.nfo)
            .file_name(self.nfo_name)
            .mime_str("text/plain")?;

        Ok(Form::new()
            .text("MAX_FILE_SIZE", MAX_FILE_SIZE)
            .text("category", self.category.code().to_string())
            .text("release_type", self.release_type.as_str())
            .text("name", self.name)
            .text("mediainfo", self.mediainfo)
            .text("imdbid", self.imdb_id)
            .text("poster", "")
            .text("description", "")
            .text("anonymous", "1")
            .text("genre", "1")
            .text("id", "")
            .part("torrent", torrent)
            .part("nfo", nfo))
    }
}

/// Performs the single multipart POST against the upload endpoint. One
/// attempt only; the tracker does not want duplicate releases re-posted, so
/// a rejection is reported, never retried.
pub(crate) fn submit(
    session: &Session,
    upload_url: &str,
    submission: Submission,
) -> Result<String, SubmissionError> {
    let form = submission.into_form()?;
    let response = session
        .client()
        .post(upload_url)
        .multipart(form)
        .timeout(SUBMIT_TIMEOUT)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(SubmissionError::Rejected(status));
    }

    Ok(response.text()?)
}

fn part_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::auth::{self, Credentials};
    use crate::tracker::classify::ClassifyError;
    use crate::tracker::release::ReleaseError;
    use crate::tracker::store::MemoryStore;
    use crate::tracker::testing::{StubServer, contains_ci};
    use std::collections::VecDeque;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct ScriptedPrompt(VecDeque<&'static str>);

    impl ReleaseTypePrompt for ScriptedPrompt {
        fn ask(&mut self, _group: &str) -> Result<String, dialoguer::Error> {
            Ok(self.0.pop_front().expect("unexpected prompt").to_string())
        }
    }

    fn classifier(answers: &[&'static str]) -> Classifier<MemoryStore, ScriptedPrompt> {
        Classifier::new(
            MemoryStore::default(),
            ScriptedPrompt(answers.iter().copied().collect()),
        )
    }

    fn release_fixture(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let torrent = dir.path().join("release.torrent");
        let nfo = dir.path().join("release.nfo");
        let mediainfo = dir.path().join("mediainfo.json");
        fs::write(&torrent, b"d8:announce3:urle").unwrap();
        fs::write(&nfo, "greets to everyone / https://imdb.com/title/tt1234567").unwrap();
        fs::write(&mediainfo, "{\"media\": {}}").unwrap();
        (torrent, nfo, mediainfo)
    }

    #[test]
    fn build_assembles_classified_metadata() {
        let dir = TempDir::new().unwrap();
        let (torrent, nfo, mediainfo) = release_fixture(&dir);

        let mut classifier = classifier(&["scene"]);
        let submission = Submission::build(
            "Movie.Name.2023.2160p.UHD.BLURAY-GROUPX",
            &torrent,
            &nfo,
            &mediainfo,
            &mut classifier,
        )
        .unwrap();

        assert_eq!(submission.category, Category::Movie2160);
        assert_eq!(submission.release_type, ReleaseType::Scene);
        assert_eq!(submission.imdb_id, "tt1234567");
        assert_eq!(submission.torrent_name, "release.torrent");
        assert_eq!(submission.nfo_name, "release.nfo");
    }

    #[test]
    fn build_fails_without_an_imdb_id() {
        let dir = TempDir::new().unwrap();
        let (torrent, nfo, mediainfo) = release_fixture(&dir);
        fs::write(&nfo, "no id in this one").unwrap();

        let mut classifier = classifier(&["scene"]);
        let err = Submission::build(
            "Movie.Name.2023.2160p.UHD.BLURAY-GROUPX",
            &torrent,
            &nfo,
            &mediainfo,
            &mut classifier,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::ImdbIdNotFound(_))
        ));
    }

    #[test]
    fn build_fails_closed_on_an_unmarked_release_name() {
        let dir = TempDir::new().unwrap();
        let (torrent, nfo, mediainfo) = release_fixture(&dir);

        let mut classifier = classifier(&[]);
        let err = Submission::build(
            "Movie.Name.2023.720p.WEB-GROUPX",
            &torrent,
            &nfo,
            &mediainfo,
            &mut classifier,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClassifyError>(),
            Some(ClassifyError::UnknownCategory(_))
        ));
    }

    #[test]
    fn accepted_submission_echoes_the_response_body() {
        let dir = TempDir::new().unwrap();
        let (torrent, nfo, mediainfo) = release_fixture(&dir);

        let server = StubServer::spawn(vec![StubServer::response(
            200,
            &[],
            "Upload accepted, torrent id 99182",
        )]);

        let mut classifier = classifier(&["scene"]);
        let submission = Submission::build(
            "Movie.Name.2023.2160p.UHD.BLURAY-GROUPX",
            &torrent,
            &nfo,
            &mediainfo,
            &mut classifier,
        )
        .unwrap();

        let session = Session::new("tracker_uploader/test", false).unwrap();
        let url = format!("{}/sekrit/v1/upload.php", server.base_url());
        let body = submit(&session, &url, submission).unwrap();
        assert_eq!(body, "Upload accepted, torrent id 99182");

        let requests = server.finish();
        assert!(requests[0].starts_with("POST /sekrit/v1/upload.php"));
        assert!(contains_ci(&requests[0], "content-type: multipart/form-data"));
        assert!(requests[0].contains("name=\"category\""));
        assert!(requests[0].contains("name=\"release_type\""));
        assert!(requests[0].contains("name=\"anonymous\""));
        assert!(requests[0].contains("tt1234567"));
        assert!(requests[0].contains("filename=\"release.torrent\""));
        assert!(requests[0].contains("filename=\"release.nfo\""));
    }

    #[test]
    fn rejected_submission_reports_the_status_after_successful_login() {
        let dir = TempDir::new().unwrap();
        let (torrent, nfo, mediainfo) = release_fixture(&dir);

        let server = StubServer::spawn(vec![
            StubServer::response(
                200,
                &["Set-Cookie: session=abc123; Path=/"],
                r#"<input type="hidden" name="csrf_token" value="deadbeef" />"#,
            ),
            StubServer::response(200, &[], "welcome"),
            StubServer::response(403, &[], "upload slot exhausted"),
        ]);

        let session = Session::new("tracker_uploader/test", false).unwrap();
        let credentials = Credentials {
            username: "operator".to_string(),
            password: "hunter2".to_string(),
        };
        auth::authenticate(&session, &server.base_url(), &credentials).unwrap();

        let mut classifier = classifier(&["p2p"]);
        let submission = Submission::build(
            "Movie.Name.2023.1080p.BLURAY-GROUPY",
            &torrent,
            &nfo,
            &mediainfo,
            &mut classifier,
        )
        .unwrap();

        let url = format!("{}/sekrit/v1/upload.php", server.base_url());
        let err = submit(&session, &url, submission).unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected(status) if status.as_u16() == 403));

        // The authenticated session cookie rode along on the upload.
        let requests = server.finish();
        assert_eq!(requests.len(), 3);
        assert!(contains_ci(&requests[2], "cookie: session=abc123"));
    }
}
