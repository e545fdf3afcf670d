use std::path::{Path, PathBuf};

use anyhow::{Context, Error, bail};
use console::Term;
use log::{info, trace};

use crate::tracker::auth::Credentials;
use crate::tracker::classify::{Classifier, ConsolePrompt};
use crate::tracker::imagehost::ImageHost;
use crate::tracker::io::{Config, LOGIN_NAME, Login};
use crate::tracker::nfo_fix;
use crate::tracker::session::Session;
use crate::tracker::store::FileStore;
use crate::tracker::upload::Submission;
use crate::tracker::{TrackerConnector, spinner};
use crate::{Cli, Commands};

/// The name of the cargo package.
const NAME: &str = env!("CARGO_PKG_NAME");

/// The version of the cargo package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A program class that handles the flow of a submission run and steps of
/// execution.
pub(crate) struct Program {
    cli: Cli,
}

impl Program {
    /// Creates a new instance of the program.
    pub(crate) fn new(cli: Cli) -> Self {
        Program { cli }
    }

    /// Runs the selected workflow. The whole pipeline is sequential: every
    /// step either succeeds or aborts the run.
    pub(crate) fn run(self) -> Result<(), Error> {
        Term::stdout().set_title("tracker uploader");
        trace!("Starting tracker uploader...");
        trace!("Program Name: {}", NAME);
        trace!("Program Version: {}", VERSION);

        trace!("Checking if config file exists...");
        if !Config::config_exists() {
            trace!("Config file doesn't exist...");
            info!("Creating config file...");
            Config::create_config()?;
        }
        let config = Config::get();

        let Cli {
            debug_proxy,
            command,
        } = self.cli;
        let user_agent = format!("{}/{}", NAME, VERSION);
        let session = Session::new(&user_agent, debug_proxy)?;

        match command {
            Commands::Upload {
                torrent,
                nfo,
                mediainfo,
                dirname,
                key,
                username,
                password,
            } => run_upload(
                config, session, &torrent, &nfo, &mediainfo, &dirname, key, username, password,
            ),
            Commands::FixNfo { dirname } => nfo_fix::fix(&session, config.nfo_api_url(), &dirname),
            Commands::UploadImages {
                directory,
                key,
                username,
                password,
            } => run_image_upload(config, session, &directory, key, username, password),
        }
    }
}

/// The core pipeline: classify, authenticate, submit. Classification runs
/// first so the operator prompt, if any, happens before the network is
/// touched and before the one-time login token is scraped.
#[allow(clippy::too_many_arguments)]
fn run_upload(
    config: &Config,
    session: Session,
    torrent: &Path,
    nfo: &Path,
    mediainfo: &Path,
    dirname: &str,
    key: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<(), Error> {
    let login = Login::get().override_with(username, password, key);
    if login.is_empty() {
        bail!(
            "username, password and API key are required; pass them as flags or fill in {}",
            LOGIN_NAME
        );
    }
    trace!("Login Username: {}", login.username());
    trace!("Login API Key: {}", "*".repeat(login.api_key().len()));

    let store = FileStore::new(config.scene_file(), config.p2p_file());
    let mut classifier = Classifier::new(store, ConsolePrompt);
    let submission = Submission::build(dirname, torrent, nfo, mediainfo, &mut classifier)?;

    let connector = TrackerConnector::new(session, config.tracker_url(), login.api_key());
    let credentials = Credentials {
        username: login.username().to_string(),
        password: login.password().to_string(),
    };
    connector.authenticate(&credentials)?;

    let body = connector.upload(submission)?;
    info!("Upload of {} successful", dirname);
    println!("{}", body);

    Ok(())
}

/// Authenticates against the image host and uploads every png in the given
/// directory, printing one BBCode image line per link.
fn run_image_upload(
    config: &Config,
    session: Session,
    directory: &Path,
    key: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<(), Error> {
    let login = Login::get().override_with(username, password, key);
    if login.is_empty() {
        bail!(
            "image host email, password and API key are required; pass them as flags or fill in {}",
            LOGIN_NAME
        );
    }

    let images = list_pngs(directory)?;
    if images.is_empty() {
        bail!("no png files found in {}", directory.display());
    }
    trace!("Uploading {} images...", images.len());

    let host = ImageHost::new(&session, config.image_host_url(), login.api_key());
    host.authenticate(login.username(), login.password())?;

    let progress = spinner("Uploading images...");
    let links = host.upload(&images);
    progress.finish_and_clear();

    for link in links? {
        println!("[img]{}[/img]", link);
    }

    Ok(())
}

/// Collects the png files of `directory` in name order.
fn list_pngs(directory: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(directory)
        .with_context(|| format!("could not read {}", directory.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    images.sort();

    Ok(images)
}
