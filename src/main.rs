#[macro_use]
extern crate log;

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Error;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

use crate::program::Program;

mod program;
mod tracker;

/// Name of the log file kept next to the binary.
const LOG_NAME: &str = "tracker_uploader.log";

#[derive(Parser)]
#[command(name = "tracker_uploader", about = "Classify releases and submit them to the tracker")]
pub(crate) struct Cli {
    /// Route all HTTP traffic through a local intercepting proxy and skip
    /// certificate verification, for debugging the exchanges
    #[arg(long)]
    pub(crate) debug_proxy: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Classify a release and submit it to the tracker's upload endpoint
    Upload {
        /// Path to the torrent file
        #[arg(short = 't', long)]
        torrent: PathBuf,

        /// Path to the nfo file
        #[arg(short = 'n', long)]
        nfo: PathBuf,

        /// Path to the media info JSON dump
        #[arg(short = 'm', long)]
        mediainfo: PathBuf,

        /// Release directory name
        #[arg(short = 'd', long)]
        dirname: String,

        /// Upload API key (overrides login.json)
        #[arg(short = 'k', long)]
        key: Option<String>,

        /// Tracker username (overrides login.json)
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Tracker password (overrides login.json)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },

    /// Replace a mismatched local nfo with the canonical one
    FixNfo {
        /// Release directory holding the nfo to check
        #[arg(short = 'd', long)]
        dirname: PathBuf,
    },

    /// Upload screenshots to the image host and print their public links
    UploadImages {
        /// Directory containing png screenshots
        #[arg(long)]
        directory: PathBuf,

        /// Image host API key (overrides login.json)
        #[arg(short = 'k', long)]
        key: Option<String>,

        /// Image host account email (overrides login.json)
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Image host account password (overrides login.json)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
}

fn main() -> Result<(), Error> {
    initialize_logger();

    let program = Program::new(Cli::parse());
    program.run()
}

/// Initializes the logger with preset filtering: info and up on the
/// terminal, everything into the log file.
fn initialize_logger() {
    let mut config = ConfigBuilder::new();
    config.add_filter_allow_str("tracker_uploader");

    let log_file = OpenOptions::new().create(true).append(true).open(LOG_NAME);
    let result = match log_file {
        Ok(file) => CombinedLogger::init(vec![
            TermLogger::new(
                LevelFilter::Info,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ),
            WriteLogger::new(LevelFilter::max(), config.build(), file),
        ]),
        Err(e) => {
            eprintln!(
                "Failed to open {}: {}. Logging will only output to terminal.",
                LOG_NAME, e
            );
            TermLogger::init(
                LevelFilter::Info,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )
        }
    };

    if let Err(e) = result {
        eprintln!("Failed to initialize logger: {}", e);
    }
}
