use std::fmt;
use std::io;
use std::str::FromStr;

use dialoguer::Input;
use thiserror::Error;

use crate::tracker::store::ClassificationStore;

/// Resolution markers checked against the release name, higher tiers first.
/// The first marker that matches decides the category.
const UHD_MARKERS: [&str; 2] = ["2160p", "COMPLETE.UHD.BLURAY"];
const HD_MARKERS: [&str; 2] = ["1080p", "COMPLETE.BLURAY"];

/// How often the operator may mistype a release type before the run aborts.
const MAX_PROMPT_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub(crate) enum ClassifyError {
    #[error("no known resolution marker in release name: {0}")]
    UnknownCategory(String),

    #[error("no valid release type entered, last input: {0:?}")]
    UnknownReleaseType(String),

    #[error("classification store error: {0}")]
    Store(#[from] io::Error),

    #[error("release type prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// The tracker's upload category, carrying the numeric code its form expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    /// 2160p / complete UHD bluray releases.
    Movie2160,
    /// 1080p / complete bluray releases.
    Movie1080,
}

impl Category {
    /// Numeric category code understood by the tracker's upload form.
    pub(crate) fn code(self) -> u32 {
        match self {
            Category::Movie2160 => 42,
            Category::Movie1080 => 9,
        }
    }

    /// Infers the category from the release name. Markers are tested in
    /// priority order (UHD before HD) and the first match wins; a name with
    /// no known marker is an error, never a silent default.
    pub(crate) fn from_release_name(release_name: &str) -> Result<Self, ClassifyError> {
        if UHD_MARKERS.iter().any(|m| release_name.contains(m)) {
            return Ok(Category::Movie2160);
        }
        if HD_MARKERS.iter().any(|m| release_name.contains(m)) {
            return Ok(Category::Movie1080);
        }

        Err(ClassifyError::UnknownCategory(release_name.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Movie2160 => write!(f, "2160p"),
            Category::Movie1080 => write!(f, "1080p"),
        }
    }
}

/// Provenance of a release, tracked per group rather than per release since a
/// group's classification does not vary release to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseType {
    Scene,
    P2p,
}

impl ReleaseType {
    /// The literal string the tracker's upload form expects.
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ReleaseType::Scene => "scene",
            ReleaseType::P2p => "p2p",
        }
    }
}

impl FromStr for ReleaseType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scene" => Ok(ReleaseType::Scene),
            "p2p" => Ok(ReleaseType::P2p),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the release group: the substring after the final `-` separator,
/// or the whole name when no separator is present.
pub(crate) fn group_of(release_name: &str) -> &str {
    release_name.rsplit('-').next().unwrap_or(release_name)
}

/// Source of release-type answers when the store has no entry for a group.
pub(crate) trait ReleaseTypePrompt {
    fn ask(&mut self, group: &str) -> Result<String, dialoguer::Error>;
}

/// Interactive prompt on the operator's terminal. Blocks without timeout;
/// the answer is a one-time human decision.
pub(crate) struct ConsolePrompt;

impl ReleaseTypePrompt for ConsolePrompt {
    fn ask(&mut self, group: &str) -> Result<String, dialoguer::Error> {
        Input::new()
            .with_prompt(format!("Select release type for {} [p2p|scene]", group))
            .interact_text()
    }
}

/// Classifies releases, remembering every release-type answer in the store so
/// the operator is never asked about the same group twice.
pub(crate) struct Classifier<S, P> {
    store: S,
    prompt: P,
}

impl<S: ClassificationStore, P: ReleaseTypePrompt> Classifier<S, P> {
    pub(crate) fn new(store: S, prompt: P) -> Self {
        Classifier { store, prompt }
    }

    /// See [`Category::from_release_name`].
    pub(crate) fn category(&self, release_name: &str) -> Result<Category, ClassifyError> {
        Category::from_release_name(release_name)
    }

    /// Resolves the release type for `group`: a store hit under scene wins,
    /// then a hit under p2p, and only an unseen group reaches the operator.
    /// A fresh answer is persisted before it is returned, so every later
    /// lookup for the group short-circuits here or in a future run.
    pub(crate) fn release_type(&mut self, group: &str) -> Result<ReleaseType, ClassifyError> {
        if self.store.exists(ReleaseType::Scene, group)? {
            debug!("{}: known scene group", group);
            return Ok(ReleaseType::Scene);
        }
        if self.store.exists(ReleaseType::P2p, group)? {
            debug!("{}: known p2p group", group);
            return Ok(ReleaseType::P2p);
        }

        let mut input = String::new();
        for _ in 0..MAX_PROMPT_ATTEMPTS {
            input = self.prompt.ask(group)?;
            match input.trim().parse::<ReleaseType>() {
                Ok(release_type) => {
                    self.store.record(release_type, group)?;
                    info!("Recorded {} as a {} group", group, release_type);
                    return Ok(release_type);
                }
                Err(()) => warn!("Unknown release type {:?}, expected p2p or scene", input),
            }
        }

        Err(ClassifyError::UnknownReleaseType(input))
    }
}
