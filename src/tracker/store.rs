use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::tracker::classify::ReleaseType;

/// Persistent ledger of release groups that have already been classified.
///
/// The store only answers existence queries and records new entries; it never
/// removes or rewrites anything. Callers are expected to check [`exists`]
/// before [`record`], but duplicate entries are harmless.
///
/// [`exists`]: ClassificationStore::exists
/// [`record`]: ClassificationStore::record
pub(crate) trait ClassificationStore {
    /// Returns whether `group` has been recorded under `release_type`.
    fn exists(&self, release_type: ReleaseType, group: &str) -> io::Result<bool>;

    /// Records `group` under `release_type`.
    fn record(&mut self, release_type: ReleaseType, group: &str) -> io::Result<()>;
}

/// File-backed store: one line-oriented text file per release type, one group
/// identifier per line. A missing file is an empty set, not an error.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    scene_path: PathBuf,
    p2p_path: PathBuf,
}

impl FileStore {
    pub(crate) fn new<P: Into<PathBuf>>(scene_path: P, p2p_path: P) -> Self {
        FileStore {
            scene_path: scene_path.into(),
            p2p_path: p2p_path.into(),
        }
    }

    fn path_for(&self, release_type: ReleaseType) -> &Path {
        match release_type {
            ReleaseType::Scene => &self.scene_path,
            ReleaseType::P2p => &self.p2p_path,
        }
    }
}

impl ClassificationStore for FileStore {
    fn exists(&self, release_type: ReleaseType, group: &str) -> io::Result<bool> {
        let path = self.path_for(release_type);
        if !path.is_file() {
            trace!("{}: does not exist, treating as empty set", path.display());
            return Ok(false);
        }

        let reader = BufReader::new(std::fs::File::open(path)?);
        for line in reader.lines() {
            // Exact line match only. A group that happens to be a substring
            // of another recorded group must not count as a hit.
            if line?.trim_end() == group {
                return Ok(true);
            }
        }

        debug!("Could not find {} in {}", group, path.display());
        Ok(false)
    }

    fn record(&mut self, release_type: ReleaseType, group: &str) -> io::Result<()> {
        let path = self.path_for(release_type);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", group)?;

        trace!("Recorded {} in {}", group, path.display());
        Ok(())
    }
}

/// In-memory store used by tests to exercise the classifier without touching
/// the filesystem.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    scene: Vec<String>,
    p2p: Vec<String>,
}

#[cfg(test)]
impl MemoryStore {
    fn set_for(&self, release_type: ReleaseType) -> &Vec<String> {
        match release_type {
            ReleaseType::Scene => &self.scene,
            ReleaseType::P2p => &self.p2p,
        }
    }
}

#[cfg(test)]
impl ClassificationStore for MemoryStore {
    fn exists(&self, release_type: ReleaseType, group: &str) -> io::Result<bool> {
        Ok(self.set_for(release_type).iter().any(|g| g == group))
    }

    fn record(&mut self, release_type: ReleaseType, group: &str) -> io::Result<()> {
        match release_type {
            ReleaseType::Scene => self.scene.push(group.to_string()),
            ReleaseType::P2p => self.p2p.push(group.to_string()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("scene.txt"), dir.path().join("p2p.txt"))
    }

    #[test]
    fn missing_file_is_empty_set() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);

        assert!(!store.exists(ReleaseType::Scene, "GROUPX").unwrap());
        assert!(!store.exists(ReleaseType::P2p, "GROUPX").unwrap());
    }

    #[test]
    fn record_then_exists_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir);

        store.record(ReleaseType::P2p, "GROUPX").unwrap();

        assert!(store.exists(ReleaseType::P2p, "GROUPX").unwrap());
        assert!(!store.exists(ReleaseType::P2p, "OTHER").unwrap());
        // The two sets are disjoint files.
        assert!(!store.exists(ReleaseType::Scene, "GROUPX").unwrap());
    }

    #[test]
    fn exists_matches_whole_lines_only() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir);

        store.record(ReleaseType::Scene, "SUPERGROUP").unwrap();

        assert!(!store.exists(ReleaseType::Scene, "GROUP").unwrap());
        assert!(!store.exists(ReleaseType::Scene, "SUPER").unwrap());
        assert!(store.exists(ReleaseType::Scene, "SUPERGROUP").unwrap());
    }

    #[test]
    fn duplicate_records_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir);

        store.record(ReleaseType::Scene, "GROUPX").unwrap();
        store.record(ReleaseType::Scene, "GROUPX").unwrap();

        assert!(store.exists(ReleaseType::Scene, "GROUPX").unwrap());
    }

    #[test]
    fn entries_survive_reopening_the_store() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = file_store(&dir);
            store.record(ReleaseType::P2p, "GROUPX").unwrap();
        }

        let reopened = file_store(&dir);
        assert!(reopened.exists(ReleaseType::P2p, "GROUPX").unwrap());
    }
}
