//! Durable progress marker for crash-resumable runs.
//!
//! The checkpoint holds a single non-negative integer: the index of the next
//! recipient that has not been attempted. Every recipient before it was
//! attempted in some run.

use crate::error::{CampaignError, CampaignResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Storage for the resume index.
pub trait Checkpoint: Send {
    /// Read the stored index; absent or unreadable storage reads as `0`.
    fn load(&self) -> usize;

    /// Replace the stored index.
    fn save(&mut self, index: usize) -> CampaignResult<()>;
}

/// Checkpoint kept in a small text file holding the decimal index.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so an interrupted save leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(&self, index: usize) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        write!(tmp, "{}", index)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Checkpoint for FileCheckpoint {
    fn load(&self) -> usize {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint file, starting from 0");
                return 0;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read checkpoint, starting from 0");
                return 0;
            }
        };

        match content.trim().parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    content = %content.trim(),
                    "Malformed checkpoint, starting from 0"
                );
                0
            }
        }
    }

    fn save(&mut self, index: usize) -> CampaignResult<()> {
        self.write_atomically(index).map_err(|e| {
            CampaignError::Checkpoint(format!("cannot write {}: {}", self.path.display(), e))
        })
    }
}

/// Checkpoint that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpoint {
    index: usize,
    saves: Vec<usize>,
}

impl InMemoryCheckpoint {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            saves: Vec::new(),
        }
    }

    /// Every value saved so far, oldest first.
    pub fn saves(&self) -> &[usize] {
        &self.saves
    }
}

impl Checkpoint for InMemoryCheckpoint {
    fn load(&self) -> usize {
        self.index
    }

    fn save(&mut self, index: usize) -> CampaignResult<()> {
        self.index = index;
        self.saves.push(index);
        Ok(())
    }
}
