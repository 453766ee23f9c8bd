//! Checkpoint recovery and persistence
//!
//! Provides serialization to/from files with versioning.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::state::{Checkpoint, CHECKPOINT_VERSION};
use crate::error::CheckpointError;

/// Magic bytes identifying the binary format
const BINARY_MAGIC: &[u8; 4] = b"FESB";

/// Format for checkpoint serialization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// JSON format (human-readable, larger)
    Json,
    /// Binary format (compact, fast)
    #[default]
    Binary,
}

impl CheckpointFormat {
    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "ckpt",
        }
    }
}

/// Save a checkpoint to a file
pub fn save_checkpoint<P, S>(
    checkpoint: &Checkpoint<P, S>,
    path: impl AsRef<Path>,
    format: CheckpointFormat,
) -> Result<(), CheckpointError>
where
    P: Serialize,
    S: Serialize,
{
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        CheckpointFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, checkpoint)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
        CheckpointFormat::Binary => {
            // Version header, then magic bytes for format identification
            writer.write_all(&CHECKPOINT_VERSION.to_le_bytes())?;
            writer.write_all(BINARY_MAGIC)?;
            bincode::serialize_into(&mut writer, checkpoint)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
    }

    writer.flush()?;
    debug!(path = %path.display(), ?format, "checkpoint saved");
    Ok(())
}

/// Load a checkpoint from a file, detecting its format
pub fn load_checkpoint<P, S>(path: impl AsRef<Path>) -> Result<Checkpoint<P, S>, CheckpointError>
where
    P: DeserializeOwned,
    S: DeserializeOwned,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.display().to_string()));
    }

    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let checkpoint: Checkpoint<P, S> = if bytes.len() >= 8 && &bytes[4..8] == BINARY_MAGIC {
        let version = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if version > CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: version,
            });
        }

        bincode::deserialize(&bytes[8..])
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    } else if bytes.first().map_or(false, |b| b.is_ascii_whitespace() || *b == b'{') {
        serde_json::from_slice(&bytes)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    } else {
        return Err(CheckpointError::Corrupted(format!(
            "{} is neither a JSON nor a binary checkpoint",
            path.display()
        )));
    };

    if !checkpoint.is_compatible() {
        return Err(CheckpointError::VersionMismatch {
            expected: CHECKPOINT_VERSION,
            found: checkpoint.version,
        });
    }

    Ok(checkpoint)
}

/// Checkpoint manager for periodic saving
///
/// Files are named `{base_name}_{index:04}.{json|ckpt}` inside `directory`.
pub struct CheckpointManager {
    /// Directory for checkpoint files
    pub directory: PathBuf,
    /// Base filename for checkpoints
    pub base_name: String,
    /// Serialization format
    pub format: CheckpointFormat,
    /// How many checkpoints to keep
    pub keep_n: usize,
    /// Save interval (generations)
    pub interval: usize,
    /// Index of the next checkpoint file
    current_index: usize,
}

impl CheckpointManager {
    /// Create a new checkpoint manager
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
            format: CheckpointFormat::Binary,
            keep_n: 3,
            interval: 100,
            current_index: 0,
        }
    }

    /// Set the serialization format
    pub fn with_format(mut self, format: CheckpointFormat) -> Self {
        self.format = format;
        self
    }

    /// Set how many checkpoints to keep
    pub fn keep(mut self, n: usize) -> Self {
        self.keep_n = n.max(1);
        self
    }

    /// Set the save interval
    pub fn every(mut self, generations: usize) -> Self {
        self.interval = generations.max(1);
        self
    }

    /// Check if a checkpoint should be saved at this generation
    pub fn should_save(&self, generation: usize) -> bool {
        generation > 0 && generation % self.interval == 0
    }

    fn path_for(&self, index: usize) -> PathBuf {
        self.directory.join(format!(
            "{}_{:04}.{}",
            self.base_name,
            index,
            self.format.extension()
        ))
    }

    /// Get the path for the next checkpoint
    pub fn current_path(&self) -> PathBuf {
        self.path_for(self.current_index)
    }

    /// Save a checkpoint and rotate old ones
    pub fn save<P, S>(&mut self, checkpoint: &Checkpoint<P, S>) -> Result<PathBuf, CheckpointError>
    where
        P: Serialize,
        S: Serialize,
    {
        std::fs::create_dir_all(&self.directory)?;

        let path = self.current_path();
        save_checkpoint(checkpoint, &path, self.format)?;

        self.current_index += 1;
        if self.current_index > self.keep_n {
            let old_path = self.path_for(self.current_index - self.keep_n - 1);
            if let Err(e) = std::fs::remove_file(&old_path) {
                debug!(path = %old_path.display(), error = %e, "old checkpoint not removed");
            }
        }

        Ok(path)
    }

    /// Indices of this manager's checkpoint files, highest first
    fn existing_indices(&self) -> Result<Vec<usize>, CheckpointError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_", self.base_name);
        let suffix = format!(".{}", self.format.extension());
        let mut indices: Vec<usize> = std::fs::read_dir(&self.directory)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_prefix(&prefix)?
                    .strip_suffix(&suffix)?
                    .parse::<usize>()
                    .ok()
            })
            .collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        Ok(indices)
    }

    /// Load the newest checkpoint that parses
    ///
    /// Corrupted files are skipped. Subsequent saves continue numbering
    /// after the highest index found.
    pub fn load_latest<P, S>(&mut self) -> Result<Option<Checkpoint<P, S>>, CheckpointError>
    where
        P: DeserializeOwned,
        S: DeserializeOwned,
    {
        let indices = self.existing_indices()?;
        if let Some(&highest) = indices.first() {
            self.current_index = self.current_index.max(highest + 1);
        }

        for index in indices {
            let path = self.path_for(index);
            match load_checkpoint(&path) {
                Ok(checkpoint) => return Ok(Some(checkpoint)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint");
                }
            }
        }

        Ok(None)
    }
}
