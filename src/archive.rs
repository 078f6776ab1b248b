//! Replay archive access.
//!
//! A replay is a compound container holding a small header blob plus a
//! set of independently stored, named sub-streams. The physical container
//! format (block tables, sector decompression, hashing) is outside this
//! crate; [`ReplayArchive`] is the narrow seam decoders consume, and any
//! MPQ extraction layer can sit behind it.
//!
//! Two implementations ship here:
//!
//! - [`MemoryArchive`] - sub-streams held in memory, for callers that
//!   extracted the container themselves and for tests
//! - [`DirArchive`] - a directory of extracted sub-stream files, the
//!   working format produced by external extraction tools
//!
//! # Sub-stream names
//!
//! The container addresses sub-streams by fixed string keys:
//! `replay.details`, `replay.initData`, `replay.game.events`,
//! `replay.message.events`, `replay.tracker.events` and
//! `replay.attributes.events`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReplayError, Result};

/// Sub-stream holding the match details record.
pub const SUBSTREAM_DETAILS: &str = "replay.details";

/// Sub-stream holding the lobby/init state record.
pub const SUBSTREAM_INITDATA: &str = "replay.initData";

/// Sub-stream holding simulation (game) events.
pub const SUBSTREAM_GAME_EVENTS: &str = "replay.game.events";

/// Sub-stream holding chat/message events.
pub const SUBSTREAM_MESSAGE_EVENTS: &str = "replay.message.events";

/// Sub-stream holding analytics (tracker) events.
pub const SUBSTREAM_TRACKER_EVENTS: &str = "replay.tracker.events";

/// Sub-stream holding player attribute events.
pub const SUBSTREAM_ATTRIBUTES_EVENTS: &str = "replay.attributes.events";

/// File name under which [`DirArchive`] expects the container header blob.
pub const HEADER_FILE: &str = "replay.header";

/// An opened, immutable replay container.
///
/// Implementations expose the container's header blob (always available
/// after a successful open) and named sub-stream extraction. Container
/// level integrity checks and decompression are the implementation's
/// responsibility and opaque to callers.
pub trait ReplayArchive {
    /// Returns the container's header blob.
    fn header_blob(&self) -> &[u8];

    /// Reads the raw bytes of the named sub-stream.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::MissingSubstream` when the named entry is
    /// absent. This fails only the requesting load operation, not the
    /// whole session.
    fn read_substream(&self, name: &str) -> Result<Vec<u8>>;
}

/// An archive whose header and sub-streams live in memory.
///
/// # Example
///
/// ```
/// use stormreplay::archive::{MemoryArchive, ReplayArchive, SUBSTREAM_DETAILS};
///
/// let archive = MemoryArchive::new(vec![1, 2, 3])
///     .with_substream(SUBSTREAM_DETAILS, vec![4, 5]);
///
/// assert_eq!(archive.header_blob(), &[1, 2, 3]);
/// assert_eq!(archive.read_substream(SUBSTREAM_DETAILS).unwrap(), vec![4, 5]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    header: Vec<u8>,
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// Creates an archive with the given header blob and no sub-streams.
    #[must_use]
    pub fn new(header: Vec<u8>) -> Self {
        MemoryArchive {
            header,
            entries: HashMap::new(),
        }
    }

    /// Adds a sub-stream, replacing any previous entry of the same name.
    #[must_use]
    pub fn with_substream(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.entries.insert(name.into(), data);
        self
    }
}

impl ReplayArchive for MemoryArchive {
    fn header_blob(&self) -> &[u8] {
        &self.header
    }

    fn read_substream(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ReplayError::MissingSubstream {
                name: name.to_string(),
            })
    }
}

/// An archive backed by a directory of extracted sub-stream files.
///
/// The directory must contain a `replay.header` file with the container
/// header blob; each sub-stream is a file named exactly like its
/// container key (e.g. `replay.game.events`).
#[derive(Debug)]
pub struct DirArchive {
    dir: PathBuf,
    header: Vec<u8>,
}

impl DirArchive {
    /// Opens an extracted-archive directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory containing `replay.header` and sub-stream files
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::ArchiveOpen` when `path` is not a directory
    /// or the header file is missing or unreadable. No partial archive is
    /// returned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref();

        if !dir.is_dir() {
            return Err(ReplayError::ArchiveOpen {
                reason: format!("{} is not a directory", dir.display()),
            });
        }

        let header_path = dir.join(HEADER_FILE);
        let header = fs::read(&header_path).map_err(|e| ReplayError::ArchiveOpen {
            reason: format!("cannot read {}: {e}", header_path.display()),
        })?;

        Ok(DirArchive {
            dir: dir.to_path_buf(),
            header,
        })
    }

    /// Returns the directory this archive reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl ReplayArchive for DirArchive {
    fn header_blob(&self) -> &[u8] {
        &self.header
    }

    fn read_substream(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReplayError::MissingSubstream {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(ReplayError::Io(e)),
        }
    }
}
