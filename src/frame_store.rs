//! Numbered frame files in a scratch directory.
//!
//! The [`FrameStore`] keeps two kinds of frame side by side: decoded
//! [`FrameKind::Still`] JPEGs and single-frame [`FrameKind::Intermediate`]
//! GIF units. Each frame is addressed by `(kind, index)`; the file name is
//! the index zero-padded to five digits plus the kind's extension.
//!
//! Ordering downstream depends on the numeric index alone. Enumeration
//! therefore parses every file stem and sorts numerically, so `10.jpg` sorts
//! after `9.jpg` and `100000.jpg` after `99999.jpg` even though their names
//! do not sort that way lexically.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GifmakerError;

/// Width of the zero-padded index in frame file names.
pub const INDEX_WIDTH: usize = 5;

/// Category of a frame in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// A decoded raster frame (JPEG).
    Still,
    /// A per-frame encoded unit consumed by assembly (single-frame GIF).
    Intermediate,
}

impl FrameKind {
    /// Both kinds.
    pub const ALL: [FrameKind; 2] = [FrameKind::Still, FrameKind::Intermediate];

    /// File extension used for this kind, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FrameKind::Still => "jpg",
            FrameKind::Intermediate => "gif",
        }
    }

    /// Human-readable label used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Still => "still",
            FrameKind::Intermediate => "intermediate",
        }
    }
}

/// Location of frame `index` of `kind` under `root`.
///
/// ```
/// use std::path::Path;
///
/// use gifmaker::{FrameKind, frame_path};
///
/// let path = frame_path(Path::new("frames"), FrameKind::Still, 7);
/// assert_eq!(path, Path::new("frames/00007.jpg"));
/// ```
pub fn frame_path(root: &Path, kind: FrameKind, index: u64) -> PathBuf {
    root.join(format!(
        "{index:0width$}.{ext}",
        width = INDEX_WIDTH,
        ext = kind.extension()
    ))
}

/// Parse the index out of a frame file name, if it belongs to `kind`.
fn parse_index(path: &Path, kind: FrameKind) -> Option<u64> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(kind.extension()) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Ordered, numbered frames in a scratch directory.
///
/// The store owns no state beyond its root path; every query goes to the
/// filesystem, so the sequence seen after a mutation is always current.
#[derive(Debug, Clone)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`GifmakerError::Scratch`] if the directory cannot be created.
    pub fn open<P: Into<PathBuf>>(root: P) -> Result<Self, GifmakerError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|error| GifmakerError::scratch(&root, error))?;
        log::debug!("Opened frame store at {}", root.display());
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of frame `index` of `kind`.
    pub fn path(&self, kind: FrameKind, index: u64) -> PathBuf {
        frame_path(&self.root, kind, index)
    }

    /// All indices of `kind`, in ascending numeric order.
    ///
    /// # Errors
    ///
    /// [`GifmakerError::Scratch`] if the directory cannot be listed.
    pub fn enumerate(&self, kind: FrameKind) -> Result<Vec<u64>, GifmakerError> {
        let entries =
            fs::read_dir(&self.root).map_err(|error| GifmakerError::scratch(&self.root, error))?;

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| GifmakerError::scratch(&self.root, error))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match parse_index(&path, kind) {
                Some(index) => indices.push(index),
                None => log::trace!("Ignoring {} while listing {} frames", path.display(), kind.label()),
            }
        }

        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Number of frames of `kind`.
    pub fn count(&self, kind: FrameKind) -> Result<usize, GifmakerError> {
        Ok(self.enumerate(kind)?.len())
    }

    /// Returns `true` when the store holds neither stills nor intermediates.
    pub fn is_empty(&self) -> Result<bool, GifmakerError> {
        for kind in FrameKind::ALL {
            if self.count(kind)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Store `content` as frame `index` of `kind`, replacing any existing
    /// frame there.
    pub fn write(&self, kind: FrameKind, index: u64, content: &[u8]) -> Result<(), GifmakerError> {
        let path = self.path(kind, index);
        fs::write(&path, content).map_err(|error| GifmakerError::scratch(&path, error))
    }

    /// Read the content of frame `index` of `kind`.
    pub fn read(&self, kind: FrameKind, index: u64) -> Result<Vec<u8>, GifmakerError> {
        let path = self.locate(kind, index)?;
        fs::read(&path).map_err(|error| GifmakerError::scratch(&path, error))
    }

    /// Copy frame `from` to slot `to` within the same kind.
    pub fn copy(&self, kind: FrameKind, from: u64, to: u64) -> Result<(), GifmakerError> {
        let source = self.locate(kind, from)?;
        let target = self.path(kind, to);
        fs::copy(&source, &target).map_err(|error| GifmakerError::scratch(&target, error))?;
        Ok(())
    }

    /// Remove frame `index` of `kind`.
    pub fn delete(&self, kind: FrameKind, index: u64) -> Result<(), GifmakerError> {
        let path = self.locate(kind, index)?;
        fs::remove_file(&path).map_err(|error| GifmakerError::scratch(&path, error))
    }

    /// Remove every frame of the given kinds. Returns how many files went.
    pub fn delete_all(&self, kinds: &[FrameKind]) -> Result<usize, GifmakerError> {
        let entries =
            fs::read_dir(&self.root).map_err(|error| GifmakerError::scratch(&self.root, error))?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|error| GifmakerError::scratch(&self.root, error))?;
            let path = entry.path();
            if !path.is_file() || !kinds.iter().any(|&kind| parse_index(&path, kind).is_some()) {
                continue;
            }
            fs::remove_file(&path).map_err(|error| GifmakerError::scratch(&path, error))?;
            removed += 1;
        }
        if removed > 0 {
            log::debug!("Removed {removed} frame(s) from {}", self.root.display());
        }
        Ok(removed)
    }

    /// Remove all stills and intermediates, leaving the directory in place.
    pub fn clean(&self) -> Result<usize, GifmakerError> {
        self.delete_all(&FrameKind::ALL)
    }

    /// Resolve the on-disk file for an existing frame.
    ///
    /// Frames written by this store use the padded name, but decoders and
    /// older runs may have produced unpadded or wider names for the same
    /// index, so fall back to a directory scan.
    fn locate(&self, kind: FrameKind, index: u64) -> Result<PathBuf, GifmakerError> {
        let padded = self.path(kind, index);
        if padded.is_file() {
            return Ok(padded);
        }
        let entries =
            fs::read_dir(&self.root).map_err(|error| GifmakerError::scratch(&self.root, error))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && parse_index(&path, kind) == Some(index) {
                return Ok(path);
            }
        }
        Err(GifmakerError::scratch(
            padded,
            std::io::Error::new(std::io::ErrorKind::NotFound, "frame does not exist"),
        ))
    }
}
