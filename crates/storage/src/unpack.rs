// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safe extraction of gzipped tar artifacts.
//!
//! Every entry is re-rooted below the destination: entries whose paths
//! would resolve outside it (absolute paths, `..` traversal) are skipped,
//! as are symlinks and device nodes.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use thiserror::Error;
use tracing::warn;

/// Unpack errors
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("failed to open archive {0}: {1}")]
    Open(PathBuf, std::io::Error),

    #[error("failed to read archive entry: {0}")]
    Entry(std::io::Error),

    #[error("failed to extract to {0}: {1}")]
    Extract(PathBuf, std::io::Error),
}

/// What an extraction did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Entries written below the destination
    pub extracted: usize,
    /// Entries refused (traversal, symlinks, devices)
    pub skipped: usize,
}

/// Extract a gzipped tar archive into `dest`.
///
/// Directories are created with mode 0755; regular files keep the mode
/// declared in the archive. The destination is created if absent.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<UnpackSummary, UnpackError> {
    let file = File::open(archive_path)
        .map_err(|e| UnpackError::Open(archive_path.to_path_buf(), e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);

    std::fs::create_dir_all(dest).map_err(|e| UnpackError::Extract(dest.to_path_buf(), e))?;

    let mut summary = UnpackSummary::default();
    for entry in archive.entries().map_err(UnpackError::Entry)? {
        let mut entry = entry.map_err(UnpackError::Entry)?;
        let raw_path = entry.path().map_err(UnpackError::Entry)?.into_owned();

        let Some(rel) = contained_path(&raw_path) else {
            warn!(entry = %raw_path.display(), "skipping archive entry escaping destination");
            summary.skipped += 1;
            continue;
        };
        let target = dest.join(&rel);

        match entry.header().entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&target)
                    .map_err(|e| UnpackError::Extract(target.clone(), e))?;
                set_mode(&target, 0o755).map_err(|e| UnpackError::Extract(target.clone(), e))?;
                summary.extracted += 1;
            }
            EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| UnpackError::Extract(parent.to_path_buf(), e))?;
                }
                entry
                    .unpack(&target)
                    .map_err(|e| UnpackError::Extract(target.clone(), e))?;
                summary.extracted += 1;
            }
            other => {
                // Symlinks, hard links, devices and fifos are refused.
                warn!(
                    entry = %raw_path.display(),
                    kind = ?other,
                    "skipping unsupported archive entry type"
                );
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Reduce an archive entry path to a destination-relative path, or `None`
/// when the entry cannot be safely contained.
fn contained_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            // Absolute roots and parent traversal escape the destination.
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(test)]
#[path = "unpack_tests.rs"]
mod tests;
