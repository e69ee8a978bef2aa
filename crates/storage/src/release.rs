// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk release store.
//!
//! Layout per app:
//!
//! ```text
//! <apps_root>/<app>/releases/<epoch-secs>/   immutable release directories
//! <apps_root>/<app>/current                  symlink onto exactly one release
//! ```
//!
//! Promotion renames a staged directory into `releases/` and then flips
//! `current` by creating a temp-named symlink and renaming it over the old
//! one, which is atomic on POSIX filesystems.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("failed to promote staged release to {0}: {1}")]
    Promote(PathBuf, std::io::Error),

    #[error("failed to update current symlink for {app}: {source}")]
    Flip {
        app: String,
        source: std::io::Error,
    },

    #[error("failed to read releases for {0}: {1}")]
    List(String, std::io::Error),

    #[error("no releases exist for {0}")]
    NoReleases(String),
}

/// One immutable, timestamped release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub app_name: String,
    pub timestamp: u64,
    pub path: PathBuf,
}

/// Directory store for per-app releases and the live `current` pointer.
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    apps_root: PathBuf,
}

impl ReleaseStore {
    pub fn new(apps_root: impl Into<PathBuf>) -> Self {
        Self {
            apps_root: apps_root.into(),
        }
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.apps_root.join(app)
    }

    pub fn releases_dir(&self, app: &str) -> PathBuf {
        self.app_dir(app).join("releases")
    }

    pub fn current_link(&self, app: &str) -> PathBuf {
        self.app_dir(app).join("current")
    }

    /// A fresh staging directory beneath the app dir, on the same
    /// filesystem as `releases/` so promotion is a rename.
    pub fn create_staging_dir(&self, app: &str, timestamp: u64) -> Result<PathBuf, StoreError> {
        let staging = self.app_dir(app).join(format!(".staging-{timestamp}"));
        std::fs::create_dir_all(&staging).map_err(|e| StoreError::CreateDir(staging.clone(), e))?;
        Ok(staging)
    }

    /// Promote a staged directory to `releases/<ts>` and flip `current`.
    ///
    /// When a release directory for the timestamp already exists the
    /// timestamp is bumped until a free slot is found, keeping the
    /// monotonic ordering of release names.
    pub fn promote(&self, app: &str, staged: &Path, timestamp: u64) -> Result<Release, StoreError> {
        let releases = self.releases_dir(app);
        std::fs::create_dir_all(&releases)
            .map_err(|e| StoreError::CreateDir(releases.clone(), e))?;

        let mut ts = timestamp;
        let mut release_path = releases.join(ts.to_string());
        while release_path.exists() {
            ts += 1;
            release_path = releases.join(ts.to_string());
        }

        std::fs::rename(staged, &release_path)
            .map_err(|e| StoreError::Promote(release_path.clone(), e))?;

        self.flip_current(app, &release_path)?;

        info!(app, timestamp = ts, path = %release_path.display(), "release promoted");
        Ok(Release {
            app_name: app.to_string(),
            timestamp: ts,
            path: release_path,
        })
    }

    /// Point `current` at `release_path` via temp symlink + rename.
    fn flip_current(&self, app: &str, release_path: &Path) -> Result<(), StoreError> {
        let link = self.current_link(app);
        let tmp = self.app_dir(app).join(format!(
            ".current-tmp-{}",
            release_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        // A stale temp link from an interrupted flip is replaced.
        if tmp.symlink_metadata().is_ok() {
            std::fs::remove_file(&tmp).map_err(|e| StoreError::Flip {
                app: app.to_string(),
                source: e,
            })?;
        }

        std::os::unix::fs::symlink(release_path, &tmp).map_err(|e| StoreError::Flip {
            app: app.to_string(),
            source: e,
        })?;
        std::fs::rename(&tmp, &link).map_err(|e| StoreError::Flip {
            app: app.to_string(),
            source: e,
        })
    }

    /// Resolve the live release directory, if any.
    pub fn current(&self, app: &str) -> Option<PathBuf> {
        std::fs::read_link(self.current_link(app)).ok()
    }

    /// Release timestamps for an app, ascending. Non-numeric entries
    /// (staging leftovers would never be here, but operators happen) are
    /// ignored.
    pub fn list_releases(&self, app: &str) -> Result<Vec<u64>, StoreError> {
        let releases = self.releases_dir(app);
        if !releases.exists() {
            return Ok(Vec::new());
        }
        let entries =
            std::fs::read_dir(&releases).map_err(|e| StoreError::List(app.to_string(), e))?;

        let mut timestamps: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_string_lossy().parse().ok())
            .collect();
        timestamps.sort_unstable();
        Ok(timestamps)
    }

    /// Repoint a missing `current` at the newest release.
    ///
    /// Returns the repaired target, or `None` when `current` was intact.
    pub fn repair_current(&self, app: &str) -> Result<Option<PathBuf>, StoreError> {
        if self.current(app).is_some() {
            return Ok(None);
        }
        let latest = self
            .list_releases(app)?
            .pop()
            .ok_or_else(|| StoreError::NoReleases(app.to_string()))?;
        let release_path = self.releases_dir(app).join(latest.to_string());
        warn!(app, timestamp = latest, "current symlink missing, repairing to newest release");
        self.flip_current(app, &release_path)?;
        Ok(Some(release_path))
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
