//! Artifact publishing and byproduct cleanup
//!
//! The engine writes `<stem>.pdf` next to the input. Publishing checks that
//! the file is really there, moves it if another location was requested,
//! and removes the auxiliary files the engine left behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::CleanupSettings;
use crate::error::{CompileError, Result};

/// Where the artifact ended up and what was cleaned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Final artifact location
    pub artifact: PathBuf,
    /// Whether the artifact was moved from its default location
    pub moved: bool,
    /// Byproduct files that were removed
    pub removed: Vec<PathBuf>,
}

/// Verifies, relocates and tidies up after a successful build
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    output_extension: String,
    cleanup: CleanupSettings,
}

impl ArtifactPublisher {
    pub fn new(output_extension: impl Into<String>, cleanup: CleanupSettings) -> Self {
        Self {
            output_extension: output_extension.into(),
            cleanup,
        }
    }

    /// Where the engine writes the artifact for `input`
    pub fn default_artifact_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.output_extension)
    }

    /// Publish the artifact for `input`, optionally moving it to `requested`
    pub fn publish(&self, input: &Path, requested: Option<&Path>) -> Result<Publication> {
        let produced = self.default_artifact_path(input);
        if !produced.is_file() {
            return Err(CompileError::ArtifactMissing { expected: produced });
        }

        let (artifact, moved) = match requested {
            Some(target) => self.relocate(&produced, target)?,
            None => (produced, false),
        };

        let removed = if self.cleanup.enabled {
            self.remove_byproducts(input)
        } else {
            Vec::new()
        };

        info!("Published {}", artifact.display());
        Ok(Publication {
            artifact,
            moved,
            removed,
        })
    }

    /// Move `produced` to `target` unless they are the same file
    fn relocate(&self, produced: &Path, target: &Path) -> Result<(PathBuf, bool)> {
        let target = match produced.file_name() {
            Some(name) if target.is_dir() => target.join(name),
            _ => target.to_path_buf(),
        };

        if same_location(produced, &target) {
            return Ok((produced.to_path_buf(), false));
        }

        let publish_failed = |source: io::Error| CompileError::PublishFailed {
            from: produced.to_path_buf(),
            to: target.clone(),
            source,
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(publish_failed)?;
        }
        // A rename never copies; moving across filesystems fails here
        fs::rename(produced, &target).map_err(publish_failed)?;

        debug!("Moved {} to {}", produced.display(), target.display());
        Ok((target, true))
    }

    /// Remove `<stem>.<ext>` for every configured extension
    ///
    /// Best-effort: missing files are skipped silently and other failures
    /// are logged. The input file itself is never removed.
    pub fn remove_byproducts(&self, input: &Path) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        for ext in &self.cleanup.extensions {
            let path = input.with_extension(ext);
            if path == input {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        removed
    }
}

/// Whether two paths name the same file location (the target need not exist)
fn same_location(a: &Path, b: &Path) -> bool {
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn normalize(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(file_name))
}
