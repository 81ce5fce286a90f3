//! Error types for compile requests

use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::Stage;

/// Result type for compile operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that end a compile request
///
/// Every variant is terminal. The only retry texdok performs is the single
/// built-in repeat of a failed engine run, which happens before
/// [`CompileError::CompilationFailed`] is raised.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The input file does not exist (or is not a regular file)
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input file exists but cannot be opened
    #[error("Input file not readable: {}: {source}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate engines answered the version probe
    #[error("No LaTeX engine found (tried: {})", tried.join(", "))]
    EngineNotFound { tried: Vec<String> },

    /// The engine failed on every attempt
    #[error(
        "Compilation of {} failed after {attempts} attempt(s)",
        input.display()
    )]
    CompilationFailed {
        input: PathBuf,
        attempts: u32,
        diagnostics: Vec<String>,
    },

    /// The engine reported success but left no artifact behind
    #[error("Engine reported success but {} was not produced", expected.display())]
    ArtifactMissing { expected: PathBuf },

    /// The artifact could not be moved to the requested location
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    PublishFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// The stage the request was in when it failed
    pub fn stage(&self) -> Stage {
        match self {
            CompileError::InputNotFound(_) | CompileError::InputUnreadable { .. } => Stage::Idle,
            CompileError::EngineNotFound { .. } => Stage::Locating,
            CompileError::CompilationFailed { attempts, .. } => Stage::Compiling {
                attempt: *attempts,
            },
            CompileError::ArtifactMissing { .. } | CompileError::PublishFailed { .. } => {
                Stage::Publishing
            }
        }
    }

    /// Captured engine output attached to the error, if any
    pub fn diagnostics(&self) -> &[String] {
        match self {
            CompileError::CompilationFailed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Suggestion for the user, if there is a useful one
    pub fn help(&self) -> Option<&'static str> {
        match self {
            CompileError::EngineNotFound { .. } => Some(
                "Install a TeX distribution and make sure its bin directory is on PATH \
                 (or listed under [engine] search_paths):\n  \
                 - MiKTeX: https://miktex.org/download\n  \
                 - TeX Live: https://tug.org/texlive/",
            ),
            CompileError::CompilationFailed { .. } => Some(
                "Check the engine output above. Missing packages can usually be installed \
                 with your distribution's package manager.",
            ),
            CompileError::ArtifactMissing { .. } => Some(
                "The engine exited successfully without writing a PDF; check the .log file.",
            ),
            _ => None,
        }
    }
}
