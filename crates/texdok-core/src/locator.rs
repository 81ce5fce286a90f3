//! Engine discovery
//!
//! Candidates are probed in priority order with `--version`; the first one
//! that exits with status zero wins. A probe that cannot start, exits
//! non-zero or runs past its time limit simply moves on to the next
//! candidate.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CompileError, Result};
use crate::process::{CommandRunner, Invocation};

/// Flag every supported engine answers with its banner
pub const VERSION_FLAG: &str = "--version";

/// Probe limit used when no configuration says otherwise
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A located, responsive executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Engine {
    /// Candidate name as configured (e.g. `pdflatex`)
    pub name: String,
    /// Resolved program path, or the bare name when only the OS can find it
    pub program: PathBuf,
    /// First line of the version banner
    pub version: Option<String>,
}

impl Engine {
    /// Whether this engine belongs to a MiKTeX installation
    pub fn is_miktex(&self) -> bool {
        self.program
            .to_string_lossy()
            .to_lowercase()
            .contains("miktex")
            || self
                .version
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains("miktex"))
    }
}

/// Result of probing one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Exited with status zero
    Available { version: Option<String> },
    /// Started but exited non-zero
    Failed { code: Option<i32> },
    /// Killed after exceeding the probe timeout
    TimedOut,
    /// Could not be started at all
    NotFound { reason: String },
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Available { .. })
    }
}

/// Probe outcome for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub candidate: String,
    pub program: PathBuf,
    pub outcome: ProbeOutcome,
}

/// Finds the first responsive engine among ordered candidates
pub struct EngineLocator<'a> {
    runner: &'a dyn CommandRunner,
    search_paths: Vec<PathBuf>,
    path_dirs: Vec<PathBuf>,
    timeout: Duration,
}

impl<'a> EngineLocator<'a> {
    /// Create a locator searching the process `PATH`
    pub fn new(runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        let path_dirs = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();
        Self {
            runner,
            search_paths: Vec::new(),
            path_dirs,
            timeout,
        }
    }

    /// Directories searched before `PATH`
    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    /// Replace the `PATH` directories (used by tests)
    pub fn with_path_dirs(mut self, path_dirs: Vec<PathBuf>) -> Self {
        self.path_dirs = path_dirs;
        self
    }

    /// Resolve a candidate to the program that will be probed
    ///
    /// Names containing a directory are taken relative to the current
    /// directory. Bare names are looked up in the search paths, then in
    /// `PATH`; if neither has it, the bare name is returned so the OS
    /// lookup still gets a chance. Any path returned is absolute.
    pub fn resolve(&self, candidate: &str) -> PathBuf {
        let as_path = Path::new(candidate);
        if as_path.is_absolute() || as_path.components().count() > 1 {
            return absolute(as_path.to_path_buf());
        }

        let file_name = executable_name(candidate);
        self.search_paths
            .iter()
            .chain(&self.path_dirs)
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
            .map(absolute)
            .unwrap_or_else(|| PathBuf::from(candidate))
    }

    /// Probe a single candidate
    pub fn probe(&self, candidate: &str) -> ProbeReport {
        let program = self.resolve(candidate);
        let invocation = Invocation::new(&program).arg(VERSION_FLAG);

        let outcome = match self.runner.run(&invocation, self.timeout) {
            Ok(output) if output.timed_out => ProbeOutcome::TimedOut,
            Ok(output) if output.success => ProbeOutcome::Available {
                version: output.first_line().map(str::to_string),
            },
            Ok(output) => ProbeOutcome::Failed { code: output.code },
            Err(e) => ProbeOutcome::NotFound {
                reason: e.to_string(),
            },
        };

        debug!("Probe {} ({}): {:?}", candidate, program.display(), outcome);
        ProbeReport {
            candidate: candidate.to_string(),
            program,
            outcome,
        }
    }

    /// Return the first candidate whose probe succeeds
    pub fn locate(&self, candidates: &[String]) -> Result<Engine> {
        for candidate in candidates {
            let report = self.probe(candidate);
            if let ProbeOutcome::Available { version } = report.outcome {
                info!("Using engine {} ({})", candidate, report.program.display());
                return Ok(Engine {
                    name: report.candidate,
                    program: report.program,
                    version,
                });
            }
        }

        Err(CompileError::EngineNotFound {
            tried: candidates.to_vec(),
        })
    }

    /// Probe every candidate, for reporting
    pub fn probe_all(&self, candidates: &[String]) -> Vec<ProbeReport> {
        candidates.iter().map(|c| self.probe(c)).collect()
    }
}

/// Anchor a relative path at the current directory
fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

/// Append the platform executable suffix unless already present
fn executable_name(candidate: &str) -> OsString {
    let suffix = env::consts::EXE_SUFFIX;
    if suffix.is_empty() || candidate.to_lowercase().ends_with(suffix) {
        OsString::from(candidate)
    } else {
        OsString::from(format!("{candidate}{suffix}"))
    }
}
