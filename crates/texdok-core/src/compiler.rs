//! Compile request orchestration
//!
//! ```text
//! Idle → Locating → Compiling(1) → [Compiling(2)] → Publishing → Done
//!   └────────┴────────────┴──────────────┴─────────────┴──→ Failed
//! ```
//!
//! Every stage can fail; `Done` and `Failed` are terminal. A request is
//! consumed once and leaves nothing behind except the published artifact.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::CompilerConfig;
use crate::diagnostics::DiagnosticFilter;
use crate::error::{CompileError, Result};
use crate::locator::{Engine, EngineLocator};
use crate::maintenance;
use crate::process::{CommandRunner, SystemRunner};
use crate::publisher::ArtifactPublisher;
use crate::runner::CompileRunner;

/// Lifecycle stage of a compile request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Locating,
    Compiling { attempt: u32 },
    Publishing,
    Done,
    Failed,
}

impl Stage {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Locating => write!(f, "locating"),
            Stage::Compiling { attempt } => write!(f, "compiling (attempt {attempt})"),
            Stage::Publishing => write!(f, "publishing"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// A request to turn one input file into an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Source document
    pub input: PathBuf,
    /// Where to put the artifact (default: next to the input)
    pub output: Option<PathBuf>,
    /// Engine to use instead of the configured candidates
    pub engine: Option<String>,
}

impl CompileRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            engine: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Check the input exists, is a file and can be opened
    pub fn validate(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(CompileError::InputNotFound(self.input.clone()));
        }
        File::open(&self.input)
            .map(drop)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => CompileError::InputNotFound(self.input.clone()),
                _ => CompileError::InputUnreadable {
                    path: self.input.clone(),
                    source,
                },
            })
    }
}

/// What a successful request produced
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// Engine that did the work
    pub engine: Engine,
    /// Final artifact location
    pub artifact: PathBuf,
    /// Engine runs, retries included
    pub attempts: u32,
    /// Output lines of the last run mentioning "error" or "missing"
    pub diagnostics: Vec<String>,
    /// Byproduct files removed after the build
    pub removed_byproducts: Vec<PathBuf>,
}

/// Serializable outcome of a request, successful or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    pub success: bool,
    pub produced_artifact_path: Option<PathBuf>,
    pub diagnostic_lines: Vec<String>,
    pub engine: Option<String>,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompileResult {
    /// Summarize the outcome of [`DocumentCompiler::compile`]
    pub fn from_outcome(outcome: &Result<CompileReport>) -> Self {
        match outcome {
            Ok(report) => Self {
                success: true,
                produced_artifact_path: Some(report.artifact.clone()),
                diagnostic_lines: report.diagnostics.clone(),
                engine: Some(report.engine.name.clone()),
                stage: Stage::Done,
                error: None,
            },
            Err(err) => Self {
                success: false,
                produced_artifact_path: None,
                diagnostic_lines: err.diagnostics().to_vec(),
                engine: None,
                stage: err.stage(),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Locates an engine, runs it and publishes the result
pub struct DocumentCompiler {
    runner: Box<dyn CommandRunner>,
    config: CompilerConfig,
    path_dirs: Option<Vec<PathBuf>>,
}

impl DocumentCompiler {
    /// Create a compiler that runs real processes
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_runner(config, Box::new(SystemRunner::new()))
    }

    /// Create a compiler with a custom command runner
    pub fn with_runner(config: CompilerConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            config,
            path_dirs: None,
        }
    }

    /// Search these directories instead of the process `PATH`
    pub fn with_path_dirs(mut self, path_dirs: Vec<PathBuf>) -> Self {
        self.path_dirs = Some(path_dirs);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Engine locator configured from `[engine]`
    pub fn locator(&self) -> EngineLocator<'_> {
        let locator = EngineLocator::new(self.runner.as_ref(), self.config.engine.probe_timeout())
            .with_search_paths(self.config.engine.search_paths.clone());
        match &self.path_dirs {
            Some(dirs) => locator.with_path_dirs(dirs.clone()),
            None => locator,
        }
    }

    fn publisher(&self) -> ArtifactPublisher {
        ArtifactPublisher::new(
            self.config.compile.output_extension.clone(),
            self.config.cleanup.clone(),
        )
    }

    /// Run one request through every stage
    pub fn compile(&self, request: &CompileRequest) -> Result<CompileReport> {
        let outcome = self.run_stages(request);
        match &outcome {
            Ok(_) => info!(stage = %Stage::Done, "Compiled {}", request.input.display()),
            Err(e) => info!(stage = %Stage::Failed, "{} failed: {}", e.stage(), e),
        }
        outcome
    }

    fn run_stages(&self, request: &CompileRequest) -> Result<CompileReport> {
        info!(stage = %Stage::Idle, "Request for {}", request.input.display());
        request.validate()?;

        info!(stage = %Stage::Locating, "Looking for an engine");
        let candidates = match &request.engine {
            Some(engine) => vec![engine.clone()],
            None => self.config.engine.candidates.clone(),
        };
        let engine = self.locator().locate(&candidates)?;

        if self.config.engine.miktex_update && engine.is_miktex() {
            maintenance::update_miktex(self.runner.as_ref(), &engine);
        }

        let run = CompileRunner::new(self.runner.as_ref(), &self.config.compile)
            .run(&engine, &request.input)?;

        info!(stage = %Stage::Publishing, "Publishing artifact");
        let publication = self
            .publisher()
            .publish(&request.input, request.output.as_deref())?;

        Ok(CompileReport {
            engine,
            artifact: publication.artifact,
            attempts: run.attempts,
            diagnostics: DiagnosticFilter::Keywords.matching_lines(&run.output),
            removed_byproducts: publication.removed,
        })
    }

    /// Default artifact location for `input`
    pub fn default_artifact_path(&self, input: &Path) -> PathBuf {
        self.publisher().default_artifact_path(input)
    }
}
