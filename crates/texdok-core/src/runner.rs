//! Engine invocation with a single retry
//!
//! The engine runs with the input file's directory as its working
//! directory so `\input`, `\includegraphics` and friends resolve relative
//! to the document. The directory is handed to the child process; texdok's
//! own working directory is never touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::compiler::Stage;
use crate::config::CompileSettings;
use crate::diagnostics::DiagnosticFilter;
use crate::error::{CompileError, Result};
use crate::locator::Engine;
use crate::process::{CommandRunner, Invocation, ProcessOutput};

/// Attempts per pass: the first run plus one retry
pub const MAX_ATTEMPTS: u32 = 2;

/// Keeps TeX from stopping to ask the user about errors
pub const NONSTOP_FLAG: &str = "-interaction=nonstopmode";

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct CompileRun {
    /// Engine runs across all passes, retries included
    pub attempts: u32,
    /// Output of the final successful run
    pub output: ProcessOutput,
}

/// Runs an engine against an input file
pub struct CompileRunner<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
    passes: u32,
    extra_args: Vec<String>,
    filter: DiagnosticFilter,
}

impl<'a> CompileRunner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: &CompileSettings) -> Self {
        Self {
            runner,
            timeout: settings.timeout(),
            passes: settings.passes.max(1),
            extra_args: settings.extra_args.clone(),
            filter: DiagnosticFilter::from_flag(settings.filter_diagnostics),
        }
    }

    /// Build the engine command line for `input`
    ///
    /// The file is passed by name, relative to its directory, which
    /// becomes the child's working directory.
    pub fn invocation(&self, engine: &Engine, input: &Path) -> Result<Invocation> {
        let file_name = input
            .file_name()
            .ok_or_else(|| CompileError::InputNotFound(input.to_path_buf()))?;
        let working_dir = match input.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Invocation::new(&engine.program)
            .arg(NONSTOP_FLAG)
            .args(self.extra_args.iter().cloned())
            .arg(file_name.to_string_lossy())
            .current_dir(working_dir))
    }

    /// Run every pass, each with up to [`MAX_ATTEMPTS`] attempts
    pub fn run(&self, engine: &Engine, input: &Path) -> Result<CompileRun> {
        let invocation = self.invocation(engine, input)?;
        let mut attempts = 0;
        let mut last = ProcessOutput::default();

        for pass in 1..=self.passes {
            if self.passes > 1 {
                info!("Running {} (pass {}/{})", engine.name, pass, self.passes);
            }
            let (used, output) = self.run_pass(&invocation, input)?;
            attempts += used;
            last = output;
        }

        Ok(CompileRun {
            attempts,
            output: last,
        })
    }

    fn run_pass(&self, invocation: &Invocation, input: &Path) -> Result<(u32, ProcessOutput)> {
        let mut last = ProcessOutput::default();

        for attempt in 1..=MAX_ATTEMPTS {
            let stage = Stage::Compiling { attempt };
            info!(stage = %stage, "{}", invocation.command_line());

            let output = match self.runner.run(invocation, self.timeout) {
                Ok(output) => output,
                // The engine was found moments ago; treat a vanished binary
                // like any other failed attempt
                Err(e) => ProcessOutput::failure(
                    -1,
                    "",
                    format!("Failed to start {}: {}", invocation.program.display(), e),
                ),
            };

            if output.success {
                debug!("Attempt {} succeeded", attempt);
                return Ok((attempt, output));
            }

            if output.timed_out {
                warn!("Attempt {} timed out after {:?}", attempt, self.timeout);
            } else {
                warn!("Attempt {} failed (exit code {:?})", attempt, output.code);
            }
            last = output;
        }

        Err(CompileError::CompilationFailed {
            input: input.to_path_buf(),
            attempts: MAX_ATTEMPTS,
            diagnostics: self.diagnostics(&last),
        })
    }

    /// Lines surfaced for a failed run
    fn diagnostics(&self, output: &ProcessOutput) -> Vec<String> {
        let mut lines = self.filter.extract(output);
        if output.timed_out {
            lines.push(format!("Engine timed out after {:?}", self.timeout));
        }
        lines
    }
}
