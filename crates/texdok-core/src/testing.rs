//! Scripted command runner for tests
//!
//! [`ScriptedRunner`] answers invocations from per-program queues of
//! [`Step`]s and records every call, so tests can check exactly which
//! processes would have been started.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::process::{CommandRunner, Invocation, ProcessOutput};

/// One scripted response
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this output
    Respond(ProcessOutput),
    /// Write `<stem>.<ext>` for each extension into the working directory,
    /// where `<stem>` comes from the last argument, then return the output
    Produce {
        output: ProcessOutput,
        extensions: Vec<String>,
    },
    /// Fail to spawn with this error kind
    SpawnError(io::ErrorKind),
}

/// A [`CommandRunner`] driven by scripted steps
///
/// Programs with no step left behave as if they were not installed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    steps: Mutex<HashMap<PathBuf, VecDeque<Step>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a step for `program`
    pub fn on(self, program: impl Into<PathBuf>, step: Step) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(program.into())
            .or_default()
            .push_back(step);
        self
    }

    /// Queue a successful `--version` answer for `program`
    pub fn available(self, program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let banner = format!("{} 1.0", program.display());
        self.on(program, Step::Respond(ProcessOutput::success(banner)))
    }

    /// Queue a successful engine run writing `<stem>.pdf`, `.aux` and `.log`
    pub fn compiles(self, program: impl Into<PathBuf>) -> Self {
        self.on(
            program,
            Step::Produce {
                output: ProcessOutput::success("Output written on document.pdf (1 page)."),
                extensions: vec!["pdf".to_string(), "aux".to_string(), "log".to_string()],
            },
        )
    }

    /// Queue a failed engine run printing `stdout`
    pub fn fails(self, program: impl Into<PathBuf>, stdout: &str) -> Self {
        self.on(
            program,
            Step::Respond(ProcessOutput::failure(1, stdout, "")),
        )
    }

    /// Every invocation received so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of invocations received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, _timeout: Duration) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(invocation.clone());

        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&invocation.program)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Respond(output)) => Ok(output),
            Some(Step::Produce { output, extensions }) => {
                produce(invocation, &extensions)?;
                Ok(output)
            }
            Some(Step::SpawnError(kind)) => Err(io::Error::new(kind, "scripted spawn error")),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not installed", invocation.program.display()),
            )),
        }
    }
}

fn produce(invocation: &Invocation, extensions: &[String]) -> io::Result<()> {
    let dir = invocation
        .working_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let Some(stem) = invocation
        .args
        .last()
        .and_then(|arg| Path::new(arg).file_stem())
    else {
        return Ok(());
    };
    for ext in extensions {
        let path = dir.join(format!("{}.{}", stem.to_string_lossy(), ext));
        let contents: &[u8] = if ext == "pdf" { b"%PDF-1.5\n" } else { b"" };
        fs::write(path, contents)?;
    }
    Ok(())
}
