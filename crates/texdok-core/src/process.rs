//! External process execution
//!
//! Every external tool texdok talks to (engine probes, engine runs,
//! maintenance commands, notebook converters) is started through a
//! [`CommandRunner`]. [`SystemRunner`] is the real implementation; tests
//! substitute a scripted one.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// A command line to run, with an optional working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (bare name or path)
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory for the child; the parent's is never changed
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Create an invocation with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the child's working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command line as a single string, for logs and messages
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// What a finished (or killed) process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when killed by a signal or on timeout
    pub code: Option<i32>,
    /// Whether the process exited with status zero
    pub success: bool,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
    /// The process was killed because it exceeded its time limit
    pub timed_out: bool,
}

impl ProcessOutput {
    /// A zero exit status with the given standard output
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A non-zero exit status with the given output
    pub fn failure(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// A process killed after exceeding its time limit
    pub fn timeout(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: None,
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: true,
        }
    }

    /// First non-empty line of standard output
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// Runs external commands
///
/// Failing to start the program (for example because it does not exist)
/// is reported as `Err`; everything after a successful spawn, including a
/// non-zero exit or a timeout, is reported through [`ProcessOutput`].
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion, killing it after `timeout`
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput> {
        (**self).run(invocation, timeout)
    }
}

/// Runs commands as real child processes
///
/// Standard input is closed, so a program waiting for an answer on its
/// terminal sees end-of-file instead of blocking.
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRunner {
    /// Create a runner with the default 10ms exit polling interval
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Set how often a running child is checked for exit
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> io::Result<ProcessOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        debug!("Spawning: {}", invocation.command_line());
        let mut child = command.spawn()?;

        // Drain both pipes while waiting so a chatty child cannot fill one
        // and stall
        let stdout = PipeCollector::spawn(child.stdout.take());
        let stderr = PipeCollector::spawn(child.stderr.take());

        match wait_with_deadline(&mut child, timeout, self.poll_interval)? {
            Some(status) => Ok(ProcessOutput {
                code: status.code(),
                success: status.success(),
                stdout: stdout.finish(),
                stderr: stderr.finish(),
                timed_out: false,
            }),
            None => {
                warn!(
                    "{} did not finish within {:?}, killed",
                    invocation.program.display(),
                    timeout
                );
                // Grandchildren may still hold the pipes open; take what
                // has arrived instead of waiting for end-of-file
                Ok(ProcessOutput::timeout(stdout.snapshot(), stderr.snapshot()))
            }
        }
    }
}

/// Wait for `child` to exit, killing it once `timeout` has elapsed
///
/// Returns `None` when the child had to be killed.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    poll_interval: Duration,
) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            // The child may exit between try_wait and kill
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(poll_interval.min(deadline - now));
    }
}

/// Reads a child's pipe on a helper thread
struct PipeCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl PipeCollector {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let handle = pipe.map(|mut reader| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => buffer
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            })
        });
        Self { buffer, handle }
    }

    /// Wait for end-of-file and return everything read
    fn finish(mut self) -> String {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.snapshot()
    }

    /// Return what has been read so far without waiting
    fn snapshot(self) -> String {
        let bytes = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let text = String::from_utf8_lossy(&bytes).into_owned();
        text
    }
}
