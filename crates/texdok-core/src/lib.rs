//! texdok-core - PDFs from the LaTeX toolchain you already have
//!
//! This crate drives an external LaTeX engine (pdflatex, xelatex, lualatex)
//! to turn a `.tex` file into a PDF. The typesetting itself is delegated to
//! the engine; texdok finds it, runs it, and tidies up after it.
//!
//! # Architecture
//!
//! A compile request flows through three stages:
//!
//! 1. **EngineLocator** - probes an ordered list of candidate executables
//!    and picks the first one that answers `--version`
//! 2. **CompileRunner** - runs the engine in the input's directory, retrying
//!    a failed attempt once
//! 3. **ArtifactPublisher** - checks the PDF exists, moves it to the
//!    requested location and removes auxiliary files
//!
//! [`DocumentCompiler`] ties the stages together. All external processes go
//! through the [`CommandRunner`] trait.
//!
//! # Example
//!
//! ```no_run
//! use texdok_core::{CompileRequest, CompilerConfig, DocumentCompiler};
//!
//! let compiler = DocumentCompiler::new(CompilerConfig::default());
//! let request = CompileRequest::new("report.tex").with_output("out/final.pdf");
//!
//! let report = compiler.compile(&request)?;
//! println!("Wrote {}", report.artifact.display());
//! # Ok::<(), texdok_core::CompileError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod maintenance;
pub mod process;
pub mod publisher;
pub mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use compiler::{CompileReport, CompileRequest, CompileResult, DocumentCompiler, Stage};
pub use config::{
    CleanupSettings, CompileSettings, CompilerConfig, EngineSettings, NotebookSettings,
};
pub use diagnostics::DiagnosticFilter;
pub use error::{CompileError, Result};
pub use locator::{Engine, EngineLocator, ProbeOutcome, ProbeReport};
pub use process::{CommandRunner, Invocation, ProcessOutput, SystemRunner};
pub use publisher::{ArtifactPublisher, Publication};
pub use runner::{CompileRun, CompileRunner, MAX_ATTEMPTS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
