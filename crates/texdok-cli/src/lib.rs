//! texdok CLI - Command-line interface library
//!
//! This library provides the CLI functionality for texdok:
//! - Compile: LaTeX source to PDF with an installed engine
//! - Notebook: Jupyter notebook to HTML through nbconvert
//! - Engines: report which candidate engines respond
//!
//! # Library Usage
//!
//! ```ignore
//! use texdok_cli::{compile_command, CompileOptions, OutputFormat};
//!
//! compile_command(&CompileOptions::new("report.tex"))?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Compile next to the source
//! texdok compile report.tex
//!
//! # Explicit output and engine
//! texdok compile report.tex out/final.pdf xelatex
//!
//! # Machine-readable result
//! texdok compile report.tex --format json
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{compile_command, engines_command, notebook_command};
pub use app::{run_cli, CompileOptions, OutputFormat};
