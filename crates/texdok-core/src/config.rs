//! Configuration
//!
//! Settings are loaded from `texdok.toml`. Every key is optional:
//!
//! ```toml
//! [engine]
//! candidates = ["pdflatex", "xelatex", "lualatex"]
//! search_paths = ["C:/texlive/2025/bin/windows"]
//! probe_timeout_ms = 10000
//! miktex_update = false
//!
//! [compile]
//! timeout_ms = 120000
//! passes = 1
//! extra_args = ["-shell-escape"]
//! output_extension = "pdf"
//! filter_diagnostics = false
//!
//! [cleanup]
//! enabled = true
//! extensions = ["aux", "log", "out", "toc", "nav", "snm", "fls", "fdb_latexmk"]
//!
//! [notebook]
//! converters = ["jupyter-nbconvert", "jupyter"]
//! template = "classic"
//! remove_cell_tags = ["dark-mode"]
//! timeout_ms = 120000
//! open_viewer = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engines tried when none is named explicitly, in priority order
pub const DEFAULT_ENGINES: &[&str] = &["pdflatex", "xelatex", "lualatex"];

/// Auxiliary files removed after a successful build
pub const DEFAULT_BYPRODUCT_EXTENSIONS: &[&str] =
    &["aux", "log", "out", "toc", "nav", "snm", "fls", "fdb_latexmk"];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompilerConfig {
    /// Engine discovery
    pub engine: EngineSettings,
    /// Engine invocation
    pub compile: CompileSettings,
    /// Byproduct cleanup
    pub cleanup: CleanupSettings,
    /// Notebook rendering workflow
    pub notebook: NotebookSettings,
}

impl CompilerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Engine discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Candidate executables, tried in order
    pub candidates: Vec<String>,
    /// Directories searched before PATH
    pub search_paths: Vec<PathBuf>,
    /// Upper bound for a single `--version` probe
    pub probe_timeout_ms: u64,
    /// Run `miktex-update` before compiling with a MiKTeX engine
    pub miktex_update: bool,
}

impl EngineSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_ENGINES.iter().map(|s| s.to_string()).collect(),
            search_paths: Vec::new(),
            probe_timeout_ms: crate::locator::DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            miktex_update: false,
        }
    }
}

/// Engine invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Upper bound for a single engine run
    pub timeout_ms: u64,
    /// Number of successful engine runs required (2 resolves references)
    pub passes: u32,
    /// Arguments inserted before the input file name
    pub extra_args: Vec<String>,
    /// Extension of the artifact the engine writes
    pub output_extension: String,
    /// Only surface output lines mentioning "error" or "missing"
    pub filter_diagnostics: bool,
}

impl CompileSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            passes: 1,
            extra_args: Vec::new(),
            output_extension: "pdf".to_string(),
            filter_diagnostics: false,
        }
    }
}

/// Byproduct cleanup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Remove byproducts after a successful build
    pub enabled: bool,
    /// Extensions of the files to remove (sharing the input's stem)
    pub extensions: Vec<String>,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: DEFAULT_BYPRODUCT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Notebook rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookSettings {
    /// Converter executables, tried in order
    pub converters: Vec<String>,
    /// nbconvert HTML template
    pub template: String,
    /// Cells carrying any of these tags are dropped
    pub remove_cell_tags: Vec<String>,
    /// Upper bound for the conversion
    pub timeout_ms: u64,
    /// Open the rendered HTML in the platform viewer
    pub open_viewer: bool,
}

impl NotebookSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NotebookSettings {
    fn default() -> Self {
        Self {
            converters: vec!["jupyter-nbconvert".to_string(), "jupyter".to_string()],
            template: "classic".to_string(),
            remove_cell_tags: vec!["dark-mode".to_string()],
            timeout_ms: 120_000,
            open_viewer: true,
        }
    }
}
