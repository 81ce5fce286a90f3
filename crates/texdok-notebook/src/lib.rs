//! texdok-notebook - Jupyter notebooks to HTML
//!
//! Sibling workflow to LaTeX compilation: a notebook is checked, handed to
//! the first available nbconvert front end (`jupyter-nbconvert`, then
//! `jupyter nbconvert`) and the resulting HTML is optionally opened in the
//! platform viewer. Cells tagged `dark-mode` are dropped by default.
//!
//! ```no_run
//! use texdok_core::NotebookSettings;
//! use texdok_notebook::{NotebookRenderer, NotebookRequest};
//!
//! let renderer = NotebookRenderer::new(NotebookSettings::default());
//! let rendering = renderer.render(&NotebookRequest::new("analysis.ipynb"))?;
//! println!("Wrote {}", rendering.html.display());
//! # Ok::<(), texdok_notebook::NotebookError>(())
//! ```

pub mod error;
pub mod notebook;
pub mod renderer;
pub mod viewer;

pub use error::{FormatError, NotebookError, Result};
pub use notebook::{inspect, NotebookSummary};
pub use renderer::{NotebookRenderer, NotebookRequest, Rendering};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
