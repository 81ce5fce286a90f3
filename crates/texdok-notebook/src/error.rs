//! Error types for notebook rendering

use std::path::PathBuf;

use thiserror::Error;

/// Result type for notebook operations
pub type Result<T> = std::result::Result<T, NotebookError>;

/// Errors that can occur while rendering a notebook
#[derive(Error, Debug)]
pub enum NotebookError {
    /// The notebook file does not exist
    #[error("Notebook file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file is not a notebook document
    #[error("Invalid notebook {}: {reason}", path.display())]
    InvalidNotebook {
        path: PathBuf,
        #[source]
        reason: FormatError,
    },

    /// The requested output path does not name a file
    #[error("Output path has no file name: {}", .0.display())]
    InvalidOutput(PathBuf),

    /// No converter answered the version probe
    #[error("No notebook converter found (tried: {})", tried.join(", "))]
    ConverterNotFound { tried: Vec<String> },

    /// The converter ran but failed
    #[error("Notebook conversion failed")]
    ConversionFailed { diagnostics: Vec<String> },

    /// The converter reported success without writing the HTML
    #[error("Converter reported success but {} was not produced", expected.display())]
    OutputMissing { expected: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a document is not a usable notebook
#[derive(Error, Debug)]
pub enum FormatError {
    /// Not JSON, or JSON of the wrong shape
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Neither `cells` nor `worksheets` present
    #[error("no cells found")]
    NoCells,
}

impl NotebookError {
    /// Captured converter output attached to the error, if any
    pub fn diagnostics(&self) -> &[String] {
        match self {
            NotebookError::ConversionFailed { diagnostics } => diagnostics,
            _ => &[],
        }
    }

    /// Suggestion for the user, if there is a useful one
    pub fn help(&self) -> Option<&'static str> {
        match self {
            NotebookError::ConverterNotFound { .. } => {
                Some("Install nbconvert: pip install nbconvert")
            }
            _ => None,
        }
    }
}
