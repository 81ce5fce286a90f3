//! Notebook inspection
//!
//! texdok does not render notebooks itself; it only reads enough of the
//! document to reject files that are not notebooks before handing them to
//! the converter, and to report what the conversion will drop.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FormatError, NotebookError, Result};

/// Oldest notebook format nbconvert renders without upgrading it first
pub const CURRENT_NBFORMAT: u32 = 4;

/// What a notebook contains, as far as texdok cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookSummary {
    /// Declared major format version
    pub nbformat: Option<u32>,
    /// Number of cells
    pub cells: usize,
    /// Cells carrying a tag that will be removed
    pub removed_cells: usize,
    /// Kernel display name, if recorded
    pub kernel: Option<String>,
}

impl NotebookSummary {
    /// Whether the notebook predates the current format
    pub fn is_legacy(&self) -> bool {
        self.nbformat.is_some_and(|v| v < CURRENT_NBFORMAT)
    }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    nbformat: Option<u32>,
    cells: Option<Vec<RawCell>>,
    // Format 3 nests cells in worksheets
    worksheets: Option<Vec<RawWorksheet>>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    kernelspec: Option<KernelSpec>,
}

#[derive(Debug, Deserialize)]
struct KernelSpec {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWorksheet {
    #[serde(default)]
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    metadata: CellMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct CellMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

/// Parse notebook JSON and summarize it
pub fn summarize(
    json: &str,
    remove_tags: &[String],
) -> std::result::Result<NotebookSummary, FormatError> {
    let raw: RawNotebook = serde_json::from_str(json)?;

    let cells: Vec<RawCell> = match (raw.cells, raw.worksheets) {
        (Some(cells), _) => cells,
        (None, Some(worksheets)) => worksheets.into_iter().flat_map(|w| w.cells).collect(),
        (None, None) => return Err(FormatError::NoCells),
    };

    let removed_cells = cells
        .iter()
        .filter(|cell| cell.metadata.tags.iter().any(|t| remove_tags.contains(t)))
        .count();

    Ok(NotebookSummary {
        nbformat: raw.nbformat,
        cells: cells.len(),
        removed_cells,
        kernel: raw.metadata.kernelspec.and_then(|k| k.display_name),
    })
}

/// Read and summarize the notebook at `path`
pub fn inspect(path: &Path, remove_tags: &[String]) -> Result<NotebookSummary> {
    let json = fs::read_to_string(path)?;
    summarize(&json, remove_tags).map_err(|reason| NotebookError::InvalidNotebook {
        path: path.to_path_buf(),
        reason,
    })
}
