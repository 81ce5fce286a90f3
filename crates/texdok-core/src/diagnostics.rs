//! Diagnostic extraction from engine output
//!
//! LaTeX engines write their complaints to standard output, mixed with a
//! lot of progress chatter. Keyword filtering is a heuristic: it keeps lines
//! mentioning "error" or "missing" and can both over- and under-match.

use crate::process::ProcessOutput;

/// Case-insensitive keywords that mark a line as worth surfacing
pub const DIAGNOSTIC_KEYWORDS: &[&str] = &["error", "missing"];

/// Which output lines to surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticFilter {
    /// Every non-empty line
    #[default]
    All,
    /// Lines containing one of [`DIAGNOSTIC_KEYWORDS`]
    Keywords,
}

impl DiagnosticFilter {
    /// `Keywords` when `filter` is set, `All` otherwise
    pub fn from_flag(filter: bool) -> Self {
        if filter {
            DiagnosticFilter::Keywords
        } else {
            DiagnosticFilter::All
        }
    }

    /// Whether `line` passes this filter
    pub fn accepts(self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        match self {
            DiagnosticFilter::All => true,
            DiagnosticFilter::Keywords => {
                let lower = line.to_lowercase();
                DIAGNOSTIC_KEYWORDS.iter().any(|k| lower.contains(k))
            }
        }
    }

    /// Lines of stdout then stderr that pass this filter
    pub fn matching_lines(self, output: &ProcessOutput) -> Vec<String> {
        output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .filter(|line| self.accepts(line))
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    /// Lines to attach to a failure
    ///
    /// When keyword filtering leaves nothing, all non-empty lines are kept,
    /// so a process that printed something never yields an empty report.
    pub fn extract(self, output: &ProcessOutput) -> Vec<String> {
        let lines = self.matching_lines(output);
        if lines.is_empty() && self == DiagnosticFilter::Keywords {
            return DiagnosticFilter::All.matching_lines(output);
        }
        lines
    }
}
