//! Notebook to HTML rendering through nbconvert

use std::fs;
use std::path::{Path, PathBuf};

use texdok_core::locator::DEFAULT_PROBE_TIMEOUT;
use texdok_core::{
    CommandRunner, DiagnosticFilter, Engine, EngineLocator, Invocation, NotebookSettings,
    SystemRunner,
};
use tracing::{info, warn};

use crate::error::{NotebookError, Result};
use crate::notebook::{self, NotebookSummary};
use crate::viewer;

/// Front end that needs the `nbconvert` subcommand
const JUPYTER_FRONTEND: &str = "jupyter";

/// A request to render one notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookRequest {
    pub input: PathBuf,
    /// Target HTML file (default: next to the notebook)
    pub output: Option<PathBuf>,
    /// Open the result in the platform viewer if the settings allow it
    pub open: bool,
}

impl NotebookRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            open: true,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn without_viewer(mut self) -> Self {
        self.open = false;
        self
    }
}

/// A rendered notebook
#[derive(Debug, Clone)]
pub struct Rendering {
    pub html: PathBuf,
    pub converter: Engine,
    pub summary: NotebookSummary,
    /// Whether the viewer was launched successfully
    pub opened: bool,
}

/// Renders notebooks with the first available nbconvert front end
pub struct NotebookRenderer {
    runner: Box<dyn CommandRunner>,
    settings: NotebookSettings,
    search_paths: Vec<PathBuf>,
    path_dirs: Option<Vec<PathBuf>>,
}

impl NotebookRenderer {
    pub fn new(settings: NotebookSettings) -> Self {
        Self::with_runner(settings, Box::new(SystemRunner::new()))
    }

    pub fn with_runner(settings: NotebookSettings, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            settings,
            search_paths: Vec::new(),
            path_dirs: None,
        }
    }

    /// Directories searched for converters before `PATH`
    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    /// Search these directories instead of the process `PATH`
    pub fn with_path_dirs(mut self, path_dirs: Vec<PathBuf>) -> Self {
        self.path_dirs = Some(path_dirs);
        self
    }

    /// `<input stem>.html` next to the notebook
    pub fn default_output_path(input: &Path) -> PathBuf {
        input.with_extension("html")
    }

    fn locator(&self) -> EngineLocator<'_> {
        let locator = EngineLocator::new(self.runner.as_ref(), DEFAULT_PROBE_TIMEOUT)
            .with_search_paths(self.search_paths.clone());
        match &self.path_dirs {
            Some(dirs) => locator.with_path_dirs(dirs.clone()),
            None => locator,
        }
    }

    /// Converter command writing `<output_dir>/<stem>.html`
    pub fn invocation(
        &self,
        converter: &Engine,
        input: &Path,
        output_dir: &Path,
        stem: &str,
    ) -> Result<Invocation> {
        let file_name = input
            .file_name()
            .ok_or_else(|| NotebookError::NotFound(input.to_path_buf()))?;
        let working_dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut invocation = Invocation::new(&converter.program);
        if converter
            .program
            .file_stem()
            .is_some_and(|stem| stem == JUPYTER_FRONTEND)
        {
            invocation = invocation.arg("nbconvert");
        }
        invocation = invocation
            .args(["--to", "html", "--template"])
            .arg(self.settings.template.as_str())
            .arg("--TagRemovePreprocessor.enabled=True");
        for tag in &self.settings.remove_cell_tags {
            invocation = invocation.arg(format!("--TagRemovePreprocessor.remove_cell_tags={tag}"));
        }

        Ok(invocation
            .args(["--output", stem, "--output-dir"])
            .arg(output_dir.to_string_lossy())
            .arg(file_name.to_string_lossy())
            .current_dir(working_dir))
    }

    /// Convert the notebook and optionally open the result
    pub fn render(&self, request: &NotebookRequest) -> Result<Rendering> {
        if !request.input.is_file() {
            return Err(NotebookError::NotFound(request.input.clone()));
        }

        let summary = notebook::inspect(&request.input, &self.settings.remove_cell_tags)?;
        if summary.is_legacy() {
            warn!(
                "{} uses notebook format {:?}; nbconvert will upgrade it",
                request.input.display(),
                summary.nbformat
            );
        }
        if summary.removed_cells > 0 {
            info!("Dropping {} tagged cell(s)", summary.removed_cells);
        }

        let requested = request
            .output
            .clone()
            .unwrap_or_else(|| Self::default_output_path(&request.input));
        let stem = requested
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| NotebookError::InvalidOutput(requested.clone()))?;

        let converter = self
            .locator()
            .locate(&self.settings.converters)
            .map_err(|_| NotebookError::ConverterNotFound {
                tried: self.settings.converters.clone(),
            })?;

        let output_dir = match requested.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&output_dir)?;
        // The converter runs in the notebook's directory
        let output_dir = output_dir.canonicalize()?;
        let html = output_dir.join(format!("{stem}.html"));

        let invocation = self.invocation(&converter, &request.input, &output_dir, &stem)?;
        info!("Running {}", invocation.command_line());
        let output = self.runner.run(&invocation, self.settings.timeout())?;

        if output.timed_out || !output.success {
            let mut diagnostics = DiagnosticFilter::All.matching_lines(&output);
            if output.timed_out {
                diagnostics.push(format!(
                    "Converter timed out after {}s",
                    self.settings.timeout().as_secs()
                ));
            }
            return Err(NotebookError::ConversionFailed { diagnostics });
        }

        if !html.is_file() {
            return Err(NotebookError::OutputMissing { expected: html });
        }
        info!("Rendered {}", html.display());

        let opened =
            request.open && self.settings.open_viewer && viewer::open(self.runner.as_ref(), &html);

        Ok(Rendering {
            html,
            converter,
            summary,
            opened,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use texdok_core::testing::{ScriptedRunner, Step};
    use texdok_core::ProcessOutput;

    const NOTEBOOK: &str = r##"{
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"kernelspec": {"display_name": "Python 3"}},
        "cells": [
            {"cell_type": "code", "metadata": {"tags": ["dark-mode"]}, "source": []},
            {"cell_type": "markdown", "metadata": {}, "source": ["# Results"]}
        ]
    }"##;

    fn write_notebook(dir: &Path) -> PathBuf {
        let path = dir.join("analysis.ipynb");
        fs::write(&path, NOTEBOOK).unwrap();
        path
    }

    fn settings() -> NotebookSettings {
        NotebookSettings {
            open_viewer: false,
            ..NotebookSettings::default()
        }
    }

    fn renderer(runner: &Arc<ScriptedRunner>, settings: NotebookSettings) -> NotebookRenderer {
        NotebookRenderer::with_runner(settings, Box::new(Arc::clone(runner)))
            .with_path_dirs(Vec::new())
    }

    fn converts() -> Step {
        Step::Produce {
            output: ProcessOutput::success("[NbConvertApp] Writing 1024 bytes"),
            extensions: vec!["html".to_string()],
        }
    }

    #[test]
    fn test_renders_next_to_notebook() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new()
                .available("jupyter-nbconvert")
                .on("jupyter-nbconvert", converts()),
        );

        let rendering = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap();

        assert_eq!(rendering.html.file_name().unwrap(), "analysis.html");
        assert!(rendering.html.exists());
        assert_eq!(rendering.converter.name, "jupyter-nbconvert");
        assert_eq!(rendering.summary.removed_cells, 1);
        assert!(!rendering.opened);

        let calls = runner.calls();
        let convert = &calls[1];
        assert_eq!(convert.working_dir.as_deref(), Some(dir.path()));
        assert_eq!(convert.args[..2], ["--to", "html"]);
        assert!(convert
            .args
            .contains(&"--TagRemovePreprocessor.remove_cell_tags=dark-mode".to_string()));
        assert_eq!(convert.args.last().map(String::as_str), Some("analysis.ipynb"));
    }

    #[test]
    fn test_jupyter_front_end_gets_subcommand() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(ScriptedRunner::new().available("jupyter").on("jupyter", converts()));

        renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, PathBuf::from("jupyter-nbconvert"));
        assert_eq!(calls[2].args[0], "nbconvert");
    }

    #[test]
    fn test_jupyter_front_end_by_path() {
        let runner = Arc::new(ScriptedRunner::new());
        let renderer = renderer(&runner, settings());
        let converter = |program: &str| Engine {
            name: program.to_string(),
            program: PathBuf::from(program),
            version: None,
        };
        let input = Path::new("/work/analysis.ipynb");
        let out = Path::new("/work");

        let invocation = renderer
            .invocation(&converter("/usr/local/bin/jupyter"), input, out, "analysis")
            .unwrap();
        assert_eq!(invocation.args[0], "nbconvert");

        let invocation = renderer
            .invocation(&converter("/usr/local/bin/jupyter-nbconvert"), input, out, "analysis")
            .unwrap();
        assert_eq!(invocation.args[0], "--to");
    }

    #[test]
    fn test_output_without_file_name() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(ScriptedRunner::new().available("jupyter-nbconvert"));

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input).with_output(dir.path().join("..")))
            .unwrap_err();

        assert!(matches!(err, NotebookError::InvalidOutput(_)));
        // Rejected before any converter is probed
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_no_converter() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(ScriptedRunner::new());

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap_err();

        match err {
            NotebookError::ConverterNotFound { tried } => {
                assert_eq!(tried, ["jupyter-nbconvert", "jupyter"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_notebook_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.ipynb");
        fs::write(&input, "plain text").unwrap();
        let runner = Arc::new(ScriptedRunner::new().available("jupyter-nbconvert"));

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap_err();

        assert!(matches!(err, NotebookError::InvalidNotebook { .. }));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_conversion_failure_carries_output() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new().available("jupyter-nbconvert").on(
                "jupyter-nbconvert",
                Step::Respond(ProcessOutput::failure(
                    1,
                    "",
                    "ValueError: No template sub-directory with name 'classic' found",
                )),
            ),
        );

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap_err();

        assert!(matches!(err, NotebookError::ConversionFailed { .. }));
        assert_eq!(err.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_html_is_reported() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new()
                .available("jupyter-nbconvert")
                .on("jupyter-nbconvert", Step::Respond(ProcessOutput::success(""))),
        );

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input))
            .unwrap_err();

        assert!(matches!(err, NotebookError::OutputMissing { .. }));
    }

    #[test]
    fn test_explicit_output_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let target = dir.path().join("site").join("report.html");
        // Converter succeeds but writes nothing
        let runner = Arc::new(
            ScriptedRunner::new()
                .available("jupyter-nbconvert")
                .on("jupyter-nbconvert", Step::Respond(ProcessOutput::success(""))),
        );

        let err = renderer(&runner, settings())
            .render(&NotebookRequest::new(&input).with_output(&target))
            .unwrap_err();

        let site = dir.path().join("site").canonicalize().unwrap();
        match err {
            NotebookError::OutputMissing { expected } => {
                assert_eq!(expected, site.join("report.html"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let convert = &runner.calls()[1];
        let at = convert.args.iter().position(|a| a == "--output").unwrap();
        assert_eq!(convert.args[at + 1], "report");
        assert_eq!(convert.args[at + 3], site.to_string_lossy());
    }

    #[test]
    fn test_viewer_opens_when_enabled() {
        let dir = TempDir::new().unwrap();
        let input = write_notebook(dir.path());
        let html = dir.path().canonicalize().unwrap().join("analysis.html");
        let viewer = viewer::viewer_invocation(&html).program;
        let runner = Arc::new(
            ScriptedRunner::new()
                .available("jupyter-nbconvert")
                .on("jupyter-nbconvert", converts())
                .on(viewer, Step::Respond(ProcessOutput::success(""))),
        );

        let rendering = renderer(&runner, NotebookSettings::default())
            .render(&NotebookRequest::new(&input))
            .unwrap();
        assert!(rendering.opened);

        let runner = Arc::new(
            ScriptedRunner::new()
                .available("jupyter-nbconvert")
                .on("jupyter-nbconvert", converts()),
        );
        let rendering = renderer(&runner, NotebookSettings::default())
            .render(&NotebookRequest::new(&input).without_viewer())
            .unwrap();
        assert!(!rendering.opened);
        assert_eq!(runner.call_count(), 2);
    }
}
