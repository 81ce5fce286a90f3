//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

use texdok_core::{
    CompileRequest, CompileResult, CompilerConfig, DocumentCompiler, EngineLocator, ProbeOutcome,
    SystemRunner,
};
use texdok_notebook::{NotebookRenderer, NotebookRequest};

/// Config files looked up in the current directory, in order
const CONFIG_CANDIDATES: &[&str] = &["texdok.toml", ".texdok.toml"];

/// Output format for compile results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "texdok")]
#[command(author, version, about = "PDFs from the LaTeX toolchain you already have", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a LaTeX file to PDF
    Compile {
        /// Input .tex file
        input: PathBuf,

        /// Output PDF path or directory (default: next to the input)
        output: Option<PathBuf>,

        /// Engine to use instead of the configured candidates
        engine: Option<String>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only report output lines mentioning "error" or "missing"
        #[arg(long)]
        errors_only: bool,

        /// Keep auxiliary files (.aux, .log, ...)
        #[arg(long)]
        keep_aux: bool,
    },

    /// Render a Jupyter notebook to HTML
    Notebook {
        /// Input .ipynb file
        input: PathBuf,

        /// Output HTML file (default: next to the notebook)
        output: Option<PathBuf>,

        /// Do not open the result in the default viewer
        #[arg(long)]
        no_open: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List candidate engines and whether they respond
    Engines {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Options for [`compile_command`]
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub engine: Option<String>,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub errors_only: bool,
    pub keep_aux: bool,
}

impl CompileOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            input,
            output,
            engine,
            config,
            format,
            errors_only,
            keep_aux,
        } => {
            compile_command(&CompileOptions {
                input,
                output,
                engine,
                config,
                format,
                errors_only,
                keep_aux,
            })?;
        }
        Commands::Notebook {
            input,
            output,
            no_open,
            config,
        } => {
            notebook_command(&input, output.as_deref(), !no_open, config.as_deref())?;
        }
        Commands::Engines { config } => {
            engines_command(config.as_deref())?;
        }
    }

    Ok(())
}

/// Log level for the number of `-v` flags
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Log to stderr so stdout stays clean for results
fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level(verbose).into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the compile command
pub fn compile_command(options: &CompileOptions) -> Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if options.errors_only {
        config.compile.filter_diagnostics = true;
    }
    if options.keep_aux {
        config.cleanup.enabled = false;
    }

    let mut request = CompileRequest::new(&options.input);
    if let Some(output) = &options.output {
        request = request.with_output(output);
    }
    if let Some(engine) = &options.engine {
        request = request.with_engine(engine);
    }

    let compiler = DocumentCompiler::new(config);
    let text = options.format == OutputFormat::Text;
    if text {
        let target = options
            .output
            .clone()
            .unwrap_or_else(|| compiler.default_artifact_path(&options.input));
        println!("texdok v{}", texdok_core::VERSION);
        println!(
            "Compiling: {} -> {}",
            options.input.display(),
            target.display()
        );
    }

    let outcome = compiler.compile(&request);

    if !text {
        let result = CompileResult::from_outcome(&outcome);
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize compile result to JSON")?;
        println!("{}", json);
        outcome.with_context(|| format!("Failed to compile {}", options.input.display()))?;
        return Ok(());
    }

    match outcome {
        Ok(report) => {
            match &report.engine.version {
                Some(version) => println!("  Engine: {} ({})", report.engine.name, version),
                None => println!("  Engine: {}", report.engine.name),
            }
            if report.attempts > 1 {
                println!("  Succeeded on attempt {}", report.attempts);
            }
            for line in &report.diagnostics {
                println!("  ! {}", line);
            }
            if !report.removed_byproducts.is_empty() {
                println!("  Removed {} auxiliary file(s)", report.removed_byproducts.len());
            }
            println!();
            println!("Compile complete!");
            println!("  Output: {}", report.artifact.display());
            Ok(())
        }
        Err(err) => {
            if !err.diagnostics().is_empty() {
                eprintln!();
                eprintln!("Engine output:");
                for line in err.diagnostics() {
                    eprintln!("  {}", line);
                }
            }
            if let Some(help) = err.help() {
                eprintln!();
                eprintln!("{}", help);
            }
            eprintln!();
            Err(err).with_context(|| format!("Failed to compile {}", options.input.display()))
        }
    }
}

/// Execute the notebook command
pub fn notebook_command(
    input: &Path,
    output: Option<&Path>,
    open: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;

    println!("texdok v{}", texdok_core::VERSION);
    println!("Rendering: {}", input.display());

    let mut request = NotebookRequest::new(input);
    if let Some(output) = output {
        request = request.with_output(output);
    }
    if !open {
        request = request.without_viewer();
    }

    let renderer = NotebookRenderer::new(config.notebook)
        .with_search_paths(config.engine.search_paths);

    match renderer.render(&request) {
        Ok(rendering) => {
            println!("  Converter: {}", rendering.converter.name);
            println!(
                "  Cells: {} ({} removed)",
                rendering.summary.cells, rendering.summary.removed_cells
            );
            println!();
            println!("Render complete!");
            println!("  Output: {}", rendering.html.display());
            if rendering.opened {
                println!("  Opened in default viewer");
            }
            Ok(())
        }
        Err(err) => {
            for line in err.diagnostics() {
                eprintln!("  {}", line);
            }
            if let Some(help) = err.help() {
                eprintln!("{}", help);
            }
            Err(err).with_context(|| format!("Failed to render {}", input.display()))
        }
    }
}

/// Execute the engines command
pub fn engines_command(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let runner = SystemRunner::new();
    let locator = EngineLocator::new(&runner, config.engine.probe_timeout())
        .with_search_paths(config.engine.search_paths.clone());

    println!("texdok v{}", texdok_core::VERSION);
    println!();
    println!("LaTeX engines:");
    let engines = locator.probe_all(&config.engine.candidates);
    for report in &engines {
        println!(
            "  {:<20} {} ({})",
            report.candidate,
            describe(&report.outcome),
            report.program.display()
        );
    }

    println!();
    println!("Notebook converters:");
    for report in locator.probe_all(&config.notebook.converters) {
        println!(
            "  {:<20} {} ({})",
            report.candidate,
            describe(&report.outcome),
            report.program.display()
        );
    }

    if !engines.iter().any(|r| r.outcome.is_available()) {
        println!();
        println!("No LaTeX engine available.");
    }

    Ok(())
}

fn describe(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Available { version: Some(v) } => format!("✓ {}", v),
        ProbeOutcome::Available { version: None } => "✓ available".to_string(),
        ProbeOutcome::Failed { code: Some(code) } => format!("✗ exited with {}", code),
        ProbeOutcome::Failed { code: None } => "✗ terminated".to_string(),
        ProbeOutcome::TimedOut => "✗ timed out".to_string(),
        ProbeOutcome::NotFound { .. } => "✗ not found".to_string(),
    }
}

/// Load configuration from a file or use defaults
fn load_config(config_path: Option<&Path>) -> Result<CompilerConfig> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            CompilerConfig::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        }
        None => {
            for candidate in CONFIG_CANDIDATES {
                let path = Path::new(candidate);
                if path.is_file() {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("Failed to read config: {}", candidate))?;
                    return CompilerConfig::from_toml_str(&content)
                        .with_context(|| format!("Failed to parse config: {}", candidate));
                }
            }
            Ok(CompilerConfig::default())
        }
    }
}
