//! Integration tests for the texdok CLI
//!
//! These run the built `texdok` binary against small shell scripts that
//! behave like LaTeX engines: they answer `--version`, and write
//! `<stem>.pdf`, `.aux` and `.log` into their working directory.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

use tempfile::TempDir;

// Writing a script while another test forks can leave it "text file busy"
static SERIAL: Mutex<()> = Mutex::new(());

const VERSION_BANNER: &str = r#"if [ "$1" = "--version" ]; then
  echo "fakeTeX 3.14 (texdok test engine)"
  exit 0
fi
for last; do :; done
stem="${last%.tex}"
"#;

const PRODUCE: &str = r#"echo "%PDF-1.5" > "$stem.pdf"
: > "$stem.aux"
: > "$stem.log"
echo "Output written on $stem.pdf (1 page)."
exit 0
"#;

const UNDEFINED: &str = r#"echo "This is fakeTeX"
echo "! Undefined control sequence."
printf '%s\n' 'l.3 \foo'
exit 1
"#;

const DOCUMENT: &str = "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.tex"), DOCUMENT).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable engine script and return its path
    fn engine(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join("bin").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("#!/bin/sh\n{VERSION_BANNER}{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Write texdok.toml with the given candidates
    fn config(&self, candidates: &[PathBuf], extra: &str) {
        let list: Vec<String> = candidates
            .iter()
            .map(|c| format!("{:?}", c.display().to_string()))
            .collect();
        let toml = format!(
            "[engine]\ncandidates = [{}]\nprobe_timeout_ms = 500\n\n{extra}",
            list.join(", ")
        );
        fs::write(self.path().join("texdok.toml"), toml).unwrap();
    }

    fn texdok(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_texdok"))
            .args(args)
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_compile_next_to_input_and_clean_up() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "report.tex"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ws.path().join("report.pdf").exists());
    assert!(!ws.path().join("report.aux").exists());
    assert!(!ws.path().join("report.log").exists());
    assert!(ws.path().join("report.tex").exists());
    assert!(stdout(&output).contains("Compile complete!"));
}

#[test]
fn test_keep_aux_leaves_byproducts() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "report.tex", "--keep-aux"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ws.path().join("report.aux").exists());
    assert!(ws.path().join("report.log").exists());
}

#[test]
fn test_undefined_control_sequence_exits_1() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", UNDEFINED);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "report.tex"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("! Undefined control sequence."), "stderr: {err}");
    assert!(err.contains("after 2 attempt(s)"), "stderr: {err}");
    assert!(!ws.path().join("report.pdf").exists());
}

#[test]
fn test_second_attempt_succeeds() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let body = format!(
        "if [ ! -f .attempted ]; then\n  : > .attempted\n  echo \"! Emergency stop.\"\n  exit 1\nfi\n{PRODUCE}"
    );
    let engine = ws.engine("pdflatex", &body);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "report.tex"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Succeeded on attempt 2"));
    assert!(ws.path().join("report.pdf").exists());
}

#[test]
fn test_explicit_output_moves_artifact() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "report.tex", "out/final.pdf"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ws.path().join("out").join("final.pdf").exists());
    assert!(!ws.path().join("report.pdf").exists());
}

#[test]
fn test_explicit_engine_argument() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let broken = ws.engine("pdflatex", UNDEFINED);
    let xelatex = ws.engine("xelatex", PRODUCE);
    ws.config(&[broken], "");

    let engine = xelatex.display().to_string();
    let output = ws.texdok(&["compile", "report.tex", "report.pdf", &engine]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ws.path().join("report.pdf").exists());
}

#[test]
fn test_missing_input_exits_1() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine], "");

    let output = ws.texdok(&["compile", "missing.tex"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Input file not found"));
}

#[test]
fn test_no_engine_exits_1() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    ws.config(&[ws.path().join("bin").join("nonexistent-latex")], "");

    let output = ws.texdok(&["compile", "report.tex"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("No LaTeX engine found"), "stderr: {err}");
    assert!(err.contains("TeX Live"), "stderr: {err}");
}

#[test]
fn test_hanging_probe_is_skipped() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let hanging = ws.path().join("bin").join("hanging");
    fs::create_dir_all(hanging.parent().unwrap()).unwrap();
    fs::write(&hanging, "#!/bin/sh\nexec sleep 30\n").unwrap();
    fs::set_permissions(&hanging, fs::Permissions::from_mode(0o755)).unwrap();
    let engine = ws.engine("lualatex", PRODUCE);
    ws.config(&[hanging, engine], "");

    let started = std::time::Instant::now();
    let output = ws.texdok(&["compile", "report.tex"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(started.elapsed() < std::time::Duration::from_secs(20));
    assert!(ws.path().join("report.pdf").exists());
}

#[test]
fn test_json_result() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let body = "echo \"This is fakeTeX\"\necho \"! LaTeX Error: Environment foo undefined.\"\nexit 1\n";
    let engine = ws.engine("pdflatex", body);
    ws.config(&[engine], "[compile]\nfilter_diagnostics = true\n");

    let output = ws.texdok(&["compile", "report.tex", "--format", "json"]);

    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["stage"]["compiling"]["attempt"], 2);
    assert_eq!(
        result["diagnostic_lines"],
        serde_json::json!(["! LaTeX Error: Environment foo undefined."])
    );
}

#[test]
fn test_engines_lists_candidates() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine, ws.path().join("bin").join("absent")], "");

    let output = ws.texdok(&["engines"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("✓ fakeTeX 3.14"), "stdout: {out}");
    assert!(out.contains("✗ not found"), "stdout: {out}");
}

#[test]
fn test_relative_engine_path_with_nested_input() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    ws.engine("xelatex", PRODUCE);
    ws.config(&[PathBuf::from("bin/xelatex")], "");
    fs::create_dir_all(ws.path().join("docs")).unwrap();
    fs::write(ws.path().join("docs").join("report.tex"), DOCUMENT).unwrap();

    let output = ws.texdok(&["compile", "docs/report.tex"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ws.path().join("docs").join("report.pdf").exists());
    assert!(!ws.path().join("docs").join("report.aux").exists());
}

#[test]
fn test_unwritable_output_exits_1() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let engine = ws.engine("pdflatex", PRODUCE);
    ws.config(&[engine], "");
    fs::write(ws.path().join("blocker"), "").unwrap();

    let output = ws.texdok(&["compile", "report.tex", "blocker/final.pdf"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Failed to move"), "stderr: {err}");
    assert!(ws.path().join("report.pdf").exists());
}
