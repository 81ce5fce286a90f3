//! Platform viewer launch

use std::path::Path;
use std::time::Duration;

use texdok_core::{CommandRunner, Invocation};
use tracing::{debug, warn};

/// The launchers return as soon as the viewer is started
pub const VIEWER_TIMEOUT: Duration = Duration::from_secs(10);

/// Command that opens `path` with the platform default application
pub fn viewer_invocation(path: &Path) -> Invocation {
    let target = path.to_string_lossy().into_owned();
    if cfg!(target_os = "macos") {
        Invocation::new("open").arg(target)
    } else if cfg!(windows) {
        Invocation::new("cmd").args(["/C", "start", ""]).arg(target)
    } else {
        Invocation::new("xdg-open").arg(target)
    }
}

/// Open `path` in the default viewer, returning whether it worked
///
/// A failure is logged and otherwise ignored: the file has already been
/// written by the time this runs.
pub fn open(runner: &dyn CommandRunner, path: &Path) -> bool {
    let invocation = viewer_invocation(path);
    debug!("Opening viewer: {}", invocation.command_line());

    match runner.run(&invocation, VIEWER_TIMEOUT) {
        Ok(output) if output.success => true,
        Ok(output) => {
            warn!(
                "Could not open {} (exit code {:?})",
                path.display(),
                output.code
            );
            false
        }
        Err(e) => {
            warn!("Could not start {}: {}", invocation.program.display(), e);
            false
        }
    }
}
