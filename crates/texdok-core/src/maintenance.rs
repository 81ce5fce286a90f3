//! Distribution maintenance
//!
//! MiKTeX installs missing packages on demand, which goes much smoother on
//! an up-to-date installation. The update is opportunistic: its outcome is
//! logged and never affects the compile request.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::locator::Engine;
use crate::process::{CommandRunner, Invocation};

/// MiKTeX's command-line updater
pub const MIKTEX_UPDATE: &str = "miktex-update";

/// Upper bound for an update run
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// The updater next to the engine, or the bare name for a `PATH` lookup
pub fn miktex_updater(engine: &Engine) -> PathBuf {
    let file_name = format!("{MIKTEX_UPDATE}{}", std::env::consts::EXE_SUFFIX);
    match engine.program.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && dir.join(&file_name).is_file() => {
            dir.join(file_name)
        }
        _ => PathBuf::from(MIKTEX_UPDATE),
    }
}

/// Try to update a MiKTeX installation; returns whether it succeeded
pub fn update_miktex(runner: &dyn CommandRunner, engine: &Engine) -> bool {
    let invocation = Invocation::new(miktex_updater(engine));
    info!("Attempting to update MiKTeX");

    match runner.run(&invocation, UPDATE_TIMEOUT) {
        Ok(output) if output.success => {
            info!("MiKTeX updated");
            true
        }
        Ok(output) if output.timed_out => {
            warn!("MiKTeX update timed out after {:?}", UPDATE_TIMEOUT);
            false
        }
        Ok(output) => {
            warn!("MiKTeX update failed or not needed (exit code {:?})", output.code);
            false
        }
        Err(e) => {
            warn!("MiKTeX updater not available: {}", e);
            false
        }
    }
}
