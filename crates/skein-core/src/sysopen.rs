use std::path::Path;
use std::process::Command;

use anyhow::Context;
use tracing::debug;

// Fire-and-forget: the viewer is not waited on.
#[tracing::instrument]
pub fn open_with_default_app(path: &Path) -> anyhow::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("rundll32");
        command.arg("url.dll,FileProtocolHandler").arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    };

    command
        .spawn()
        .with_context(|| format!("failed to open {}", path.display()))?;
    debug!(path = %path.display(), "opened with the system handler");
    Ok(())
}
