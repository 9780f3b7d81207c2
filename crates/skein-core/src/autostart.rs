use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

const AGENT_LABEL: &str = "io.skein.agent";
const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";
const RUN_VALUE: &str = "Skein";

#[derive(Debug, Clone, Copy, Default)]
pub struct Autostart;

impl Autostart {
    pub fn is_enabled(&self) -> bool {
        if cfg!(target_os = "macos") {
            launch_agent_path().map(|p| p.exists()).unwrap_or(false)
        } else if cfg!(target_os = "windows") {
            registry_entry_present()
        } else {
            desktop_entry_path().map(|p| p.exists()).unwrap_or(false)
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn set_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        let applied = if cfg!(target_os = "macos") {
            set_launch_agent(enabled)
        } else if cfg!(target_os = "windows") {
            set_registry_entry(enabled)
        } else {
            set_desktop_entry(enabled)
        };
        applied?;
        info!(enabled, "login item updated");
        Ok(())
    }
}

fn exe_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine the executable path")?;
    Ok(fs::canonicalize(&exe).unwrap_or(exe))
}

fn launch_agent_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine the home directory"))?;
    Ok(home
        .join("Library")
        .join("LaunchAgents")
        .join(format!("{AGENT_LABEL}.plist")))
}

fn set_launch_agent(enabled: bool) -> anyhow::Result<()> {
    let path = launch_agent_path()?;
    if !enabled {
        return remove_if_present(&path);
    }

    let exe = exe_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let plist = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0"><dict>
  <key>Label</key><string>{AGENT_LABEL}</string>
  <key>ProgramArguments</key><array><string>{}</string></array>
  <key>RunAtLoad</key><true/>
  <key>KeepAlive</key><false/>
</dict></plist>
"#,
        exe.display()
    );
    fs::write(&path, plist).with_context(|| format!("failed to write {}", path.display()))
}

fn registry_entry_present() -> bool {
    Command::new("reg")
        .args(["query", RUN_KEY, "/v", RUN_VALUE])
        .output()
        .map(|out| {
            out.status.success()
                && String::from_utf8_lossy(&out.stdout)
                    .to_lowercase()
                    .contains(&RUN_VALUE.to_lowercase())
        })
        .unwrap_or(false)
}

fn set_registry_entry(enabled: bool) -> anyhow::Result<()> {
    let status = if enabled {
        let exe = exe_path()?;
        Command::new("reg")
            .args(["add", RUN_KEY, "/v", RUN_VALUE, "/t", "REG_SZ", "/d"])
            .arg(&exe)
            .arg("/f")
            .status()
    } else {
        Command::new("reg")
            .args(["delete", RUN_KEY, "/v", RUN_VALUE, "/f"])
            .status()
    }
    .context("failed to run reg")?;

    if !status.success() {
        return Err(anyhow!("reg exited with {status}"));
    }
    Ok(())
}

fn desktop_entry_path() -> anyhow::Result<PathBuf> {
    let config = dirs::config_dir().ok_or_else(|| anyhow!("cannot determine the config directory"))?;
    Ok(config.join("autostart").join("skein.desktop"))
}

fn set_desktop_entry(enabled: bool) -> anyhow::Result<()> {
    let path = desktop_entry_path()?;
    if !enabled {
        return remove_if_present(&path);
    }

    let exe = exe_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let desktop = format!(
        "[Desktop Entry]\nType=Application\nName=Skein\nExec={}\nX-GNOME-Autostart-enabled=true\n",
        exe.display()
    );
    fs::write(&path, desktop).with_context(|| format!("failed to write {}", path.display()))
}

fn remove_if_present(path: &std::path::Path) -> anyhow::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "login item removed");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}
