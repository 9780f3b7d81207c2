pub mod attach;
pub mod autostart;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod dialog;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod sysopen;
pub mod task;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::commands::AppContext;
use crate::dispatch::UiLoop;

pub fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SKEIN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialise tracing: {err}"))
}

// A failure here is fatal: nothing can be made durable without the base
// directory.
#[tracing::instrument(skip_all, fields(base_dir = %base_dir.display()))]
pub fn bootstrap(
    base_dir: &Path,
    list_width: usize,
    dialogs: Arc<dyn dialog::DialogProvider>,
) -> anyhow::Result<(AppContext, UiLoop)> {
    let store = Arc::new(
        datastore::QueueStore::open(base_dir)
            .with_context(|| format!("failed to open the queue store at {}", base_dir.display()))?,
    );
    let attachments = attach::AttachmentStore::open(base_dir).with_context(|| {
        format!(
            "failed to open the attachment store at {}",
            base_dir.display()
        )
    })?;
    let renderer = render::Renderer::new(base_dir, list_width);

    let (dispatcher, ui_loop) = dispatch::ui_channel();
    let ctx = AppContext {
        store,
        attachments,
        dialogs,
        dispatcher,
        renderer,
        autostart: autostart::Autostart,
        base_dir: base_dir.to_path_buf(),
    };

    info!(base_dir = %base_dir.display(), "skein ready");
    Ok((ctx, ui_loop))
}
