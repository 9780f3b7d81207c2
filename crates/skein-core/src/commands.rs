use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use anyhow::Context;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::attach::AttachmentStore;
use crate::autostart::Autostart;
use crate::clipboard::{ClipboardResolver, Resolution};
use crate::datastore::QueueStore;
use crate::dialog::{ATTACHMENT_FILTERS, DialogProvider, TaskPrompt};
use crate::dispatch::UiDispatcher;
use crate::error::Error;
use crate::render::{Renderer, path_to_file_url};
use crate::sysopen;
use crate::task::{AttachmentKind, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    AddTask,
    ShowHead,
    Skip,
    Complete,
    Reorder,
    ToggleAutostart,
    OpenDataDir,
    Quit,
}

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<QueueStore>,
    pub attachments: AttachmentStore,
    pub dialogs: Arc<dyn DialogProvider>,
    pub dispatcher: UiDispatcher,
    pub renderer: Renderer,
    pub autostart: Autostart,
    pub base_dir: PathBuf,
}

pub fn run_event_loop(ctx: AppContext, events: Receiver<MenuEvent>) {
    for event in events.iter() {
        debug!(?event, "menu event");
        let quit = event == MenuEvent::Quit;
        dispatch(&ctx, event);
        if quit {
            break;
        }
    }
    // Whatever ended the event stream, let the ui loop drain and exit.
    ctx.dispatcher.close();
    debug!("event loop finished");
}

// Handlers run on the ui dispatch thread; this only enqueues them.
#[instrument(skip(ctx))]
pub fn dispatch(ctx: &AppContext, event: MenuEvent) {
    let submitted = match event {
        MenuEvent::AddTask => submit(ctx, cmd_add_task),
        MenuEvent::ShowHead => submit(ctx, cmd_show_head),
        MenuEvent::Skip => submit(ctx, cmd_skip),
        MenuEvent::Complete => submit(ctx, cmd_complete),
        MenuEvent::Reorder => submit(ctx, cmd_reorder),
        MenuEvent::ToggleAutostart => submit(ctx, cmd_toggle_autostart),
        MenuEvent::OpenDataDir => submit(ctx, cmd_open_data_dir),
        MenuEvent::Quit => {
            ctx.dispatcher.close();
            true
        }
    };
    if !submitted {
        warn!(?event, "dispatcher closed; event dropped");
    }
}

fn submit(ctx: &AppContext, handler: fn(&AppContext) -> anyhow::Result<()>) -> bool {
    let handler_ctx = ctx.clone();
    ctx.dispatcher.submit(move || {
        if let Err(err) = handler(&handler_ctx) {
            warn!(error = %format!("{err:#}"), "menu handler failed");
            handler_ctx.dialogs.error(&format!("{err:#}"));
        }
    })
}

#[instrument(skip(ctx))]
fn cmd_add_task(ctx: &AppContext) -> anyhow::Result<()> {
    info!("add task");

    let resolver = ClipboardResolver::new(ctx.attachments.clone());
    let mut prefill = String::new();
    let mut attachment: Option<(PathBuf, AttachmentKind)> = None;

    loop {
        match ctx.dialogs.prompt_task("Task text (markdown):", &prefill)? {
            TaskPrompt::Submitted(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    ctx.dialogs.error("Task text cannot be empty");
                    continue;
                }

                let mut task = Task::new(text, chrono::Utc::now());
                if let Some((path, kind)) = attachment.take() {
                    task = task.with_attachment(path, kind);
                }
                ctx.store.enqueue(task).context("could not add the task")?;
                ctx.dialogs.info("Task added");
                return Ok(());
            }

            TaskPrompt::PasteFromClipboard => match resolver.resolve() {
                Resolution::Attachment {
                    path,
                    kind: AttachmentKind::Image,
                } => {
                    // Images go straight into the markdown body.
                    prefill.push_str(&format!(
                        "\n\n![clipboard]({})\n",
                        path_to_file_url(&path)
                    ));
                }
                Resolution::Attachment {
                    path,
                    kind: AttachmentKind::Audio,
                } => {
                    attachment = Some((path, AttachmentKind::Audio));
                }
                Resolution::Attachment { path, .. } => {
                    debug!(path = %path.display(), "clipboard file is neither image nor audio; ignored");
                }
                Resolution::Prefill(text) => {
                    if !prefill.is_empty() {
                        prefill.push('\n');
                    }
                    prefill.push_str(&text);
                }
                Resolution::Empty => {
                    ctx.dialogs.error(&Error::ClipboardEmpty.to_string());
                }
            },

            TaskPrompt::AttachFile => {
                let Some(source) = ctx.dialogs.pick_file(ATTACHMENT_FILTERS)? else {
                    continue;
                };
                match ctx.attachments.copy_into_store(&source) {
                    Ok((path, kind)) if kind != AttachmentKind::None => {
                        attachment = Some((path, kind));
                    }
                    Ok(_) => {
                        ctx.dialogs.error("Only image and audio files can be attached");
                    }
                    Err(err) => {
                        ctx.dialogs.error(&format!("Could not attach the file: {err}"));
                    }
                }
            }

            TaskPrompt::Canceled => return Ok(()),
        }
    }
}

#[instrument(skip(ctx))]
fn cmd_show_head(ctx: &AppContext) -> anyhow::Result<()> {
    info!("show head task");

    let Some(task) = ctx.store.peek() else {
        ctx.dialogs.info("The queue is empty");
        return Ok(());
    };

    let document = ctx
        .renderer
        .render(&task.text, task.audio_path())
        .context("could not render the task")?;
    sysopen::open_with_default_app(&document)
}

#[instrument(skip(ctx))]
fn cmd_skip(ctx: &AppContext) -> anyhow::Result<()> {
    info!("skip head task");
    ctx.store.skip().context("could not skip the task")?;
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_complete(ctx: &AppContext) -> anyhow::Result<()> {
    info!("complete head task");

    if !ctx.dialogs.confirm("Complete the current task?")? {
        return Ok(());
    }

    match ctx.store.complete() {
        Ok(task) => {
            debug!(id = %task.id, "task completed");
            Ok(())
        }
        Err(Error::EmptyQueue) => {
            ctx.dialogs.info("The queue is empty");
            Ok(())
        }
        Err(err) => Err(err).context("could not complete the task"),
    }
}

#[instrument(skip(ctx))]
fn cmd_reorder(ctx: &AppContext) -> anyhow::Result<()> {
    info!("reorder queue");

    loop {
        let tasks = ctx.store.tasks();
        if tasks.is_empty() {
            ctx.dialogs.info("The queue is empty");
            return Ok(());
        }

        let listing = ctx.renderer.queue_listing(&tasks);
        let prompt = format!(
            "Current order:\n\n{listing}\nMove an entry with \"from to\" \
             (for example: 5 1 or 5->1).\nEmpty input or cancel finishes."
        );

        let Some(input) = ctx.dialogs.prompt_text(&prompt, "")? else {
            return Ok(());
        };
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let Some((from, to)) = parse_move(input) else {
            ctx.dialogs.error("Use the form \"5 1\" or \"5->1\"");
            continue;
        };

        // The listing is 1-based, the store 0-based.
        if let Err(err) = ctx.store.move_task(from - 1, to - 1) {
            ctx.dialogs.error(&err.to_string());
        }
    }
}

#[instrument(skip(ctx))]
fn cmd_toggle_autostart(ctx: &AppContext) -> anyhow::Result<()> {
    let want = !ctx.autostart.is_enabled();
    ctx.autostart
        .set_enabled(want)
        .context("could not change the login item")?;
    ctx.dialogs.info(if want {
        "Skein will start at login"
    } else {
        "Skein will no longer start at login"
    });
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_open_data_dir(ctx: &AppContext) -> anyhow::Result<()> {
    info!("open data directory");
    sysopen::open_with_default_app(&ctx.base_dir)
}

fn parse_move(input: &str) -> Option<(usize, usize)> {
    static MOVE_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"^\s*(\d+)\s*(?:->|\s)\s*(\d+)\s*$").expect("move directive regex")
    });

    let caps = MOVE_RE.captures(input)?;
    let from: usize = caps[1].parse().ok()?;
    let to: usize = caps[2].parse().ok()?;
    if from == 0 || to == 0 {
        return None;
    }
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::parse_move;

    #[test]
    fn move_directive_forms() {
        assert_eq!(parse_move("5 1"), Some((5, 1)));
        assert_eq!(parse_move("5->1"), Some((5, 1)));
        assert_eq!(parse_move("  5 -> 1  "), Some((5, 1)));
        assert_eq!(parse_move("12 3"), Some((12, 3)));
    }

    #[test]
    fn move_directive_rejects_garbage() {
        assert_eq!(parse_move(""), None);
        assert_eq!(parse_move("five one"), None);
        assert_eq!(parse_move("5"), None);
        assert_eq!(parse_move("5 1 2"), None);
        assert_eq!(parse_move("0 1"), None);
        assert_eq!(parse_move("1 0"), None);
        assert_eq!(parse_move("-1 2"), None);
    }
}
