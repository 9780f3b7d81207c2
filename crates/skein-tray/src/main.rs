use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use skein_core::commands::{self, AppContext, MenuEvent};
use skein_core::config;
use skein_core::dialog::{DialogProvider, FileFilter, TaskPrompt};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    skein_core::init_tracing()?;

    let cfg = config::Config::load()?;
    let base_dir = config::resolve_base_dir(&cfg)?;

    let dialogs: Arc<dyn DialogProvider> = Arc::new(ConsoleDialogs);
    let (ctx, ui_loop) = skein_core::bootstrap(&base_dir, cfg.list_width(), dialogs)?;

    // The console menu is the background event loop; dialogs run on the
    // main thread.
    let menu_ctx = ctx.clone();
    let menu_thread = thread::Builder::new()
        .name("console-menu".to_string())
        .spawn(move || read_menu(menu_ctx))?;

    ui_loop.run();

    let _ = menu_thread.join();
    Ok(())
}

fn read_menu(ctx: AppContext) {
    print_help();

    loop {
        print!("skein> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        let event = match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => MenuEvent::Quit,
            Ok(_) => match line.trim() {
                "" => continue,
                "add" => MenuEvent::AddTask,
                "show" => MenuEvent::ShowHead,
                "skip" => MenuEvent::Skip,
                "done" => MenuEvent::Complete,
                "list" => MenuEvent::Reorder,
                "login" => MenuEvent::ToggleAutostart,
                "folder" => MenuEvent::OpenDataDir,
                "quit" => MenuEvent::Quit,
                "help" => {
                    print_help();
                    continue;
                }
                other => {
                    println!("unknown command: {other} (try 'help')");
                    continue;
                }
            },
        };

        commands::dispatch(&ctx, event);
        if event == MenuEvent::Quit {
            break;
        }

        // The handler owns stdin until it finishes.
        wait_for_idle(&ctx);
    }
}

fn wait_for_idle(ctx: &AppContext) {
    let (ack_tx, ack_rx) = mpsc::channel();
    if ctx.dispatcher.submit(move || {
        let _ = ack_tx.send(());
    }) {
        let _ = ack_rx.recv();
    }
}

fn print_help() {
    println!(
        "commands: add, show, skip, done, list, login, folder, quit, help"
    );
}

struct ConsoleDialogs;

impl ConsoleDialogs {
    fn read_answer(&self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl DialogProvider for ConsoleDialogs {
    fn prompt_task(&self, message: &str, prefill: &str) -> anyhow::Result<TaskPrompt> {
        println!("{message}");
        if !prefill.is_empty() {
            println!("--- text so far ---");
            println!("{prefill}");
            println!("-------------------");
        }
        println!("(':paste' pastes the clipboard, ':attach' picks a file, ':cancel' cancels)");
        print!("> ");
        io::stdout().flush()?;

        match self.read_answer()? {
            None => Ok(TaskPrompt::Canceled),
            Some(line) => match line.trim() {
                ":cancel" => Ok(TaskPrompt::Canceled),
                ":paste" => Ok(TaskPrompt::PasteFromClipboard),
                ":attach" => Ok(TaskPrompt::AttachFile),
                _ => {
                    let mut text = String::new();
                    if !prefill.is_empty() {
                        text.push_str(prefill);
                        text.push('\n');
                    }
                    text.push_str(&line);
                    Ok(TaskPrompt::Submitted(text))
                }
            },
        }
    }

    fn prompt_text(&self, message: &str, default: &str) -> anyhow::Result<Option<String>> {
        println!("{message}");
        if !default.is_empty() {
            println!("(default: {default})");
        }
        print!("> ");
        io::stdout().flush()?;

        match self.read_answer()? {
            None => Ok(None),
            Some(line) if line.is_empty() && !default.is_empty() => {
                Ok(Some(default.to_string()))
            }
            Some(line) => Ok(Some(line)),
        }
    }

    fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        print!("{message} [y/N] ");
        io::stdout().flush()?;
        Ok(self
            .read_answer()?
            .is_some_and(|line| matches!(line.trim(), "y" | "Y" | "yes")))
    }

    fn pick_file(&self, filters: &[FileFilter]) -> anyhow::Result<Option<PathBuf>> {
        let extensions: Vec<&str> = filters
            .iter()
            .flat_map(|filter| filter.extensions.iter().copied())
            .collect();
        println!("File path ({}), empty cancels:", extensions.join(", "));
        print!("> ");
        io::stdout().flush()?;

        match self.read_answer()? {
            None => Ok(None),
            Some(line) if line.trim().is_empty() => Ok(None),
            Some(line) => Ok(Some(PathBuf::from(line.trim()))),
        }
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        println!("! {message}");
    }
}
