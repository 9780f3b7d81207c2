use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPrompt {
    Submitted(String),
    PasteFromClipboard,
    AttachFile,
    Canceled,
}

#[derive(Debug, Clone, Copy)]
pub struct FileFilter {
    pub label: &'static str,
    pub extensions: &'static [&'static str],
}

pub const ATTACHMENT_FILTERS: &[FileFilter] = &[
    FileFilter {
        label: "Images",
        extensions: &["png", "jpg", "jpeg"],
    },
    FileFilter {
        label: "Audio",
        extensions: &["m4a", "mp3"],
    },
];

// Every method blocks until the user answers; cancellation is an outcome,
// never an error.
pub trait DialogProvider: Send + Sync {
    fn prompt_task(&self, message: &str, prefill: &str) -> anyhow::Result<TaskPrompt>;

    fn prompt_text(&self, message: &str, default: &str) -> anyhow::Result<Option<String>>;

    fn confirm(&self, message: &str) -> anyhow::Result<bool>;

    fn pick_file(&self, filters: &[FileFilter]) -> anyhow::Result<Option<PathBuf>>;

    fn info(&self, message: &str);

    fn error(&self, message: &str);
}
