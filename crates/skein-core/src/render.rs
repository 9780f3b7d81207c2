use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use pulldown_cmark::{Options, Parser, html};
use tracing::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::attach::nano_stamp;
use crate::error::Result;
use crate::task::Task;

const PAGE_STYLE: &str = "\
 body{font-family:-apple-system,Segoe UI,Roboto,Arial,sans-serif;line-height:1.5;padding:16px;max-width:800px;margin:0 auto}\n\
 img{max-width:100%;height:auto;border-radius:8px;border:1px solid #ddd}\n\
 pre,code{background:#f6f8fa}\n\
 audio{width:100%;margin:8px 0}";

#[derive(Debug, Clone)]
pub struct Renderer {
    base_dir: PathBuf,
    list_width: usize,
}

impl Renderer {
    pub fn new(base_dir: &Path, list_width: usize) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            list_width,
        }
    }

    #[tracing::instrument(skip(self, text))]
    pub fn render(&self, text: &str, audio: Option<&Path>) -> Result<PathBuf> {
        let mut source = text.to_string();
        if let Some(audio) = audio {
            let url = path_to_file_url(audio);
            if !source.contains(&url) && !source.contains(&*audio.to_string_lossy()) {
                source.push_str(&format!("\n\n<audio controls src=\"{url}\"></audio>\n"));
            }
        }

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let parser = Parser::new_ext(&source, options);
        let mut body = String::new();
        html::push_html(&mut body, parser);

        let page = format!(
            "<!doctype html>\n<html><head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n\
             <style>\n{PAGE_STYLE}\n</style>\n</head><body>{body}</body></html>\n"
        );

        let path = self.base_dir.join(format!("task_{}.html", nano_stamp()));
        fs::write(&path, page)?;
        debug!(file = %path.display(), "rendered task document");
        Ok(path)
    }

    pub fn queue_listing(&self, tasks: &[Task]) -> String {
        if tasks.is_empty() {
            return "(empty)".to_string();
        }

        let mut out = String::new();
        for (idx, task) in tasks.iter().enumerate() {
            out.push_str(&format!(
                "{:>2}. {} {}{}\n",
                idx + 1,
                task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                truncate_width(&task.text, self.list_width),
                task.attachment_type.marker(),
            ));
        }
        out
    }
}

pub fn path_to_file_url(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

fn truncate_width(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if UnicodeWidthStr::width(flat.as_str()) <= width {
        return flat;
    }

    let mut used = 0;
    let mut out = String::new();
    for ch in flat.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width.saturating_sub(1) {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::*;
    use crate::task::AttachmentKind;

    #[test]
    fn rendered_document_embeds_the_audio_player() {
        let temp = tempdir().expect("tempdir");
        let renderer = Renderer::new(temp.path(), 60);
        let audio = temp.path().join("memo.m4a");

        let page = renderer
            .render("# Listen\n\nsome notes", Some(&audio))
            .expect("render");
        let html = std::fs::read_to_string(page).expect("read page");

        assert!(html.contains("<h1>Listen</h1>"));
        assert!(html.contains("<audio controls"));
        assert!(html.contains(&path_to_file_url(&audio)));
    }

    #[test]
    fn audio_already_referenced_is_not_duplicated() {
        let temp = tempdir().expect("tempdir");
        let renderer = Renderer::new(temp.path(), 60);
        let audio = temp.path().join("memo.m4a");
        let text = format!("listen: {}", path_to_file_url(&audio));

        let page = renderer.render(&text, Some(&audio)).expect("render");
        let html = std::fs::read_to_string(page).expect("read page");

        assert_eq!(html.matches("<audio controls").count(), 0);
    }

    #[test]
    fn listing_numbers_truncates_and_marks_attachments() {
        let temp = tempdir().expect("tempdir");
        let renderer = Renderer::new(temp.path(), 12);
        let now = Utc::now();

        let short = Task::new("water plants".to_string(), now);
        let long = Task::new(
            "a very long description that should not fit the column".to_string(),
            now,
        )
        .with_attachment(temp.path().join("x.png"), AttachmentKind::Image);

        let listing = renderer.queue_listing(&[short, long]);
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" 1. "));
        assert!(lines[0].contains("water plants"));
        assert!(lines[1].starts_with(" 2. "));
        assert!(lines[1].contains('…'));
        assert!(lines[1].ends_with("[img]"));
    }

    #[test]
    fn empty_listing_has_a_placeholder() {
        let temp = tempdir().expect("tempdir");
        let renderer = Renderer::new(temp.path(), 60);
        assert_eq!(renderer.queue_listing(&[]), "(empty)");
    }
}
