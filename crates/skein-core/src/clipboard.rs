use std::io::Cursor;
use std::path::PathBuf;

use base64::Engine as _;
use tracing::{debug, warn};

use crate::attach::AttachmentStore;
use crate::config::expand_tilde;
use crate::error::{Error, Result};
use crate::task::AttachmentKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Attachment { path: PathBuf, kind: AttachmentKind },
    Prefill(String),
    Empty,
}

#[derive(Debug, Clone)]
pub struct ClipboardResolver {
    attachments: AttachmentStore,
}

impl ClipboardResolver {
    pub fn new(attachments: AttachmentStore) -> Self {
        Self { attachments }
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve(&self) -> Resolution {
        if let Some(path) = self.grab_raw_image() {
            return Resolution::Attachment {
                path,
                kind: AttachmentKind::Image,
            };
        }

        let Some(text) = read_clipboard_text() else {
            return Resolution::Empty;
        };
        let text = text.trim();
        if text.is_empty() {
            return Resolution::Empty;
        }

        self.resolve_text(text)
    }

    // Raw image extraction is best-effort; a missing capability is not an error.
    fn grab_raw_image(&self) -> Option<PathBuf> {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(err) => {
                debug!(%err, "clipboard unavailable");
                return None;
            }
        };

        let raw = match clipboard.get_image() {
            Ok(raw) => raw,
            Err(arboard::Error::ContentNotAvailable) => return None,
            Err(err) => {
                debug!(%err, "clipboard image read failed");
                return None;
            }
        };

        let bytes = match encode_png(&raw) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "could not encode the clipboard image");
                return None;
            }
        };

        match self.attachments.write_bytes("clipboard", "png", &bytes) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(%err, "could not store the clipboard image");
                None
            }
        }
    }

    pub(crate) fn resolve_text(&self, text: &str) -> Resolution {
        if text
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
        {
            return match self.decode_data_uri(text) {
                Some((path, kind)) => Resolution::Attachment { path, kind },
                None => Resolution::Prefill(text.to_string()),
            };
        }

        if looks_like_path(text) {
            let source = expand_tilde(std::path::Path::new(text));
            if source.is_file() {
                match self.attachments.copy_into_store(&source) {
                    Ok((path, kind)) => return Resolution::Attachment { path, kind },
                    Err(err) => {
                        warn!(
                            %err,
                            source = %source.display(),
                            "clipboard path copy failed; keeping the text"
                        );
                        return Resolution::Prefill(text.to_string());
                    }
                }
            }
        }

        Resolution::Prefill(text.to_string())
    }

    fn decode_data_uri(&self, uri: &str) -> Option<(PathBuf, AttachmentKind)> {
        let (meta, payload) = uri.split_once(',')?;
        if !meta.to_ascii_lowercase().contains(";base64") {
            debug!("data uri without a base64 payload");
            return None;
        }

        let media = meta.get(5..).unwrap_or_default();
        let media = media.split(';').next().unwrap_or_default();
        let (ext, kind) = media_kind(media)?;

        let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(err) => {
                debug!(%err, "base64 decode failed");
                return None;
            }
        };

        match self.attachments.write_bytes("clipboard", ext, &bytes) {
            Ok(path) => Some((path, kind)),
            Err(err) => {
                warn!(%err, "could not store the decoded clipboard payload");
                None
            }
        }
    }
}

fn media_kind(media: &str) -> Option<(&'static str, AttachmentKind)> {
    let media = media.to_ascii_lowercase();
    if media.starts_with("image/png") {
        return Some(("png", AttachmentKind::Image));
    }
    if media.starts_with("image/jpeg") {
        return Some(("jpg", AttachmentKind::Image));
    }
    if media.starts_with("audio/mpeg") {
        return Some(("mp3", AttachmentKind::Audio));
    }
    if media.starts_with("audio/mp4") || media.starts_with("audio/x-m4a") {
        return Some(("m4a", AttachmentKind::Audio));
    }
    None
}

pub(crate) fn looks_like_path(text: &str) -> bool {
    if cfg!(windows) {
        let bytes = text.as_bytes();
        let drive = bytes.len() > 2
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/');
        drive || text.starts_with("\\\\")
    } else {
        text.starts_with('/')
            || text.starts_with("./")
            || text.starts_with("../")
            || text.starts_with('~')
    }
}

fn read_clipboard_text() -> Option<String> {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(err) => {
            debug!(%err, "clipboard unavailable");
            return None;
        }
    };
    match clipboard.get_text() {
        Ok(text) => Some(text),
        Err(arboard::Error::ContentNotAvailable) => None,
        Err(err) => {
            debug!(%err, "clipboard text read failed");
            None
        }
    }
}

fn encode_png(raw: &arboard::ImageData<'_>) -> Result<Vec<u8>> {
    let width = raw.width as u32;
    let height = raw.height as u32;

    let buffer: image::ImageBuffer<image::Rgba<u8>, Vec<u8>> =
        image::ImageBuffer::from_raw(width, height, raw.bytes.to_vec()).ok_or_else(|| {
            Error::Attachment("clipboard image buffer has an unexpected size".to_string())
        })?;

    let mut bytes = Cursor::new(Vec::new());
    buffer
        .write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|err| Error::Attachment(err.to_string()))?;
    Ok(bytes.into_inner())
}
