use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::task::AttachmentKind;

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    #[tracing::instrument(skip(base_dir))]
    pub fn open(base_dir: &Path) -> Result<Self> {
        let dir = base_dir.join("attachments");
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opened attachment store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[tracing::instrument(skip(self))]
    pub fn copy_into_store(&self, source: &Path) -> Result<(PathBuf, AttachmentKind)> {
        let basename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::Attachment(format!("source has no file name: {}", source.display()))
            })?;

        let dest = self.free_slot(&format!("{}_{basename}", nano_stamp()));
        fs::copy(source, &dest)?;
        let kind = kind_for_path(&dest);

        info!(
            source = %source.display(),
            dest = %dest.display(),
            ?kind,
            "copied attachment into store"
        );
        Ok((dest, kind))
    }

    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn write_bytes(&self, stem: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        if bytes.is_empty() {
            return Err(Error::Attachment(
                "refusing to store an empty payload".to_string(),
            ));
        }

        let dest = self.free_slot(&format!("{}_{stem}.{ext}", nano_stamp()));
        fs::write(&dest, bytes)?;
        info!(dest = %dest.display(), "stored attachment bytes");
        Ok(dest)
    }

    // Nanosecond stamps alone are not unique enough across ingestions.
    fn free_slot(&self, name: &str) -> PathBuf {
        let mut candidate = self.dir.join(name);
        let mut n = 1_u32;
        while candidate.exists() {
            candidate = self.dir.join(format!("{n}-{name}"));
            n += 1;
        }
        candidate
    }
}

pub fn kind_for_extension(ext: &str) -> AttachmentKind {
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" => AttachmentKind::Image,
        "m4a" | "mp3" => AttachmentKind::Audio,
        _ => AttachmentKind::None,
    }
}

pub fn kind_for_path(path: &Path) -> AttachmentKind {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    kind_for_extension(ext)
}

pub(crate) fn nano_stamp() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
