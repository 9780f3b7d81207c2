use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    None,
    Image,
    Audio,
}

impl AttachmentKind {
    pub fn is_none(&self) -> bool {
        matches!(self, AttachmentKind::None)
    }

    pub fn marker(&self) -> &'static str {
        match self {
            AttachmentKind::None => "",
            AttachmentKind::Image => " [img]",
            AttachmentKind::Audio => " [audio]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,

    pub text: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "AttachmentKind::is_none")]
    pub attachment_type: AttachmentKind,
}

impl Task {
    pub fn new(text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            created_at: now,
            attachment_path: None,
            attachment_type: AttachmentKind::None,
        }
    }

    pub fn with_attachment(mut self, path: PathBuf, kind: AttachmentKind) -> Self {
        self.attachment_path = Some(path);
        self.attachment_type = kind;
        self
    }

    pub fn audio_path(&self) -> Option<&Path> {
        if self.attachment_type == AttachmentKind::Audio {
            self.attachment_path.as_deref()
        } else {
            None
        }
    }
}
