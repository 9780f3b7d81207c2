use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::task::Task;

#[derive(Debug)]
pub struct QueueStore {
    queue_path: PathBuf,
    tasks: Mutex<Vec<Task>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueueDocument {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct QueueDocumentRef<'a> {
    tasks: &'a [Task],
}

impl QueueStore {
    #[tracing::instrument(skip(base_dir))]
    pub fn open(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)?;
        let queue_path = base_dir.join("queue.json");
        let tasks = load_document(&queue_path)?;

        info!(
            queue = %queue_path.display(),
            count = tasks.len(),
            "opened queue store"
        );

        Ok(Self {
            queue_path,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn enqueue(&self, task: Task) -> Result<()> {
        let mut tasks = self.lock();
        let before = tasks.clone();
        tasks.push(task);
        self.commit(&mut tasks, before)?;
        debug!(count = tasks.len(), "task enqueued");
        Ok(())
    }

    pub fn peek(&self) -> Option<Task> {
        self.lock().first().cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[tracing::instrument(skip(self))]
    pub fn skip(&self) -> Result<()> {
        let mut tasks = self.lock();
        if tasks.len() <= 1 {
            debug!(count = tasks.len(), "skip is a no-op");
            return Ok(());
        }
        let before = tasks.clone();
        tasks.rotate_left(1);
        self.commit(&mut tasks, before)?;
        debug!("head moved to tail");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn complete(&self) -> Result<Task> {
        let mut tasks = self.lock();
        if tasks.is_empty() {
            return Err(Error::EmptyQueue);
        }
        let before = tasks.clone();
        let head = tasks.remove(0);
        self.commit(&mut tasks, before)?;
        info!(id = %head.id, remaining = tasks.len(), "task completed");
        Ok(head)
    }

    #[tracing::instrument(skip(self))]
    pub fn move_task(&self, from: usize, to: usize) -> Result<()> {
        let mut tasks = self.lock();
        let len = tasks.len();
        if from >= len || to >= len {
            return Err(Error::IndexOutOfRange { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        let before = tasks.clone();
        let task = tasks.remove(from);
        tasks.insert(to, task);
        self.commit(&mut tasks, before)?;
        debug!(from, to, "task moved");
        Ok(())
    }

    // Memory must never run ahead of disk past a returned error.
    fn commit(&self, tasks: &mut Vec<Task>, before: Vec<Task>) -> Result<()> {
        if let Err(err) = save_document(&self.queue_path, tasks) {
            *tasks = before;
            return Err(err);
        }
        Ok(())
    }
}

fn load_document(path: &Path) -> Result<Vec<Task>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(file = %path.display(), "no queue document yet");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let document: QueueDocument = serde_json::from_str(&raw)?;
    debug!(
        file = %path.display(),
        count = document.tasks.len(),
        "loaded queue document"
    );
    Ok(document.tasks)
}

fn save_document(path: &Path, tasks: &[Task]) -> Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving queue document atomically");

    let body = serde_json::to_vec_pretty(&QueueDocumentRef { tasks })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&body)?;
    temp.write_all(b"\n")?;
    temp.flush()?;

    temp.persist(path).map_err(|err| Error::Io(err.error))?;

    Ok(())
}
