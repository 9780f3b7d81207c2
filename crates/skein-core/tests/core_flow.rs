use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use skein_core::attach::{AttachmentStore, kind_for_extension};
use skein_core::commands::{self, MenuEvent};
use skein_core::datastore::QueueStore;
use skein_core::dialog::{DialogProvider, FileFilter, TaskPrompt};
use skein_core::error::Error;
use skein_core::task::{AttachmentKind, Task};
use tempfile::tempdir;

fn task(text: &str) -> Task {
    Task::new(text.to_string(), Utc::now())
}

fn texts(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|task| task.text.clone()).collect()
}

#[test]
fn enqueue_peek_skip_complete_flow() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");

    assert!(store.peek().is_none());

    store.enqueue(task("A")).expect("enqueue A");
    assert_eq!(store.peek().expect("peek").text, "A");

    store.enqueue(task("B")).expect("enqueue B");
    assert_eq!(texts(&store.tasks()), ["A", "B"]);

    store.skip().expect("skip");
    assert_eq!(texts(&store.tasks()), ["B", "A"]);

    let done = store.complete().expect("complete");
    assert_eq!(done.text, "B");
    assert_eq!(texts(&store.tasks()), ["A"]);
}

#[test]
fn queue_survives_reopen() {
    let temp = tempdir().expect("tempdir");

    let store = QueueStore::open(temp.path()).expect("open store");
    let with_audio = task("call the bank")
        .with_attachment(temp.path().join("attachments/memo.m4a"), AttachmentKind::Audio);
    store.enqueue(task("plain")).expect("enqueue");
    store.enqueue(with_audio).expect("enqueue");
    let before = store.tasks();
    drop(store);

    let reopened = QueueStore::open(temp.path()).expect("reopen store");
    assert_eq!(reopened.tasks(), before);
}

#[test]
fn missing_document_is_an_empty_queue() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");
    assert!(store.is_empty());
}

#[test]
fn malformed_document_is_a_format_error() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("queue.json"), "{not json").expect("write garbage");

    match QueueStore::open(temp.path()) {
        Err(Error::Format(_)) => {}
        other => panic!("expected a format error, got {other:?}"),
    }
}

#[test]
fn skip_is_a_noop_for_short_queues() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");

    store.skip().expect("skip empty");
    assert!(store.is_empty());

    store.enqueue(task("only")).expect("enqueue");
    store.skip().expect("skip single");
    assert_eq!(texts(&store.tasks()), ["only"]);
}

#[test]
fn complete_on_empty_fails_without_writing() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");

    match store.complete() {
        Err(Error::EmptyQueue) => {}
        other => panic!("expected the empty-queue error, got {other:?}"),
    }
    assert!(!store.path().exists(), "no write may be attempted");
}

#[test]
fn move_relocates_and_preserves_relative_order() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");
    for text in ["A", "B", "C"] {
        store.enqueue(task(text)).expect("enqueue");
    }

    store.move_task(2, 0).expect("move 2 -> 0");
    assert_eq!(texts(&store.tasks()), ["C", "A", "B"]);

    store.move_task(0, 0).expect("move 0 -> 0");
    assert_eq!(texts(&store.tasks()), ["C", "A", "B"]);

    store.move_task(0, 2).expect("move 0 -> 2");
    assert_eq!(texts(&store.tasks()), ["A", "B", "C"]);

    match store.move_task(3, 0) {
        Err(Error::IndexOutOfRange { from: 3, to: 0, len: 3 }) => {}
        other => panic!("expected an index error, got {other:?}"),
    }
    assert_eq!(texts(&store.tasks()), ["A", "B", "C"]);

    let reopened = QueueStore::open(temp.path()).expect("reopen store");
    assert_eq!(texts(&reopened.tasks()), ["A", "B", "C"]);
}

#[test]
fn move_on_an_empty_queue_rejects_every_index() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");

    match store.move_task(0, 0) {
        Err(Error::IndexOutOfRange { len: 0, .. }) => {}
        other => panic!("expected an index error, got {other:?}"),
    }
}

#[test]
fn failed_save_rolls_back_memory() {
    let temp = tempdir().expect("tempdir");
    let store = QueueStore::open(temp.path()).expect("open store");
    store.enqueue(task("kept")).expect("enqueue");

    // A directory squatting on the queue path makes the rename fail.
    fs::remove_file(store.path()).expect("remove document");
    fs::create_dir(store.path()).expect("squat on the path");

    assert!(store.enqueue(task("lost")).is_err());
    assert_eq!(texts(&store.tasks()), ["kept"]);

    assert!(store.complete().is_err());
    assert_eq!(texts(&store.tasks()), ["kept"]);

    // Once the obstacle is gone the queue is usable again.
    fs::remove_dir(store.path()).expect("unblock the path");
    store.enqueue(task("second")).expect("enqueue after recovery");
    assert_eq!(texts(&store.tasks()), ["kept", "second"]);

    let reopened = QueueStore::open(temp.path()).expect("reopen store");
    assert_eq!(texts(&reopened.tasks()), ["kept", "second"]);
}

#[test]
fn attachment_copy_is_byte_identical_and_independent() {
    let temp = tempdir().expect("tempdir");
    let attachments = AttachmentStore::open(temp.path()).expect("open attachments");

    let source = temp.path().join("shot.png");
    fs::write(&source, b"\x89PNG fake pixels").expect("write source");

    let (copy, kind) = attachments.copy_into_store(&source).expect("copy");
    assert_eq!(kind, AttachmentKind::Image);
    assert_eq!(
        fs::read(&copy).expect("read copy"),
        fs::read(&source).expect("read source")
    );
    assert!(copy.starts_with(attachments.dir()));

    fs::remove_file(&source).expect("delete source");
    assert_eq!(fs::read(&copy).expect("read copy again"), b"\x89PNG fake pixels");
}

#[test]
fn attachment_names_never_collide() {
    let temp = tempdir().expect("tempdir");
    let attachments = AttachmentStore::open(temp.path()).expect("open attachments");

    let source = temp.path().join("voice.mp3");
    fs::write(&source, b"audio").expect("write source");

    let (first, kind) = attachments.copy_into_store(&source).expect("first copy");
    assert_eq!(kind, AttachmentKind::Audio);
    let (second, _) = attachments.copy_into_store(&source).expect("second copy");

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
}

#[test]
fn extension_table_covers_both_ingestion_paths() {
    for ext in ["png", "PNG", "jpg", "jpeg"] {
        assert_eq!(kind_for_extension(ext), AttachmentKind::Image, "{ext}");
    }
    for ext in ["m4a", "mp3", "MP3"] {
        assert_eq!(kind_for_extension(ext), AttachmentKind::Audio, "{ext}");
    }
    for ext in ["txt", "pdf", ""] {
        assert_eq!(kind_for_extension(ext), AttachmentKind::None, "{ext}");
    }
}

#[test]
fn concurrent_enqueue_and_complete_linearize() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(QueueStore::open(temp.path()).expect("open store"));

    let enqueuer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.enqueue(task("X")))
    };
    let completer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.complete())
    };

    enqueuer.join().expect("join enqueuer").expect("enqueue");
    let completed = completer.join().expect("join completer");

    // Exactly the two serial orders are possible.
    match completed {
        Ok(done) => {
            assert_eq!(done.text, "X");
            assert!(store.is_empty());
        }
        Err(Error::EmptyQueue) => {
            assert_eq!(texts(&store.tasks()), ["X"]);
        }
        Err(other) => panic!("unexpected error: {other:?}"),
    }

    let reopened = QueueStore::open(temp.path()).expect("reopen store");
    assert_eq!(reopened.tasks(), store.tasks());
}

#[test]
fn concurrent_enqueues_lose_nothing() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(QueueStore::open(temp.path()).expect("open store"));

    let writers: Vec<_> = (0..2)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..25 {
                    store.enqueue(task(&format!("{w}-{n}"))).expect("enqueue");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("join writer");
    }

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 50);
    let ids: HashSet<_> = tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids.len(), 50);

    let reopened = QueueStore::open(temp.path()).expect("reopen store");
    assert_eq!(reopened.tasks().len(), 50);
}

struct ScriptedDialogs {
    prompts: Mutex<VecDeque<TaskPrompt>>,
    confirms: Mutex<VecDeque<bool>>,
    notices: Mutex<Vec<String>>,
}

impl ScriptedDialogs {
    fn new(prompts: Vec<TaskPrompt>, confirms: Vec<bool>) -> Self {
        Self {
            prompts: Mutex::new(prompts.into()),
            confirms: Mutex::new(confirms.into()),
            notices: Mutex::new(Vec::new()),
        }
    }
}

impl DialogProvider for ScriptedDialogs {
    fn prompt_task(&self, _message: &str, _prefill: &str) -> anyhow::Result<TaskPrompt> {
        Ok(self
            .prompts
            .lock()
            .expect("lock prompts")
            .pop_front()
            .unwrap_or(TaskPrompt::Canceled))
    }

    fn prompt_text(&self, _message: &str, _default: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn confirm(&self, _message: &str) -> anyhow::Result<bool> {
        Ok(self
            .confirms
            .lock()
            .expect("lock confirms")
            .pop_front()
            .unwrap_or(false))
    }

    fn pick_file(&self, _filters: &[FileFilter]) -> anyhow::Result<Option<PathBuf>> {
        Ok(None)
    }

    fn info(&self, message: &str) {
        self.notices
            .lock()
            .expect("lock notices")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.notices
            .lock()
            .expect("lock notices")
            .push(format!("error: {message}"));
    }
}

#[test]
fn menu_events_drive_the_store_through_the_dispatcher() {
    let temp = tempdir().expect("tempdir");
    let dialogs = Arc::new(ScriptedDialogs::new(
        vec![
            TaskPrompt::Submitted("first".to_string()),
            TaskPrompt::Submitted("second".to_string()),
        ],
        vec![true],
    ));

    let (ctx, ui_loop) =
        skein_core::bootstrap(temp.path(), 60, dialogs.clone()).expect("bootstrap");

    let (event_tx, event_rx) = mpsc::channel();
    let loop_ctx = ctx.clone();
    let events_thread = thread::spawn(move || commands::run_event_loop(loop_ctx, event_rx));

    for event in [
        MenuEvent::AddTask,
        MenuEvent::AddTask,
        MenuEvent::Skip,
        MenuEvent::Complete,
        MenuEvent::Quit,
    ] {
        event_tx.send(event).expect("send event");
    }

    // Drains every queued handler, then exits on the quit-induced close.
    ui_loop.run();
    events_thread.join().expect("join event loop");

    assert_eq!(texts(&ctx.store.tasks()), ["first"]);

    let notices = dialogs.notices.lock().expect("lock notices");
    assert_eq!(
        notices
            .iter()
            .filter(|notice| notice.as_str() == "Task added")
            .count(),
        2
    );

    // The dispatcher stays closed after shutdown.
    assert!(!ctx.dispatcher.submit(|| {}));
}
