use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

type UiOp = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub struct UiDispatcher {
    tx: Arc<Mutex<Option<Sender<UiOp>>>>,
}

pub struct UiLoop {
    rx: Receiver<UiOp>,
}

pub fn ui_channel() -> (UiDispatcher, UiLoop) {
    let (tx, rx) = mpsc::channel();
    (
        UiDispatcher {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        UiLoop { rx },
    )
}

impl UiDispatcher {
    pub fn submit<F>(&self, op: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.send(Box::new(op)).is_ok(),
            None => {
                debug!("ui dispatcher already closed; operation dropped");
                false
            }
        }
    }

    pub fn close(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!("ui dispatcher closed");
        }
    }
}

impl UiLoop {
    // Runs each operation to completion, in submission order, until the
    // channel is closed and drained.
    pub fn run(self) {
        for op in self.rx.iter() {
            trace!("running ui operation");
            op();
        }
        debug!("ui loop drained");
    }
}
