//! Single-consumer FIFO job queue.
//!
//! Jobs may be submitted before the consumer is started; they wait in the
//! channel. Stopping sends a halt sentinel behind the queued jobs and waits
//! a bounded time for the consumer to exit, after which it is detached.

use crate::error::ControlError;
use crossbeam_channel as cbc;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

enum Envelope<M> {
    Job(M),
    Halt,
}

struct Consumer {
    handle: JoinHandle<()>,
    /// Disconnects when the consumer thread exits.
    done: cbc::Receiver<()>,
}

type Handler<M> = Arc<dyn Fn(M) + Send + Sync>;

/// FIFO queue drained by one named worker thread.
pub struct QueueWorker<M: Send + 'static> {
    name: &'static str,
    tx: cbc::Sender<Envelope<M>>,
    rx: cbc::Receiver<Envelope<M>>,
    handler: Handler<M>,
    consumer: Mutex<Option<Consumer>>,
}

impl<M: Send + 'static> QueueWorker<M> {
    /// Create a stopped worker that runs `handler` for every job.
    pub fn new(name: &'static str, handler: impl Fn(M) + Send + Sync + 'static) -> Self {
        let (tx, rx) = cbc::unbounded();
        Self {
            name,
            tx,
            rx,
            handler: Arc::new(handler),
            consumer: Mutex::new(None),
        }
    }

    /// Queue a job.
    pub fn submit(&self, job: M) {
        // Both channel ends live in `self`, so the send cannot fail.
        let _ = self.tx.send(Envelope::Job(job));
    }

    /// Jobs waiting in the queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Whether the consumer thread is running.
    pub fn is_alive(&self) -> bool {
        self.consumer
            .lock()
            .as_ref()
            .is_some_and(|c| !c.handle.is_finished())
    }

    /// Start the consumer unless one is alive. Returns whether a thread was spawned.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Spawn` if the thread could not be created.
    pub fn start(&self) -> Result<bool, ControlError> {
        let mut consumer = self.consumer.lock();
        if consumer.as_ref().is_some_and(|c| !c.handle.is_finished()) {
            return Ok(false);
        }
        let (done_tx, done) = cbc::bounded::<()>(0);
        let rx = self.rx.clone();
        let handler = Arc::clone(&self.handler);
        let name = self.name;
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _done = done_tx;
                consume(name, rx, handler);
            })
            .map_err(|e| ControlError::Spawn(format!("{name}: {e}")))?;
        *consumer = Some(Consumer { handle, done });
        info!(worker = name, "Worker started");
        Ok(true)
    }

    /// Send the halt sentinel and wait up to `timeout` for the consumer.
    ///
    /// Returns `true` if the consumer exited (or none was running); `false`
    /// if it was detached still busy.
    pub fn stop(&self, timeout: Duration) -> bool {
        let Some(consumer) = self.consumer.lock().take() else {
            return true;
        };
        if consumer.handle.is_finished() {
            let _ = consumer.handle.join();
            return true;
        }
        let _ = self.tx.send(Envelope::Halt);
        match consumer.done.recv_timeout(timeout) {
            Err(cbc::RecvTimeoutError::Timeout) => {
                warn!(worker = self.name, ?timeout, "Worker did not stop in time, detaching");
                false
            }
            _ => {
                if consumer.handle.join().is_err() {
                    warn!(worker = self.name, "Worker thread panicked");
                }
                info!(worker = self.name, "Worker stopped");
                true
            }
        }
    }
}

fn consume<M>(name: &'static str, rx: cbc::Receiver<Envelope<M>>, handler: Handler<M>) {
    while let Ok(envelope) = rx.recv() {
        match envelope {
            Envelope::Job(job) => {
                if panic::catch_unwind(AssertUnwindSafe(|| handler(job))).is_err() {
                    error!(worker = name, "Job panicked, continuing with next job");
                }
            }
            Envelope::Halt => break,
        }
    }
}
