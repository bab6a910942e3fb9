//! Worker thread and the one-way message channel it reports through.
//!
//! A run executes on its own thread and talks to the caller only through
//! a per-run channel: zero or more `Progress` messages, then exactly one
//! terminal `Result` or `Error`. The caller polls with `try_receive` and
//! never blocks, so its own loop stays responsive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::config::PreparedRun;
use crate::engine;
use crate::report::RunSummary;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Completed fraction of the run, 0 to 100.
    Progress(f64),
    Result(RunSummary),
    Error(String),
}

impl Message {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Message::Progress(_))
    }
}

#[derive(Clone)]
pub struct ProgressSender {
    tx: Sender<Message>,
}

impl ProgressSender {
    /// Never blocks. A consumer that went away is not an error for the worker.
    pub fn send(&self, msg: Message) {
        if self.tx.send(msg).is_err() {
            debug!("progress receiver dropped, message discarded");
        }
    }
}

pub struct ProgressReceiver {
    rx: Receiver<Message>,
}

impl ProgressReceiver {
    /// Next message in send order, or `None` if nothing is waiting.
    pub fn try_receive(&self) -> Option<Message> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Unbounded single-run channel.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Caller-side handle on a run executing in the background.
pub struct RunHandle {
    rx: ProgressReceiver,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Starts `run` on a new worker thread with a fresh channel.
pub fn spawn_run(run: PreparedRun) -> RunHandle {
    let (tx, rx) = channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();

    let handle = thread::spawn(move || {
        let PreparedRun { job, transform } = run;
        let mut report_progress = |pct: f64| tx.send(Message::Progress(pct));
        let result = engine::run(&job, transform.as_ref(), &mut report_progress, &cancel_flag);
        match result {
            Ok(stats) => tx.send(Message::Result(RunSummary::new(&job, &stats))),
            Err(e) => tx.send(Message::Error(e.to_string())),
        }
    });

    RunHandle { rx, cancel, worker: Some(handle) }
}

impl RunHandle {
    pub fn try_receive(&self) -> Option<Message> {
        self.rx.try_receive()
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Asks the worker to stop at the next record boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Polls every `interval` until the terminal message arrives, passing
    /// every message (terminal included) to `on_message`. A worker that
    /// exits without reporting is turned into an `Error`.
    pub fn poll_until_done<F>(mut self, interval: Duration, mut on_message: F) -> Message
    where
        F: FnMut(&Message),
    {
        loop {
            // sampled before draining, so messages sent right before exit are read
            let finished = self.is_finished();
            while let Some(msg) = self.try_receive() {
                on_message(&msg);
                if msg.is_terminal() {
                    self.join();
                    return msg;
                }
            }
            if finished {
                self.join();
                let msg = Message::Error("worker stopped without reporting a result".to_string());
                on_message(&msg);
                return msg;
            }
            thread::sleep(interval);
        }
    }

    fn join(&mut self) {
        if let Some(w) = self.worker.take() {
            if w.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        // an abandoned run stops at the next record instead of running on
        if !self.is_finished() {
            self.cancel();
        }
    }
}
