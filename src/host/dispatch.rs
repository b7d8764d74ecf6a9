//! Channel-backed dispatch queue.
//!
//! Network tasks push actions through a [`Dispatcher`]; the application runs
//! them from a single [`DispatchQueue`], either by pumping it once per frame
//! with [`DispatchQueue::drain`] or by awaiting [`DispatchQueue::run`].

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::{Action, Enqueuer};

/// Create a connected dispatcher/queue pair.
pub fn dispatcher() -> (Dispatcher, DispatchQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Dispatcher { tx }, DispatchQueue { rx })
}

/// Sending half of the dispatch queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
}

impl Enqueuer for Dispatcher {
    fn enqueue(&self, action: Action) {
        if self.tx.send(action).is_err() {
            debug!("dispatch queue dropped, discarding action");
        }
    }
}

/// Receiving half of the dispatch queue.
///
/// Whoever owns this is the application's serialization context.
#[derive(Debug)]
pub struct DispatchQueue {
    rx: mpsc::UnboundedReceiver<Action>,
}

impl DispatchQueue {
    /// Run every action currently queued, including ones enqueued while draining.
    ///
    /// Returns the number of actions run.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(action) = self.rx.try_recv() {
            action();
            ran += 1;
        }
        ran
    }

    /// Wait for the next action and run it.
    ///
    /// Returns `false` once every [`Dispatcher`] has been dropped and the queue
    /// is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Run actions until every [`Dispatcher`] has been dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
        debug!("dispatch queue finished");
    }
}
