use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender, unbounded};
use thiserror::Error;

use crate::Record;

use super::{EventKind, Observer, ObserverRegistry};

/// Default size of the notification worker pool.
pub const DEFAULT_WORKERS: usize = 4;

struct Notification {
    observer: Arc<dyn Observer>,
    record: Arc<Record>,
    event: EventKind,
}

/// Fan-out engine: a fixed pool of detached worker threads consuming an
/// unbounded notification queue.
///
/// `dispatch` never blocks and never waits for notifications to finish;
/// nothing joins the workers, including at process shutdown. The queue
/// is unbounded so the read loop is never back-pressured; under
/// sustained frame arrival with slow observers the queue grows instead.
pub struct Dispatcher {
    queue: Sender<Notification>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every worker thread has exited; the notification was dropped.
    #[error("notification workers are no longer running")]
    WorkersUnavailable,
}

impl Dispatcher {
    /// Spawn `workers` notification threads (at least one) sharing one
    /// queue. The threads are detached: they exit when the dispatcher
    /// is dropped and the queue drains.
    pub fn new(workers: usize) -> Self {
        let (queue, feed) = unbounded::<Notification>();
        for _ in 0..workers.max(1) {
            let feed = feed.clone();
            thread::spawn(move || run_worker(&feed));
        }
        Self { queue }
    }

    /// Enqueue one notification per registered observer, in
    /// registration order, and return immediately.
    ///
    /// Every registered observer is notified for every record; there is
    /// no completion signal and no ordering guarantee between the
    /// notifications' execution and the caller's continuation.
    ///
    /// # Errors
    /// Returns [`DispatchError::WorkersUnavailable`] when the whole
    /// pool is gone.
    pub fn dispatch(
        &self,
        event: EventKind,
        observers: &ObserverRegistry,
        record: Record,
    ) -> Result<(), DispatchError> {
        match event {
            EventKind::RecordReceived => {
                let record = Arc::new(record);
                for observer in observers.iter() {
                    let notification = Notification {
                        observer: Arc::clone(observer),
                        record: Arc::clone(&record),
                        event,
                    };
                    self.queue
                        .send(notification)
                        .map_err(|_| DispatchError::WorkersUnavailable)?;
                }
                Ok(())
            }
        }
    }
}

fn run_worker(feed: &Receiver<Notification>) {
    for notification in feed.iter() {
        let Notification {
            observer,
            record,
            event,
        } = notification;
        // Contain observer panics so one bad observer cannot shrink the
        // pool for the rest of the process lifetime.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(event, &record)));
        if outcome.is_err() {
            log::warn!("observer panicked while handling {event:?}; notification dropped");
        }
    }
}
