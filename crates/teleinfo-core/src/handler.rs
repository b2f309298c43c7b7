use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::dispatch::{
    DEFAULT_WORKERS, DispatchError, Dispatcher, EventKind, Observer, ObserverRegistry,
};
use crate::protocol::tic::{DecodeError, decode_frame};
use crate::source::{FrameSource, SerialFrameSource, SourceError};

/// Faults detected when constructing a [`Handler`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing exists at the configured stream path.
    #[error("stream path \"{}\" does not exist", .0.display())]
    NotFound(PathBuf),
}

/// Fatal faults terminating [`Handler::run`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Entry point of the pipeline: owns the stream path and the observer
/// registry, and drives the read -> decode -> dispatch loop.
///
/// One handler instance serves one stream. Observers are expected to be
/// registered before [`run`](Handler::run) starts; there is no
/// concurrent-registration guarantee.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use teleinfo_core::{EventKind, Handler, Observer, Record};
///
/// struct Printer;
///
/// impl Observer for Printer {
///     fn notify(&self, _event: EventKind, record: &Record) {
///         println!("{}", record.json());
///     }
/// }
///
/// let mut handler = Handler::new("/dev/ttyAMA0")?;
/// handler.register(Arc::new(Printer));
/// handler.run()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Handler {
    path: PathBuf,
    observers: ObserverRegistry,
    workers: usize,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("path", &self.path)
            .field("observers", &self.observers.len())
            .field("workers", &self.workers)
            .finish()
    }
}

impl Handler {
    /// Create a handler for the stream at `path`.
    ///
    /// The serial device is expected to be configured and exposed by
    /// the environment beforehand (e.g. `stty -F /dev/ttyAMA0 1200 sane
    /// evenp parenb cs7 -crtscts`). Existence is the only validation
    /// performed here; the stream is opened by [`run`](Handler::run).
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] when nothing exists at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        Ok(Self {
            path,
            observers: ObserverRegistry::new(),
            workers: DEFAULT_WORKERS,
        })
    }

    /// Append an observer; it will be notified for every record decoded
    /// once `run` starts. Registration order is the dispatch order.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        self.observers.register(observer);
    }

    /// Size the notification worker pool (defaults to
    /// [`DEFAULT_WORKERS`]).
    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers;
    }

    /// Path of the underlying stream.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the stream and run the pipeline forever.
    ///
    /// Never returns `Ok`: the loop only ends on a fatal fault (stream
    /// closed or failed, unrepresentable timestamp, notification pool
    /// gone). There is no retry or reconnection; restart the process
    /// instead.
    pub fn run(&self) -> Result<Infallible, RunError> {
        let source = SerialFrameSource::open(&self.path)?;
        self.run_with_source(source)
    }

    /// Run the pipeline over an arbitrary frame source.
    ///
    /// The loop is strictly sequential: frame boundaries are stateful
    /// and order-dependent, so reading must not be parallelized. Only
    /// notification execution happens off this thread.
    pub fn run_with_source<S: FrameSource>(&self, mut source: S) -> Result<Infallible, RunError> {
        if self.observers.is_empty() {
            log::warn!("no observers registered; records will be decoded and dropped");
        }
        let dispatcher = Dispatcher::new(self.workers);
        loop {
            let frame = source.next_frame()?;
            let record = decode_frame(&frame.payload, frame.timestamp)?;
            log::debug!(
                "decoded frame: {} groups at {}",
                record.fields().len(),
                record.date()
            );
            dispatcher.dispatch(EventKind::RecordReceived, &self.observers, record)?;
        }
    }
}
