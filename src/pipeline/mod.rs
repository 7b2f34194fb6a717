//! Lazy, concurrently produced sequences.
//!
//! Every stage runs on its own thread and hands elements to its consumer
//! through a rendezvous channel, one at a time. A slow consumer therefore
//! stalls every producer upstream of it. A stage that fails sends a single
//! terminal `Err` item and stops; [`Stream`] keeps that error so the consumer
//! can tell a clean end from an aborted one.
//!
//! Dropping a [`Stream`] cancels its producer and joins it, so abandoning a
//! sequence half way releases whatever the producer held.

mod ops;
mod source;
mod zip;

pub use source::{ResourceGuard, bounded_source};
pub use zip::zip_fold;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::domain::error::TraderError;

type Item<T> = Result<T, TraderError>;

/// Producer half of a stage.
pub struct Sink<T> {
    tx: SyncSender<Item<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Sink<T> {
    /// Hands `value` to the consumer, blocking until it is taken.
    ///
    /// Returns `false` once the consumer has gone away; the producer should
    /// stop at that point.
    pub fn send(&self, value: T) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Ends the sequence with `err`.
    pub fn fail(self, err: TraderError) {
        let _ = self.tx.send(Err(err));
    }

    /// True once the consumer has dropped its [`Stream`].
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Consumer half of a stage: a blocking iterator over the produced elements.
pub struct Stream<T> {
    rx: Option<Receiver<Item<T>>>,
    producer: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    stage: &'static str,
    error: Option<TraderError>,
    done: bool,
}

impl<T: Send + 'static> Stream<T> {
    /// Runs `produce` on a new thread, feeding the returned stream.
    pub fn spawn<F>(stage: &'static str, produce: F) -> Self
    where
        F: FnOnce(Sink<T>) + Send + 'static,
    {
        let (tx, rx) = sync_channel(0);
        let cancelled = Arc::new(AtomicBool::new(false));
        let sink = Sink {
            tx,
            cancelled: Arc::clone(&cancelled),
        };

        let spawned = thread::Builder::new()
            .name(format!("stream-{stage}"))
            .spawn(move || produce(sink));

        match spawned {
            Ok(handle) => Stream {
                rx: Some(rx),
                producer: Some(handle),
                cancelled,
                stage,
                error: None,
                done: false,
            },
            Err(e) => {
                warn!(stage, error = %e, "failed to spawn producer");
                Stream::failed(stage, e.into())
            }
        }
    }

    /// A stream over an in-memory sequence.
    pub fn from_vec(values: Vec<T>) -> Self {
        Stream::spawn("vec", move |sink| {
            for value in values {
                if !sink.send(value) {
                    return;
                }
            }
        })
    }
}

impl<T> Stream<T> {
    /// A stream that is already over, ending with `err`.
    pub fn failed(stage: &'static str, err: TraderError) -> Self {
        Stream {
            rx: None,
            producer: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            stage,
            error: Some(err),
            done: true,
        }
    }

    /// The terminal error, if the sequence has ended on one.
    pub fn error(&self) -> Option<&TraderError> {
        self.error.as_ref()
    }

    /// Removes and returns the terminal error.
    pub fn take_error(&mut self) -> Option<TraderError> {
        self.error.take()
    }

    /// Drains whatever is left and reports how the sequence ended.
    pub fn finish(mut self) -> Result<(), TraderError> {
        while self.next().is_some() {}
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Collects every element, failing if the sequence was aborted.
    pub fn try_collect(mut self) -> Result<Vec<T>, TraderError> {
        let values: Vec<T> = self.by_ref().collect();
        self.finish()?;
        Ok(values)
    }

    fn join_producer(&mut self) {
        let Some(handle) = self.producer.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!(stage = self.stage, "producer panicked");
            if self.error.is_none() {
                self.error = Some(TraderError::ProducerPanicked {
                    stage: self.stage.to_string(),
                });
            }
        }
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        let received = self.rx.as_ref().map(|rx| rx.recv());
        match received {
            Some(Ok(Ok(value))) => Some(value),
            Some(Ok(Err(err))) => {
                debug!(stage = self.stage, error = %err, "sequence aborted");
                self.error = Some(err);
                self.done = true;
                self.join_producer();
                None
            }
            Some(Err(_)) | None => {
                self.done = true;
                self.join_producer();
                None
            }
        }
    }
}

impl<T> Drop for Stream<T> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        drop(self.rx.take());
        if let Some(handle) = self.producer.take() {
            if !self.done {
                debug!(stage = self.stage, "sequence abandoned before the end");
            }
            if handle.join().is_err() {
                warn!(stage = self.stage, "producer panicked during teardown");
            }
        }
    }
}
