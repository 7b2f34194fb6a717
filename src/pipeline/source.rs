//! Sequences backed by a held resource (usually an open file).

use std::ops::{Deref, DerefMut};

use tracing::{debug, error};

use super::{Sink, Stream};
use crate::domain::error::TraderError;

/// Owns a resource for the lifetime of a producer and releases it on drop.
///
/// Release happens exactly once, whether the producer ran to the end, failed,
/// panicked or was cancelled by its consumer.
pub struct ResourceGuard<R> {
    resource: Option<R>,
    label: String,
}

impl<R> ResourceGuard<R> {
    pub fn new(label: impl Into<String>, resource: R) -> Self {
        let label = label.into();
        debug!(resource = %label, "acquired");
        ResourceGuard {
            resource: Some(resource),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<R> Deref for ResourceGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("resource is only taken in drop"),
        }
    }
}

impl<R> DerefMut for ResourceGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        match &mut self.resource {
            Some(resource) => resource,
            None => unreachable!("resource is only taken in drop"),
        }
    }
}

impl<R> Drop for ResourceGuard<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            drop(resource);
            debug!(resource = %self.label, "released");
        }
    }
}

/// Produces a sequence from `resource` on a background thread.
///
/// `produce` emits elements through the sink. Returning `Err` logs the failure
/// and ends the sequence with that error after the elements already sent. The
/// resource is released before the consumer observes the end of the sequence.
pub fn bounded_source<R, T, F>(
    stage: &'static str,
    label: impl Into<String>,
    resource: R,
    produce: F,
) -> Stream<T>
where
    R: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut R, &Sink<T>) -> Result<(), TraderError> + Send + 'static,
{
    let label = label.into();
    Stream::spawn(stage, move |sink| {
        let mut guard = ResourceGuard::new(label, resource);
        let outcome = produce(&mut *guard, &sink);
        let label = guard.label().to_string();
        drop(guard);
        if let Err(err) = outcome {
            error!(stage, resource = %label, error = %err, "production aborted");
            sink.fail(err);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        items: Vec<u32>,
        releases: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(items: Vec<u32>) -> (Tracked, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        (
            Tracked {
                items,
                releases: Arc::clone(&releases),
            },
            releases,
        )
    }

    fn drain_items(resource: &mut Tracked, sink: &Sink<u32>) -> Result<(), TraderError> {
        for &item in &resource.items {
            if !sink.send(item) {
                break;
            }
        }
        Ok(())
    }

    #[test]
    fn released_once_after_full_drain() {
        let (resource, releases) = tracked(vec![1, 2, 3]);
        let mut stream = bounded_source("test", "tracked", resource, drain_items);

        let values: Vec<u32> = stream.by_ref().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        drop(stream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_once_when_abandoned() {
        let (resource, releases) = tracked((0..1000).collect());
        let mut stream = bounded_source("test", "tracked", resource, drain_items);

        assert_eq!(stream.next(), Some(0));
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        drop(stream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_before_error_is_observed() {
        let (resource, releases) = tracked(vec![5]);
        let mut stream = bounded_source("test", "tracked", resource, |res: &mut Tracked, sink| {
            sink.send(res.items[0]);
            Err(TraderError::CorruptRecord {
                index: 1,
                reason: "truncated".into(),
            })
        });

        assert_eq!(stream.next(), Some(5));
        assert_eq!(stream.next(), None);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(matches!(
            stream.take_error(),
            Some(TraderError::CorruptRecord { index: 1, .. })
        ));
    }
}
