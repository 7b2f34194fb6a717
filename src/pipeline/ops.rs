//! Element-wise operators. Each one runs as its own stage.

use std::collections::VecDeque;

use super::{Sink, Stream};
use crate::domain::error::TraderError;

/// Passes an upstream terminal error on as this stage's own.
fn forward_error<T, U>(upstream: &mut Stream<T>, sink: Sink<U>) {
    if let Some(err) = upstream.take_error() {
        sink.fail(err);
    }
}

impl<T: Send + 'static> Stream<T> {
    /// Applies `f` to every element, in order.
    pub fn map<U, F>(self, mut f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        let mut upstream = self;
        Stream::spawn("map", move |sink| {
            for value in upstream.by_ref() {
                if !sink.send(f(value)) {
                    return;
                }
            }
            forward_error(&mut upstream, sink);
        })
    }

    /// Keeps the elements matching `predicate`, in order.
    pub fn filter<P>(self, mut predicate: P) -> Stream<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        let mut upstream = self;
        Stream::spawn("filter", move |sink| {
            while let Some(value) = upstream.next() {
                if sink.is_cancelled() {
                    return;
                }
                if predicate(&value) && !sink.send(value) {
                    return;
                }
            }
            forward_error(&mut upstream, sink);
        })
    }

    /// Emits only the last `n` elements, once the upstream is exhausted.
    ///
    /// An aborted upstream emits nothing and forwards its error, since the
    /// buffered elements would not be the true tail.
    pub fn tail(self, n: usize) -> Stream<T> {
        let mut upstream = self;
        Stream::spawn("tail", move |sink| {
            let mut buffer = VecDeque::with_capacity(n);
            while let Some(value) = upstream.next() {
                if sink.is_cancelled() {
                    return;
                }
                if n == 0 {
                    continue;
                }
                if buffer.len() == n {
                    buffer.pop_front();
                }
                buffer.push_back(value);
            }
            if let Some(err) = upstream.take_error() {
                sink.fail(err);
                return;
            }
            for value in buffer {
                if !sink.send(value) {
                    return;
                }
            }
        })
    }

    /// The final element, if any.
    pub fn last_value(self) -> Result<Option<T>, TraderError> {
        let mut tail = self.tail(1);
        let value = tail.next();
        tail.finish()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(values: Vec<i32>) -> Stream<i32> {
        Stream::spawn("failing", move |sink: Sink<i32>| {
            for value in values {
                sink.send(value);
            }
            sink.fail(TraderError::CorruptRecord {
                index: 9,
                reason: "bad".into(),
            });
        })
    }

    #[test]
    fn map_transforms_in_order() {
        let out = Stream::from_vec(vec![1, 2, 3])
            .map(|v| v * 10)
            .try_collect()
            .unwrap();
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn filter_keeps_matching_in_order() {
        let out = Stream::from_vec(vec![5, 1, 8, 2, 9])
            .filter(|v| *v > 2)
            .try_collect()
            .unwrap();
        assert_eq!(out, vec![5, 8, 9]);
    }

    #[test]
    fn filter_forwards_upstream_error() {
        let mut out = failing(vec![1, 2, 3]).filter(|v| v % 2 == 1);
        let kept: Vec<i32> = out.by_ref().collect();
        assert_eq!(kept, vec![1, 3]);
        assert!(matches!(
            out.finish(),
            Err(TraderError::CorruptRecord { index: 9, .. })
        ));
    }

    #[test]
    fn tail_keeps_last_n() {
        let out = Stream::from_vec((1..=10).collect())
            .tail(3)
            .try_collect()
            .unwrap();
        assert_eq!(out, vec![8, 9, 10]);
    }

    #[test]
    fn tail_shorter_source_emits_everything() {
        let out = Stream::from_vec(vec![1, 2]).tail(5).try_collect().unwrap();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn tail_of_empty_is_empty() {
        let out = Stream::<i32>::from_vec(Vec::new())
            .tail(1)
            .try_collect()
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn tail_zero_drains_and_emits_nothing() {
        let out = Stream::from_vec(vec![1, 2, 3]).tail(0).try_collect().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn tail_of_aborted_source_fails() {
        let mut out = failing(vec![1, 2]).tail(1);
        assert_eq!(out.next(), None);
        assert!(out.error().is_some());
    }

    #[test]
    fn last_value() {
        assert_eq!(Stream::from_vec(vec![4, 5, 6]).last_value().unwrap(), Some(6));
        assert_eq!(Stream::<i32>::from_vec(Vec::new()).last_value().unwrap(), None);
    }

    #[test]
    fn chained_stages_abandoned_early() {
        let mut out = Stream::from_vec((0..10_000).collect::<Vec<u32>>())
            .map(|v| v + 1)
            .filter(|v| v % 2 == 0);
        assert_eq!(out.next(), Some(2));
        drop(out);
    }
}
