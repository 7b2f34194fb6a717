//! Positional paired reduction over two sequences.

use tracing::warn;

use super::Stream;
use crate::domain::error::TraderError;

/// Walks `left` and `right` in lockstep, feeding each pair to `reducer` and
/// emitting its result.
///
/// Element `i` of the output waits for element `i` of both inputs; nothing is
/// buffered beyond the pair in flight. Inputs must be the same length: when
/// one ends before the other, the pairs already reduced are kept and the
/// output ends with [`TraderError::LengthMismatch`]. An error from either
/// input ends the output with that error.
pub fn zip_fold<A, B, O, F>(
    stage: &'static str,
    left: Stream<A>,
    right: Stream<B>,
    mut reducer: F,
) -> Stream<O>
where
    A: Send + 'static,
    B: Send + 'static,
    O: Send + 'static,
    F: FnMut(A, B) -> O + Send + 'static,
{
    let mut left = left;
    let mut right = right;
    Stream::spawn(stage, move |sink| {
        let mut paired = 0usize;
        loop {
            if sink.is_cancelled() {
                return;
            }

            let Some(a) = left.next() else {
                if let Some(err) = left.take_error() {
                    sink.fail(err);
                } else if right.next().is_some() {
                    warn!(stage, paired, "left input ended first");
                    sink.fail(TraderError::LengthMismatch {
                        paired,
                        shorter: "left".into(),
                    });
                } else if let Some(err) = right.take_error() {
                    sink.fail(err);
                }
                return;
            };

            let Some(b) = right.next() else {
                match right.take_error() {
                    Some(err) => sink.fail(err),
                    None => {
                        warn!(stage, paired, "right input ended first");
                        sink.fail(TraderError::LengthMismatch {
                            paired,
                            shorter: "right".into(),
                        });
                    }
                }
                return;
            };

            if !sink.send(reducer(a, b)) {
                return;
            }
            paired += 1;
        }
    })
}
