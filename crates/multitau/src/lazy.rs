use ndarray::ArrayView2;

use crate::{CorrelationResult, Error, MultiTauCorrelator};

/// An iterator that ingests one frame per step and yields the
/// [`CorrelationResult`] after that frame.
///
/// Iteration stops after the frames run out. After a frame is rejected, the
/// error is yielded and the iterator keeps going with the next frame (the
/// rejected frame has no effect on the calculation).
pub struct LazyMultiTau<I> {
    frames: I,
    correlator: MultiTauCorrelator,
}

/// lazily drive `correlator` with `frames`
///
/// To resume a calculation, build `correlator` from the `internal_state` of
/// the last [`CorrelationResult`] of an earlier run.
pub fn lazy_multi_tau<'a, I, T>(
    frames: I,
    correlator: MultiTauCorrelator,
) -> LazyMultiTau<I::IntoIter>
where
    I: IntoIterator<Item = ArrayView2<'a, T>>,
    T: Copy + Into<f64> + 'a,
{
    LazyMultiTau {
        frames: frames.into_iter(),
        correlator,
    }
}

impl<I> LazyMultiTau<I> {
    pub fn correlator(&self) -> &MultiTauCorrelator {
        &self.correlator
    }

    /// stop iterating and take back the correlator
    pub fn into_correlator(self) -> MultiTauCorrelator {
        self.correlator
    }
}

impl<'a, I, T> Iterator for LazyMultiTau<I>
where
    I: Iterator<Item = ArrayView2<'a, T>>,
    T: Copy + Into<f64> + 'a,
{
    type Item = Result<CorrelationResult, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        Some(
            self.correlator
                .ingest(frame)
                .map(|()| self.correlator.result()),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.frames.size_hint()
    }
}
