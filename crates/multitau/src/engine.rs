//! Drives the per-frame multi-tau update.
//!
//! For every frame, [`MultiTauCorrelator::ingest`]:
//! 1. reduces the frame with the [`RoiIndex`],
//! 2. pushes the reduced values into level 0 of the [`LevelPyramid`] (which
//!    may cascade averaged values into coarser levels),
//! 3. correlates the newest value of every level that received a value
//!    against the older values of that level.
//!
//! A level that holds `n` values can only measure bins `< n`. Cells whose
//! lag exceeds the number of values seen so far stay undefined (`NaN`).

use multitau_nostd_internal::{LagSchedule, MAX_LEVELS, PairDatum};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis, s};
use tracing::{debug, warn};

use crate::{
    Error, accumulator::CorrelationAccumulator, checkpoint::InternalState, pyramid::LevelPyramid,
    roi::Reduction, roi::RoiIndex,
};

/// The snapshot of a calculation after some number of frames
#[derive(Clone, Debug)]
pub struct CorrelationResult {
    /// the normalized correlation, shape `[n_channels, n_rois]`
    pub g2: Array2<f64>,
    /// the lag (in frames) of every channel
    pub lag_steps: Array1<u64>,
    /// can be used to resume the calculation
    pub internal_state: InternalState,
}

/// Configures and constructs a [`MultiTauCorrelator`].
///
/// A label map must always be provided. Every other setting has a default:
/// 6 levels, 4 buffers per level and [`Reduction::RoiMean`].
///
/// ```
/// use multitau::CorrelatorBuilder;
/// use ndarray::Array2;
///
/// let labels = Array2::<u64>::ones((8, 8));
/// let correlator = CorrelatorBuilder::new()
///     .num_levels(3)
///     .num_bufs(4)
///     .labels(labels.view())
///     .build()
///     .unwrap();
/// assert_eq!(correlator.lag_steps().to_vec(), vec![0, 1, 2, 3, 4, 6, 8, 12]);
/// ```
#[derive(Clone, Debug)]
pub struct CorrelatorBuilder<'a> {
    num_levels: usize,
    num_bufs: usize,
    labels: Option<ArrayView2<'a, u64>>,
    reduction: Reduction,
    internal_state: Option<InternalState>,
}

impl Default for CorrelatorBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CorrelatorBuilder<'a> {
    pub fn new() -> Self {
        CorrelatorBuilder {
            num_levels: 6,
            num_bufs: 4,
            labels: None,
            reduction: Reduction::default(),
            internal_state: None,
        }
    }

    pub fn num_levels(mut self, num_levels: usize) -> Self {
        self.num_levels = num_levels;
        self
    }

    /// the number of buffers per level (must be even)
    pub fn num_bufs(mut self, num_bufs: usize) -> Self {
        self.num_bufs = num_bufs;
        self
    }

    /// the label map. Every distinct nonzero label defines a ROI.
    pub fn labels(mut self, labels: ArrayView2<'a, u64>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    /// resume from a previously captured state
    pub fn internal_state(mut self, internal_state: InternalState) -> Self {
        self.internal_state = Some(internal_state);
        self
    }

    pub fn build(self) -> Result<MultiTauCorrelator, Error> {
        if self.num_levels == 0 || self.num_levels > MAX_LEVELS {
            return Err(Error::integer_range(
                "num_levels",
                self.num_levels as i64,
                1,
                MAX_LEVELS as i64,
            ));
        } else if self.num_bufs < 2 {
            return Err(Error::integer_range(
                "num_bufs",
                self.num_bufs as i64,
                2,
                i64::MAX,
            ));
        } else if self.num_bufs % 2 != 0 {
            return Err(Error::odd_buffer_count(self.num_bufs));
        }
        // the longest lag must fit in a u64
        let max_num_bufs = (1_u64 << (64 - self.num_levels)) - 1;
        let schedule = LagSchedule::new(self.num_levels, self.num_bufs).map_err(|_| {
            Error::integer_range(
                "num_bufs",
                self.num_bufs as i64,
                2,
                max_num_bufs.min(i64::MAX as u64) as i64,
            )
        })?;

        let labels = self.labels.ok_or_else(Error::missing_labels)?;
        let roi_index = RoiIndex::from_label_map(labels)?;
        let n_elements = roi_index.n_elements(self.reduction);

        let (pyramid, accumulator) = match self.internal_state {
            Some(state) => state.resume(schedule, self.reduction, &roi_index)?,
            None => (
                LevelPyramid::new(self.num_levels, self.num_bufs, n_elements)?,
                CorrelationAccumulator::new(schedule, roi_index.n_rois())?,
            ),
        };

        debug!(
            num_levels = self.num_levels,
            num_bufs = self.num_bufs,
            n_channels = schedule.n_channels(),
            n_rois = roi_index.n_rois(),
            reduction = ?self.reduction,
            frames_ingested = pyramid.frames_ingested(),
            "built a multi-tau correlator"
        );

        Ok(MultiTauCorrelator {
            schedule,
            reduction: self.reduction,
            roi_index,
            pyramid,
            accumulator,
            scratch: vec![0.0; n_elements],
        })
    }
}

/// package the values of a single ROI as a [`PairDatum`].
///
/// When the ROI is represented by several values (one per pixel), the
/// product is formed pixel by pixel before averaging. For a single value,
/// this reduces to [`PairDatum::from_pair`].
fn roi_pair_datum(past: ArrayView1<f64>, future: ArrayView1<f64>) -> PairDatum {
    if past.len() == 1 {
        return PairDatum::from_pair(past[0], future[0]);
    }
    let n = past.len() as f64;
    PairDatum {
        past: past.sum() / n,
        future: future.sum() / n,
        product: past.dot(&future) / n,
    }
}

/// The streaming multi-tau autocorrelation engine.
///
/// Ingestion requires `&mut self`, so a single calculation can never be fed
/// from 2 places at once. Use [`Self::internal_state`] and
/// [`CorrelatorBuilder::internal_state`] to continue a calculation
/// elsewhere.
#[derive(Clone, Debug)]
pub struct MultiTauCorrelator {
    schedule: LagSchedule,
    reduction: Reduction,
    roi_index: RoiIndex,
    pyramid: LevelPyramid,
    accumulator: CorrelationAccumulator,
    /// holds the reduced version of the current frame
    scratch: Vec<f64>,
}

impl MultiTauCorrelator {
    pub fn num_levels(&self) -> usize {
        self.schedule.num_levels()
    }

    pub fn num_bufs(&self) -> usize {
        self.schedule.num_bufs()
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// the ROI labels, in ascending order. Column `r` of [`Self::g2`] holds
    /// the values of the ROI labelled `self.labels()[r]`.
    pub fn labels(&self) -> &[u64] {
        self.roi_index.labels()
    }

    pub fn frames_ingested(&self) -> u64 {
        self.pyramid.frames_ingested()
    }

    /// update the calculation with the next frame.
    ///
    /// A frame whose shape doesn't match the label map is rejected before
    /// anything is modified.
    pub fn ingest<T>(&mut self, frame: ArrayView2<T>) -> Result<(), Error>
    where
        T: Copy + Into<f64>,
    {
        self.roi_index
            .reduce_into(frame, self.reduction, &mut self.scratch)?;
        if self.scratch.iter().any(|v| !v.is_finite()) {
            warn!(
                frame = self.frames_ingested(),
                "the frame holds non-finite values. The affected pairs will be skipped"
            );
        }

        let levels = self.pyramid.push(0, &self.scratch)?;
        for level in levels {
            self.correlate_level(level);
        }
        Ok(())
    }

    /// update the calculation with every frame of `frames` (the outer axis
    /// enumerates the frames)
    pub fn ingest_batch<T>(&mut self, frames: ArrayView3<T>) -> Result<(), Error>
    where
        T: Copy + Into<f64>,
    {
        // check up front so that a bad batch is rejected as a whole
        self.roi_index.check_frame_shape(&frames.shape()[1..])?;
        for frame in frames.axis_iter(Axis(0)) {
            self.ingest(frame)?;
        }
        Ok(())
    }

    /// correlate the newest value of `level` against the values before it
    fn correlate_level(&mut self, level: usize) {
        let n_ingested = self.pyramid.n_ingested(level);
        let future = self.pyramid.newest(level);
        for bin in self.schedule.bin_range(level) {
            if (bin as u64) >= n_ingested {
                break;
            }
            let Some(channel) = self.schedule.channel_index(level, bin) else {
                continue;
            };
            let past = self.pyramid.slot(level, bin);
            for roi in 0..self.roi_index.n_rois() {
                let elements = self.roi_index.element_range(roi, self.reduction);
                let datum = roi_pair_datum(
                    past.slice(s![elements.clone()]),
                    future.slice(s![elements]),
                );
                if datum.is_finite() {
                    self.accumulator.consume(channel, roi, &datum);
                }
            }
        }
    }

    /// the normalized correlation, shape `[n_channels, n_rois]`.
    ///
    /// Cells that haven't received any frame pairs hold `NaN`.
    pub fn g2(&self) -> Array2<f64> {
        self.accumulator.finalize()
    }

    /// the number of frame pairs behind every entry of [`Self::g2`]
    pub fn counts(&self) -> Array2<u64> {
        self.accumulator.counts()
    }

    /// the lag (in frames) of every channel
    pub fn lag_steps(&self) -> Array1<u64> {
        self.schedule.lag_steps().collect()
    }

    pub fn accumulator(&self) -> &CorrelationAccumulator {
        &self.accumulator
    }

    pub fn internal_state(&self) -> InternalState {
        InternalState::capture(
            self.reduction,
            &self.roi_index,
            self.pyramid.clone(),
            &self.accumulator,
        )
    }

    /// consume the correlator, returning its state
    pub fn into_internal_state(self) -> InternalState {
        InternalState::capture(
            self.reduction,
            &self.roi_index,
            self.pyramid,
            &self.accumulator,
        )
    }

    /// bundle the current g2, lag steps & internal state
    pub fn result(&self) -> CorrelationResult {
        CorrelationResult {
            g2: self.g2(),
            lag_steps: self.lag_steps(),
            internal_state: self.internal_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, array};

    fn constant_frames(values: &[f64], shape: (usize, usize)) -> Array3<f64> {
        Array3::from_shape_fn((values.len(), shape.0, shape.1), |(i, _, _)| values[i])
    }

    #[test]
    fn builder_errors() {
        let labels = Array2::<u64>::ones((2, 2));
        let build = |levels: usize, bufs: usize| {
            CorrelatorBuilder::new()
                .num_levels(levels)
                .num_bufs(bufs)
                .labels(labels.view())
                .build()
        };
        assert!(build(0, 4).unwrap_err().is_configuration());
        assert!(build(MAX_LEVELS + 1, 4).is_err());
        assert!(build(3, 0).is_err());
        assert!(build(3, 5).unwrap_err().is_configuration());
        assert!(build(3, 4).is_ok());
        // the longest lag would overflow a u64
        assert!(build(MAX_LEVELS, 4).unwrap_err().is_configuration());

        let err = CorrelatorBuilder::new().build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn single_level_by_hand() {
        let labels = Array2::<u64>::ones((2, 3));
        let mut correlator = CorrelatorBuilder::new()
            .num_levels(1)
            .num_bufs(4)
            .labels(labels.view())
            .build()
            .unwrap();
        correlator
            .ingest_batch(constant_frames(&[1.0, 2.0, 3.0, 4.0, 5.0], (2, 3)).view())
            .unwrap();

        let g2 = correlator.g2();
        assert_eq!(g2.dim(), (4, 1));
        // lag 1 pairs: (1,2), (2,3), (3,4), (4,5)
        assert_eq!(g2[[1, 0]], 10.0 / 8.75);
        assert_eq!(correlator.counts().column(0).to_vec(), vec![5, 4, 3, 2]);
    }

    #[test]
    fn coarse_level_by_hand() {
        let labels = Array2::<u64>::ones((1, 2));
        let mut correlator = CorrelatorBuilder::new()
            .num_levels(2)
            .num_bufs(2)
            .labels(labels.view())
            .build()
            .unwrap();
        correlator
            .ingest_batch(constant_frames(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (1, 2)).view())
            .unwrap();

        assert_eq!(correlator.lag_steps().to_vec(), vec![0, 1, 2]);
        // level 1 holds 1.5, 3.5 & 5.5
        let g2 = correlator.g2();
        assert_eq!(g2[[2, 0]], 12.25 / 11.25);
        assert_eq!(correlator.counts()[[2, 0]], 2);
    }

    #[test]
    fn rejected_frame_leaves_state_untouched() {
        let labels = array![[1_u64, 2], [1, 2]];
        let mut correlator = CorrelatorBuilder::new()
            .num_levels(2)
            .num_bufs(2)
            .labels(labels.view())
            .build()
            .unwrap();
        correlator.ingest(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        let before = correlator.internal_state();

        let err = correlator.ingest(Array2::<f64>::ones((3, 2)).view()).unwrap_err();
        assert!(err.is_configuration());
        let err = correlator
            .ingest_batch(Array3::<f64>::ones((2, 2, 3)).view())
            .unwrap_err();
        assert!(err.is_configuration());

        assert_eq!(correlator.internal_state(), before);
        assert_eq!(correlator.frames_ingested(), 1);
    }

    #[test]
    fn pixel_resolved_single_pixel_rois_match_roi_mean() {
        let labels = array![[1_u64, 2, 0]];
        let frames = Array3::from_shape_fn((9, 1, 3), |(i, _, j)| (1 + i * (j + 1)) as f64);
        let mut g2s = Vec::new();
        for reduction in [Reduction::RoiMean, Reduction::PixelResolved] {
            let mut correlator = CorrelatorBuilder::new()
                .num_levels(3)
                .num_bufs(2)
                .labels(labels.view())
                .reduction(reduction)
                .build()
                .unwrap();
            correlator.ingest_batch(frames.view()).unwrap();
            assert_eq!(correlator.reduction(), reduction);
            g2s.push(correlator.g2());
        }
        assert_eq!(g2s[0], g2s[1]);
    }
}
