use multitau_nostd_internal::LagSchedule;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, accumulator::CorrelationAccumulator, pyramid::LevelPyramid, roi::Reduction,
    roi::RoiIndex,
};

/// A snapshot of everything that affects the future results of a
/// [`crate::MultiTauCorrelator`].
///
/// The snapshot is opaque. It can be cloned, compared and (de)serialized with
/// serde, and it can be fed back into [`crate::CorrelatorBuilder::internal_state`]
/// to resume a calculation. Resuming from the state captured after frames
/// `[0, k)` and then ingesting frames `[k, n)` gives results that are
/// bitwise identical to ingesting frames `[0, n)` in a single pass.
///
/// The frame shape, the ROI labels and the pixels of every ROI are recorded
/// as a fingerprint of the label map. A state can only be resumed by a
/// correlator with the same configuration and the same ROI geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalState {
    num_levels: usize,
    num_bufs: usize,
    reduction: Reduction,
    frame_shape: [usize; 2],
    labels: Vec<u64>,
    pixel_counts: Vec<usize>,
    /// flat pixel indices, grouped by ROI
    pixel_indices: Vec<usize>,
    pyramid: LevelPyramid,
    accum_statepack: Vec<f64>,
}

impl InternalState {
    pub(crate) fn capture(
        reduction: Reduction,
        roi_index: &RoiIndex,
        pyramid: LevelPyramid,
        accumulator: &CorrelationAccumulator,
    ) -> Self {
        let schedule = accumulator.schedule();
        debug!(
            frames_ingested = pyramid.frames_ingested(),
            n_rois = roi_index.n_rois(),
            "exporting the internal state"
        );
        Self {
            num_levels: schedule.num_levels(),
            num_bufs: schedule.num_bufs(),
            reduction,
            frame_shape: roi_index.shape(),
            labels: roi_index.labels().to_vec(),
            pixel_counts: roi_index.pixel_counts(),
            pixel_indices: roi_index.all_pixel_indices().to_vec(),
            pyramid,
            accum_statepack: accumulator.raw_statepack().to_vec(),
        }
    }

    /// the number of frames that were ingested before the state was captured
    pub fn frames_ingested(&self) -> u64 {
        self.pyramid.frames_ingested()
    }

    /// the labels of the ROIs tracked by the state, in ascending order
    pub fn labels(&self) -> &[u64] {
        &self.labels
    }

    /// check the state against the configuration of a correlator and, if
    /// they match, hand back the pieces needed to resume.
    pub(crate) fn resume(
        self,
        schedule: LagSchedule,
        reduction: Reduction,
        roi_index: &RoiIndex,
    ) -> Result<(LevelPyramid, CorrelationAccumulator), Error> {
        if (self.num_levels, self.num_bufs) != (schedule.num_levels(), schedule.num_bufs()) {
            return Err(Error::state_corruption(format!(
                "the state has num_levels={} & num_bufs={}, but the correlator \
                 has num_levels={} & num_bufs={}",
                self.num_levels,
                self.num_bufs,
                schedule.num_levels(),
                schedule.num_bufs()
            )));
        } else if self.reduction != reduction {
            return Err(Error::state_corruption(format!(
                "the state was built with {:?} rather than {:?}",
                self.reduction, reduction
            )));
        } else if self.frame_shape != roi_index.shape() {
            return Err(Error::state_corruption(format!(
                "the state was built for {:?} frames rather than {:?} frames",
                self.frame_shape,
                roi_index.shape()
            )));
        } else if self.labels != roi_index.labels() {
            return Err(Error::state_corruption(
                "the state tracks a different set of ROI labels".to_owned(),
            ));
        } else if self.pixel_counts != roi_index.pixel_counts() {
            return Err(Error::state_corruption(
                "the state's ROIs hold different numbers of pixels".to_owned(),
            ));
        } else if self.pixel_indices != roi_index.all_pixel_indices() {
            return Err(Error::state_corruption(
                "the state's ROIs cover different pixels".to_owned(),
            ));
        }

        let n_elements = roi_index.n_elements(reduction);
        self.pyramid
            .validate(schedule.num_levels(), schedule.num_bufs(), n_elements)
            .map_err(Error::state_corruption)?;
        let accumulator = CorrelationAccumulator::from_raw_statepack(
            schedule,
            roi_index.n_rois(),
            self.accum_statepack,
        )
        .map_err(Error::state_corruption)?;
        Ok((self.pyramid, accumulator))
    }
}
