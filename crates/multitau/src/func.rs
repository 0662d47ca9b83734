//! Standalone functions that don't need a long-lived correlator.

use ndarray::{Array1, Array2, ArrayView2, ArrayView3};

use crate::{CorrelatorBuilder, Error};

/// compute the multi-tau autocorrelation of a full stack of frames.
///
/// `frames` has shape `[n_frames, nrows, ncols]` and `labels` has shape
/// `[nrows, ncols]`. Returns g2 (shape `[n_channels, n_rois]`, with the ROIs
/// ordered by ascending label) and the lag of every channel.
///
/// This is equivalent to the final result of [`crate::lazy_multi_tau`].
pub fn multi_tau_auto_corr<T>(
    num_levels: usize,
    num_bufs: usize,
    labels: ArrayView2<u64>,
    frames: ArrayView3<T>,
) -> Result<(Array2<f64>, Array1<u64>), Error>
where
    T: Copy + Into<f64>,
{
    let mut correlator = CorrelatorBuilder::new()
        .num_levels(num_levels)
        .num_bufs(num_bufs)
        .labels(labels)
        .build()?;
    correlator.ingest_batch(frames)?;
    Ok((correlator.g2(), correlator.lag_steps()))
}

/// evaluate the single-exponential model of the intensity autocorrelation,
/// `baseline + beta * exp(-2 * relaxation_rate * lag)`, at every lag.
///
/// `lags` are measured in frames (e.g. the output of
/// [`crate::MultiTauCorrelator::lag_steps`]), so `relaxation_rate` is
/// measured per frame. `beta` is the speckle contrast.
pub fn auto_corr_scat_factor(
    lags: impl IntoIterator<Item = u64>,
    beta: f64,
    relaxation_rate: f64,
    baseline: f64,
) -> Array1<f64> {
    lags.into_iter()
        .map(|lag| baseline + beta * (-2.0 * relaxation_rate * (lag as f64)).exp())
        .collect()
}
