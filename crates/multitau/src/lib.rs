/*!
Provides a streaming engine for the multi-tau intensity autocorrelation,
g2(τ), of a sequence of 2D detector frames.

<div class="warning">

This crate is still in early development.

</div>

# High-Level: Multi-Tau Correlation

In X-ray Photon Correlation Spectroscopy (XPCS), the dynamics of a sample
are inferred from the normalized intensity autocorrelation

```text
g2(τ) = <I(t) I(t + τ)> / (<I(t)> <I(t + τ)>)
```

of the pixels in a region of interest (ROI). Computing it at every lag is
quadratic in the number of frames. The multi-tau scheme instead measures
short lags at full time resolution and progressively coarsens the time
resolution for longer lags: level `k` of a pyramid of circular buffers
stores averages of `2^k` consecutive frames. This gives logarithmically
spaced lags at a cost that is linear in the number of frames.

# User Guide

Build a [`MultiTauCorrelator`] with a [`CorrelatorBuilder`], feed it frames
with [`MultiTauCorrelator::ingest`] (or [`MultiTauCorrelator::ingest_batch`])
and read out [`MultiTauCorrelator::g2`] whenever you like.

- [`multi_tau_auto_corr`] processes a whole stack of frames in one call.
- [`lazy_multi_tau`] yields a [`CorrelationResult`] after every frame.
- An [`InternalState`] captured from a correlator can be used to resume the
  calculation later (possibly in another process, via serde). The resumed
  calculation is bitwise identical to one that never stopped.

```
use multitau::{CorrelatorBuilder, multi_tau_auto_corr};
use ndarray::{Array2, Array3, s};

let labels = Array2::<u64>::from_shape_fn((4, 4), |(i, _)| 1 + (i as u64) / 2);
let frames = Array3::<u16>::from_shape_fn((32, 4, 4), |(t, i, j)| (1 + (t + i * j) % 5) as u16);
let (g2, lag_steps) = multi_tau_auto_corr(3, 4, labels.view(), frames.view()).unwrap();

// stop after 10 frames and resume from the checkpoint
let mut first = CorrelatorBuilder::new()
    .num_levels(3)
    .num_bufs(4)
    .labels(labels.view())
    .build()
    .unwrap();
first.ingest_batch(frames.slice(s![..10, .., ..])).unwrap();
let mut second = CorrelatorBuilder::new()
    .num_levels(3)
    .num_bufs(4)
    .labels(labels.view())
    .internal_state(first.into_internal_state())
    .build()
    .unwrap();
second.ingest_batch(frames.slice(s![10.., .., ..])).unwrap();

assert_eq!(second.lag_steps(), lag_steps);
assert_eq!(second.g2(), g2);
```

# Developer Guide

The numerical core (lag bookkeeping, the reducer that updates a single
accumulator cell and the views over the accumulator storage) lives in
[`multitau_nostd_internal`]. This crate owns all of the memory.

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod accumulator;
mod checkpoint;
mod engine;
mod error;
mod func;
mod lazy;
mod pyramid;
mod roi;

// pull in symbols that visible outside of the package
pub use accumulator::{CorrelationAccumulator, get_output};
pub use checkpoint::InternalState;
pub use engine::{CorrelationResult, CorrelatorBuilder, MultiTauCorrelator};
pub use error::Error;
pub use func::{auto_corr_scat_factor, multi_tau_auto_corr};
pub use lazy::{LazyMultiTau, lazy_multi_tau};
pub use multitau_nostd_internal::{
    LagSchedule, MAX_LEVELS, NormalizedProduct, OutputDescr, PairDatum, Reducer, StatePackView,
};
pub use pyramid::LevelPyramid;
pub use roi::{Reduction, RoiIndex};
