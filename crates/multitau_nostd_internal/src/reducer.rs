//! Define basic reducer machinery (that doesn't require the standard lib)
//!
//! # Reducer Machinery
//!
//! Every output cell of a multi-tau calculation (one per `(channel, roi)`
//! pair) is built up from a stream of frame pairs. Each pair consists of a
//! "past" value, sampled `lag` frames before, and a "future" value (the
//! newest value). In practice, we use [`PairDatum`] to package a pair.
//!
//! We draw a distinction between the current state of a cell and the logic
//! for updating that state.
//! - We refer to the current state of a single cell as the `accum_state`.
//! - The update logic is encapsulated by the functions implemented by the
//!   [`Reducer`] trait. A Reducer modifies a single `accum_state` at a time.
//! - From the perspective of a reducer, the `accum_state` is packaged inside
//!   of the [`AccumStateView`] & [`AccumStateViewMut`] types (the exact type
//!   depends on context)
//!
//! External code owns the storage for every cell's `accum_state` (usually
//! through a [`crate::StatePackViewMut`]). The reducers are agnostic about
//! how that storage is organized in memory.

use crate::state::{AccumStateView, AccumStateViewMut};
use ndarray::ArrayViewMut1;

/// Instances of this element are consumed by the Reducer
///
/// `product` is tracked separately from `past` & `future` because it isn't
/// always their product: when a ROI is resolved pixel-by-pixel, `past` and
/// `future` are ROI-averaged intensities, while `product` is the ROI-average
/// of the pixel-wise products.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairDatum {
    pub past: f64,
    pub future: f64,
    pub product: f64,
}

impl PairDatum {
    /// package a pair of scalars
    #[inline(always)]
    pub fn from_pair(past: f64, future: f64) -> Self {
        PairDatum {
            past,
            future,
            product: past * future,
        }
    }

    /// A pair involving a bad (non-finite) measurement must not be consumed
    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.past.is_finite() && self.future.is_finite() && self.product.is_finite()
    }
}

/// describes the output components from a single Reducer accum_state
pub enum OutputDescr {
    MultiScalarComp(&'static [&'static str]),
}

impl OutputDescr {
    /// the number of components to allocate per component
    pub fn n_per_accum_state(&self) -> usize {
        match self {
            Self::MultiScalarComp(names) => names.len(),
        }
    }
}

/// Reducers operate on individual `accum_state`s.
pub trait Reducer {
    /// the number of f64 elements needed to track the accumulator data
    fn accum_state_size(&self) -> usize;

    /// initializes the storage tracking the accumulator's state.
    ///
    /// You need to call this function before you start working with the
    /// storage. You can also use this to reset the accumulator's state since
    /// it blindly overwrites any existing values.
    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut);

    /// consume a frame pair to update the accum_state
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &PairDatum);

    /// merge the state information tracked by `accum_state` and `other`, and
    /// update `accum_state` accordingly
    ///
    /// <div class="warning">
    ///
    /// This is only meaningful for states built from disjoint sets of frame
    /// pairs (e.g. the same cell computed for 2 detectors). Two consecutive
    /// chunks of one frame sequence can't be combined this way: the pairs
    /// that straddle the chunk boundary would be missing.
    ///
    /// </div>
    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView);

    /// extract all output-values from a single accum_state. Expects `value` to
    /// have the shape given by `[self.output_descr().n_per_accum_state()]`
    /// and `accum_state` to have the shape provided by
    /// `[self.accum_state_size()]`
    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView);

    /// Describes the outputs produced from a single accum_state
    fn output_descr(&self) -> OutputDescr;
}

/// Tracks the normalized intensity autocorrelation of a single cell:
/// `<past·future> / (<past>·<future>)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizedProduct;

impl NormalizedProduct {
    pub const COUNT: usize = 0;
    pub const PRODUCT: usize = 1;
    pub const PAST: usize = 2;
    pub const FUTURE: usize = 3;

    pub const VALUE_G2: usize = 0;
    pub const VALUE_COUNT: usize = 1;
    const OUTPUT_COMPONENTS: &'static [&'static str] = &["g2", "count"];
}

impl Reducer for NormalizedProduct {
    fn accum_state_size(&self) -> usize {
        4_usize
    }

    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut) {
        accum_state.fill(0.0);
    }

    #[inline(always)]
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &PairDatum) {
        accum_state[NormalizedProduct::COUNT] += 1.0;
        accum_state[NormalizedProduct::PRODUCT] += datum.product;
        accum_state[NormalizedProduct::PAST] += datum.past;
        accum_state[NormalizedProduct::FUTURE] += datum.future;
    }

    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView) {
        for i in 0..self.accum_state_size() {
            accum_state[i] += other[i];
        }
    }

    fn output_descr(&self) -> OutputDescr {
        OutputDescr::MultiScalarComp(NormalizedProduct::OUTPUT_COMPONENTS)
    }

    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView) {
        let count = accum_state[NormalizedProduct::COUNT];
        value[[NormalizedProduct::VALUE_G2]] = if count > 0.0 {
            let mean_product = accum_state[NormalizedProduct::PRODUCT] / count;
            let mean_past = accum_state[NormalizedProduct::PAST] / count;
            let mean_future = accum_state[NormalizedProduct::FUTURE] / count;
            mean_product / (mean_past * mean_future)
        } else {
            // a cell without any pairs is undefined, not zero
            f64::NAN
        };
        value[[NormalizedProduct::VALUE_COUNT]] = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayViewMut1;

    fn output(reducer: &NormalizedProduct, accum_state: &AccumStateView) -> [f64; 2] {
        let mut buf = [0.0; 2];
        reducer.value_from_accum_state(
            &mut ArrayViewMut1::from(&mut buf[..]),
            accum_state,
        );
        buf
    }

    #[test]
    fn consume_nothing() {
        let reducer = NormalizedProduct;
        let mut storage = [1.0; 4];
        let mut accum_state = AccumStateViewMut::from_contiguous_slice(&mut storage);
        reducer.init_accum_state(&mut accum_state);

        let [g2, count] = output(&reducer, &accum_state.as_view());
        assert!(g2.is_nan());
        assert_eq!(count, 0.0);
    }

    #[test]
    fn consume_pairs() {
        let reducer = NormalizedProduct;
        let mut storage = [0.0; 4];
        let mut accum_state = AccumStateViewMut::from_contiguous_slice(&mut storage);
        reducer.init_accum_state(&mut accum_state);

        reducer.consume(&mut accum_state, &PairDatum::from_pair(1.0, 2.0));
        reducer.consume(&mut accum_state, &PairDatum::from_pair(3.0, 4.0));

        // <past·future> = 7, <past> = 2, <future> = 3
        let [g2, count] = output(&reducer, &accum_state.as_view());
        assert_eq!(g2, 7.0 / 6.0);
        assert_eq!(count, 2.0);
    }

    #[test]
    fn merge() {
        let reducer = NormalizedProduct;
        let mut storage = [0.0; 4];
        let mut accum_state = AccumStateViewMut::from_contiguous_slice(&mut storage);
        reducer.init_accum_state(&mut accum_state);
        reducer.consume(&mut accum_state, &PairDatum::from_pair(1.0, 2.0));

        let mut storage_other = [0.0; 4];
        let mut accum_state_other = AccumStateViewMut::from_contiguous_slice(&mut storage_other);
        reducer.init_accum_state(&mut accum_state_other);
        reducer.consume(&mut accum_state_other, &PairDatum::from_pair(3.0, 4.0));

        reducer.merge(&mut accum_state, &accum_state_other.as_view());

        let [g2, count] = output(&reducer, &accum_state.as_view());
        assert_eq!(g2, 7.0 / 6.0);
        assert_eq!(count, 2.0);
    }

    #[test]
    fn bad_pairs() {
        assert!(PairDatum::from_pair(1.0, 2.0).is_finite());
        assert!(!PairDatum::from_pair(f64::NAN, 2.0).is_finite());
        assert!(!PairDatum::from_pair(1.0, f64::INFINITY).is_finite());
    }
}
