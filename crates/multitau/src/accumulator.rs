use std::collections::HashMap;

use multitau_nostd_internal::{
    LagSchedule, NormalizedProduct, OutputDescr, PairDatum, Reducer, StatePackView,
    StatePackViewMut, merge_full_statepacks, reset_full_statepack,
};
use ndarray::{Array2, ArrayView1, ArrayViewMut2, Axis};

use crate::Error;

/// compute the output quantities from a Reducer's statepack and return the
/// result in a HashMap.
///
/// Each entry holds one value per accum_state (in statepack order).
pub fn get_output(
    reducer: &impl Reducer,
    statepack: &StatePackView,
) -> HashMap<&'static str, Vec<f64>> {
    let description = reducer.output_descr();
    let n_states = statepack.n_states();
    let n_comps = description.n_per_accum_state();

    let mut buffer = vec![0.0; n_comps * n_states];
    // the shape always matches the buffer's length
    let mut buffer_view = ArrayViewMut2::from_shape([n_comps, n_states], &mut buffer)
        .expect("the buffer was allocated with the right length");
    for i in 0..n_states {
        reducer.value_from_accum_state(
            &mut buffer_view.index_axis_mut(Axis(1), i),
            &statepack.get_state(i),
        );
    }

    match description {
        OutputDescr::MultiScalarComp(names) => {
            let _to_vec = |row: ArrayView1<f64>| row.iter().cloned().collect();
            let row_iter = buffer_view.rows().into_iter().map(_to_vec);
            HashMap::from_iter(names.iter().cloned().zip(row_iter))
        }
    }
}

/// Tracks the running sums of every `(channel, roi)` cell.
///
/// Cells are ordered with the roi index varying fastest, so that reshaping
/// any per-cell output to `[n_channels, n_rois]` gives the conventional g2
/// layout.
#[derive(Clone, Debug)]
pub struct CorrelationAccumulator {
    schedule: LagSchedule,
    n_rois: usize,
    reducer: NormalizedProduct,
    statepack: Vec<f64>,
}

impl CorrelationAccumulator {
    pub fn new(schedule: LagSchedule, n_rois: usize) -> Result<Self, Error> {
        if n_rois == 0 {
            return Err(Error::integer_range("n_rois", 0, 1, i64::MAX));
        }
        let reducer = NormalizedProduct;
        let n_cells = schedule.n_channels() * n_rois;
        let mut statepack = vec![0.0; reducer.accum_state_size() * n_cells];
        reset_full_statepack(
            &reducer,
            &mut StatePackViewMut::from_slice(n_cells, reducer.accum_state_size(), &mut statepack)
                .map_err(Error::internal_legacy_adhoc)?,
        );
        Ok(Self {
            schedule,
            n_rois,
            reducer,
            statepack,
        })
    }

    /// reconstruct an accumulator from the raw statepack of another
    /// accumulator with the same schedule and ROI count.
    pub(crate) fn from_raw_statepack(
        schedule: LagSchedule,
        n_rois: usize,
        statepack: Vec<f64>,
    ) -> Result<Self, String> {
        let reducer = NormalizedProduct;
        let expected_len = reducer.accum_state_size() * schedule.n_channels() * n_rois;
        if statepack.len() != expected_len {
            return Err(format!(
                "the accumulator statepack holds {} values rather than {}",
                statepack.len(),
                expected_len
            ));
        }
        let counts = &statepack[..(schedule.n_channels() * n_rois)];
        if counts.iter().any(|&c| !(c >= 0.0 && c.fract() == 0.0)) {
            return Err("the accumulator holds an invalid pair count".to_owned());
        }
        Ok(Self {
            schedule,
            n_rois,
            reducer,
            statepack,
        })
    }

    pub(crate) fn raw_statepack(&self) -> &[f64] {
        &self.statepack
    }

    pub fn schedule(&self) -> &LagSchedule {
        &self.schedule
    }

    pub fn n_rois(&self) -> usize {
        self.n_rois
    }

    fn n_cells(&self) -> usize {
        self.schedule.n_channels() * self.n_rois
    }

    fn statepack_view(&self) -> StatePackView<'_> {
        // the length is fixed at construction
        StatePackView::from_slice(
            self.n_cells(),
            self.reducer.accum_state_size(),
            &self.statepack,
        )
        .expect("the statepack length is checked at construction")
    }

    fn statepack_view_mut(&mut self) -> StatePackViewMut<'_> {
        let n_cells = self.n_cells();
        let state_size = self.reducer.accum_state_size();
        StatePackViewMut::from_slice(n_cells, state_size, &mut self.statepack)
            .expect("the statepack length is checked at construction")
    }

    /// consume a pair in the cell for `(channel, roi)`.
    ///
    /// The caller is responsible for range-checking `channel` & `roi` and for
    /// skipping non-finite pairs.
    #[inline]
    pub(crate) fn consume(&mut self, channel: usize, roi: usize, datum: &PairDatum) {
        let cell = channel * self.n_rois + roi;
        let reducer = self.reducer;
        reducer.consume(&mut self.statepack_view_mut().get_state_mut(cell), datum);
    }

    /// record a pair of values for `roi` at bin `lag_bin` of `level`
    pub fn update(
        &mut self,
        level: usize,
        lag_bin: usize,
        roi: usize,
        past_value: f64,
        future_value: f64,
    ) -> Result<(), Error> {
        let Some(channel) = self.schedule.channel_index(level, lag_bin) else {
            let bins = self.schedule.bin_range(level.min(self.schedule.num_levels() - 1));
            return if level >= self.schedule.num_levels() {
                Err(Error::integer_range(
                    "level",
                    level as i64,
                    0,
                    self.schedule.num_levels() as i64 - 1,
                ))
            } else {
                Err(Error::integer_range(
                    "lag_bin",
                    lag_bin as i64,
                    bins.start as i64,
                    bins.end as i64 - 1,
                ))
            };
        };
        if roi >= self.n_rois {
            return Err(Error::integer_range(
                "roi",
                roi as i64,
                0,
                self.n_rois as i64 - 1,
            ));
        }
        self.consume(channel, roi, &PairDatum::from_pair(past_value, future_value));
        Ok(())
    }

    /// fetch a per-cell output component, reshaped to `[n_channels, n_rois]`
    fn output_component(&self, name: &str) -> Array2<f64> {
        let mut outputs = get_output(&self.reducer, &self.statepack_view());
        let values = outputs.remove(name).unwrap_or_default();
        Array2::from_shape_vec((self.schedule.n_channels(), self.n_rois), values)
            .expect("every output component holds one value per cell")
    }

    /// compute the normalized correlation of every cell.
    ///
    /// The result has shape `[n_channels, n_rois]`. Cells that haven't
    /// received any pairs hold `NaN`. This is a pure read: accumulation can
    /// continue afterwards.
    pub fn finalize(&self) -> Array2<f64> {
        self.output_component("g2")
    }

    /// the number of pairs that contributed to every cell, with shape
    /// `[n_channels, n_rois]`
    pub fn counts(&self) -> Array2<u64> {
        self.output_component("count").mapv(|c| c as u64)
    }

    /// fold the sums of `other` into `self`.
    ///
    /// <div class="warning">
    ///
    /// Only use this to combine independent acquisitions (e.g. repeated
    /// measurements of the same sample). Two consecutive chunks of a single
    /// frame sequence must be combined by resuming from an internal state;
    /// merging their sums would drop every pair that straddles the boundary.
    ///
    /// </div>
    pub fn merge(&mut self, other: &CorrelationAccumulator) -> Result<(), Error> {
        if self.schedule != other.schedule {
            return Err(Error::internal_legacy_adhoc(
                "can't merge accumulators with different lag schedules",
            ));
        } else if self.n_rois != other.n_rois {
            return Err(Error::length("the other accumulator's ROI set", self.n_rois, other.n_rois));
        }
        let mut other_storage = other.statepack.clone();
        let other_view = StatePackViewMut::from_slice(
            other.n_cells(),
            other.reducer.accum_state_size(),
            &mut other_storage,
        )
        .map_err(Error::internal_legacy_adhoc)?;
        let reducer = self.reducer;
        merge_full_statepacks(&reducer, &mut self.statepack_view_mut(), &other_view)
            .map_err(Error::internal_legacy_adhoc)
    }
}
