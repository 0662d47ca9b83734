//! Implements the multi-level stack of circular buffers.
//!
//! Level 0 receives one value-vector per frame. Whenever a level has
//! received 2 new values, their average gets forwarded to the next level.
//! Level `k` therefore receives a value every `2^k` frames, and each of
//! its values is the average of `2^k` consecutive frames.

use std::ops::Range;

use multitau_nostd_internal::{lagged_slot, newest_slot, slot_pair_for_coarsening};
use ndarray::{Array3, ArrayView1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Error;

/// (de)serializes the buffers through the bit patterns of their values.
///
/// A bad frame leaves NaNs behind in the buffers, and formats like JSON have
/// no representation for non-finite values.
mod buffer_bits {
    use ndarray::Array3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    #[derive(Serialize, Deserialize)]
    struct EncodedBuffers {
        shape: [usize; 3],
        bits: Vec<u64>,
    }

    pub(super) fn serialize<S: Serializer>(
        buffers: &Array3<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let (nlevels, nbufs, nelements) = buffers.dim();
        EncodedBuffers {
            shape: [nlevels, nbufs, nelements],
            bits: buffers.iter().map(|v| v.to_bits()).collect(),
        }
        .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Array3<f64>, D::Error> {
        let encoded = EncodedBuffers::deserialize(deserializer)?;
        let [nlevels, nbufs, nelements] = encoded.shape;
        let values = encoded.bits.into_iter().map(f64::from_bits).collect();
        Array3::from_shape_vec((nlevels, nbufs, nelements), values).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelPyramid {
    /// shape: `[num_levels, num_bufs, n_elements]`
    #[serde(with = "buffer_bits")]
    buffers: Array3<f64>,
    /// the slot that the next value of each level gets written to
    cursors: Vec<usize>,
    /// the number of values that each level has received
    n_ingested: Vec<u64>,
    /// whether each level holds a value that is still waiting for a partner
    /// before an average can be forwarded to the next level
    half_filled: Vec<bool>,
}

// the buffers are compared bit for bit so that 2 pyramids holding the same
// NaNs compare equal
impl PartialEq for LevelPyramid {
    fn eq(&self, other: &Self) -> bool {
        self.buffers.shape() == other.buffers.shape()
            && self
                .buffers
                .iter()
                .zip(other.buffers.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.cursors == other.cursors
            && self.n_ingested == other.n_ingested
            && self.half_filled == other.half_filled
    }
}

impl LevelPyramid {
    pub fn new(num_levels: usize, num_bufs: usize, n_elements: usize) -> Result<Self, Error> {
        if num_levels == 0 {
            return Err(Error::integer_range("num_levels", 0, 1, i64::MAX));
        } else if num_bufs < 2 {
            return Err(Error::integer_range("num_bufs", num_bufs as i64, 2, i64::MAX));
        } else if n_elements == 0 {
            return Err(Error::integer_range("n_elements", 0, 1, i64::MAX));
        }
        Ok(Self {
            buffers: Array3::zeros((num_levels, num_bufs, n_elements)),
            cursors: vec![0; num_levels],
            n_ingested: vec![0; num_levels],
            half_filled: vec![false; num_levels],
        })
    }

    pub fn num_levels(&self) -> usize {
        self.buffers.len_of(Axis(0))
    }

    pub fn num_bufs(&self) -> usize {
        self.buffers.len_of(Axis(1))
    }

    pub fn n_elements(&self) -> usize {
        self.buffers.len_of(Axis(2))
    }

    /// the number of values that `level` has received
    pub fn n_ingested(&self, level: usize) -> u64 {
        self.n_ingested[level]
    }

    /// the number of frames that have been pushed into level 0
    pub fn frames_ingested(&self) -> u64 {
        self.n_ingested[0]
    }

    /// the value written `lag` writes before the newest value of `level`.
    ///
    /// The contents are meaningless unless `lag < self.n_ingested(level)`.
    pub fn slot(&self, level: usize, lag: usize) -> ArrayView1<'_, f64> {
        let slot = lagged_slot(self.cursors[level], lag, self.num_bufs());
        self.buffers.slice(ndarray::s![level, slot, ..])
    }

    /// the newest value of `level`
    pub fn newest(&self, level: usize) -> ArrayView1<'_, f64> {
        let slot = newest_slot(self.cursors[level], self.num_bufs());
        self.buffers.slice(ndarray::s![level, slot, ..])
    }

    /// push `values` into `level` and cascade averaged values into the
    /// coarser levels.
    ///
    /// Returns the levels that received a new value (always a contiguous run
    /// starting at `level`).
    pub fn push(&mut self, level: usize, values: &[f64]) -> Result<Range<usize>, Error> {
        if level >= self.num_levels() {
            return Err(Error::integer_range(
                "level",
                level as i64,
                0,
                self.num_levels() as i64 - 1,
            ));
        } else if values.len() != self.n_elements() {
            return Err(Error::length("the pushed values", self.n_elements(), values.len()));
        }

        self.write(level, |mut dst| dst.assign(&ArrayView1::from(values)));

        // we use an explicit loop rather than recursion so that the depth of
        // the cascade is never a concern
        let mut top = level;
        while top + 1 < self.num_levels() {
            if !self.half_filled[top] {
                self.half_filled[top] = true;
                break;
            }
            self.half_filled[top] = false;
            self.coarsen(top);
            top += 1;
        }
        if top + 1 == self.num_levels() {
            // the coarsest level never forwards values, but we still track its
            // parity so that every level obeys the same invariant
            self.half_filled[top] = !self.half_filled[top];
        }
        Ok(level..(top + 1))
    }

    /// write a value into the next slot of `level`
    fn write(&mut self, level: usize, fill: impl FnOnce(ndarray::ArrayViewMut1<f64>)) {
        let slot = self.cursors[level];
        fill(self.buffers.slice_mut(ndarray::s![level, slot, ..]));
        self.cursors[level] = (slot + 1) % self.num_bufs();
        self.n_ingested[level] += 1;
    }

    /// average the 2 newest values of `level` and write the result into
    /// `level + 1`
    fn coarsen(&mut self, level: usize) {
        trace!(level = level + 1, "forwarding an averaged value");
        let [older, newer] = slot_pair_for_coarsening(self.cursors[level], self.num_bufs());
        let dst_slot = self.cursors[level + 1];

        let (lower, mut upper) = self.buffers.view_mut().split_at(Axis(0), level + 1);
        let src = lower.index_axis(Axis(0), level);
        Zip::from(upper.slice_mut(ndarray::s![0, dst_slot, ..]))
            .and(src.index_axis(Axis(0), older))
            .and(src.index_axis(Axis(0), newer))
            .for_each(|dst, &a, &b| *dst = (a + b) / 2.0);

        self.cursors[level + 1] = (dst_slot + 1) % self.num_bufs();
        self.n_ingested[level + 1] += 1;
    }

    /// check the internal consistency of a pyramid (e.g. one that was
    /// deserialized), given the expected dimensions
    pub(crate) fn validate(
        &self,
        num_levels: usize,
        num_bufs: usize,
        n_elements: usize,
    ) -> Result<(), String> {
        let expected_shape = [num_levels, num_bufs, n_elements];
        if self.buffers.shape() != expected_shape {
            return Err(format!(
                "the pyramid buffers have a shape of {:?} rather than {:?}",
                self.buffers.shape(),
                expected_shape
            ));
        } else if self.cursors.len() != num_levels
            || self.n_ingested.len() != num_levels
            || self.half_filled.len() != num_levels
        {
            return Err(format!(
                "the pyramid bookkeeping doesn't describe {num_levels} levels"
            ));
        }

        for level in 0..num_levels {
            let n = self.n_ingested[level];
            if self.cursors[level] as u64 != n % (num_bufs as u64) {
                return Err(format!("level {level} has an inconsistent cursor"));
            } else if self.half_filled[level] != (n % 2 == 1) {
                return Err(format!("level {level} has an inconsistent parity"));
            } else if level > 0 && n != self.n_ingested[level - 1] / 2 {
                return Err(format!(
                    "level {level} received {n} values, but level {} received {}",
                    level - 1,
                    self.n_ingested[level - 1]
                ));
            }
        }
        Ok(())
    }
}
