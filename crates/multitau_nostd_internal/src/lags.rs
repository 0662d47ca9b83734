//! Implements the lag bookkeeping of the multi-tau scheme.
//!
//! # Background
//!
//! Level 0 of the pyramid stores the most recent `num_bufs` (reduced) frames,
//! so it can directly measure lags `0, 1, ..., num_bufs - 1`. Level `k > 0`
//! stores values that are averages of `2^k` consecutive frames. The distance
//! between adjacent slots of level `k` is `2^k` frames, so bin `i` of level
//! `k` measures a lag of `i * 2^k` frames.
//!
//! The lower half of the bins at level `k > 0` measure lags that level
//! `k - 1` already covers (with better time resolution). We drop them. Each
//! level beyond the first therefore contributes `num_bufs / 2` channels.

use core::ops::Range;

/// The largest supported number of levels.
///
/// Lags are stored as `u64` and bin `i` of level `k` has lag `i << k` (with
/// `i < num_bufs`). Capping the level count keeps the shift well-defined for
/// any sane buffer count.
pub const MAX_LEVELS: usize = 62;

/// Describes the layout of the output channels of a multi-tau calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LagSchedule {
    num_levels: usize,
    num_bufs: usize,
}

impl LagSchedule {
    pub fn new(num_levels: usize, num_bufs: usize) -> Result<Self, &'static str> {
        if num_levels == 0 {
            Err("num_levels must be positive")
        } else if num_levels > MAX_LEVELS {
            Err("num_levels exceeds the maximum supported number of levels")
        } else if num_bufs < 2 {
            Err("num_bufs must be at least 2")
        } else if num_bufs % 2 != 0 {
            Err("num_bufs must be even")
        } else if (num_bufs as u64).leading_zeros() < (num_levels as u32) {
            Err("num_bufs is too large for the requested number of levels")
        } else {
            Ok(Self {
                num_levels,
                num_bufs,
            })
        }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    #[inline]
    pub fn num_bufs(&self) -> usize {
        self.num_bufs
    }

    /// the total number of output channels
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.num_bufs + (self.num_levels - 1) * (self.num_bufs / 2)
    }

    /// the bins of `level` that contribute to the output
    #[inline]
    pub fn bin_range(&self, level: usize) -> Range<usize> {
        if level == 0 {
            0..self.num_bufs
        } else {
            (self.num_bufs / 2)..self.num_bufs
        }
    }

    /// map `(level, bin)` to a flat channel index.
    ///
    /// Returns `None` for out-of-range pairs and for the (dropped) lower half
    /// of the bins of a level beyond the first.
    #[inline]
    pub fn channel_index(&self, level: usize, bin: usize) -> Option<usize> {
        if level < self.num_levels && self.bin_range(level).contains(&bin) {
            Some(level * (self.num_bufs / 2) + bin)
        } else {
            None
        }
    }

    /// the inverse of [`Self::channel_index`]
    pub fn level_and_bin(&self, channel: usize) -> Option<(usize, usize)> {
        let half = self.num_bufs / 2;
        if channel < self.num_bufs {
            Some((0, channel))
        } else if channel < self.n_channels() {
            let offset = channel - self.num_bufs;
            Some((offset / half + 1, half + offset % half))
        } else {
            None
        }
    }

    /// the lag (measured in frames) associated with `channel`
    pub fn lag_step(&self, channel: usize) -> Option<u64> {
        self.level_and_bin(channel)
            .map(|(level, bin)| (bin as u64) << level)
    }

    /// iterate over the lags (measured in frames) of every channel, in
    /// channel order
    pub fn lag_steps(&self) -> impl Iterator<Item = u64> + use<> {
        let schedule = *self;
        (0..schedule.n_channels()).map(move |channel| {
            // level_and_bin can't fail for channels in this range
            let (level, bin) = schedule.level_and_bin(channel).unwrap_or((0, 0));
            (bin as u64) << level
        })
    }
}
