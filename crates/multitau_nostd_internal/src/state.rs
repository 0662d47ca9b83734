//! Introduces the [`AccumStateView`] and [`AccumStateViewMut`] types, along
//! with the statepack types that hand them out.
//!
//! An `accum_state` is the handful of `f64` registers that a [`Reducer`]
//! needs to track one accumulator cell. A statepack is a collection of
//! `accum_state`s.
//!
//! # Why do we need separate types to represent immutable & mutable views?
//!
//! We would like to hand out views of individual `accum_state`s from a
//! statepack without first materializing a list of views. Returning a
//! reference to a freshly constructed view isn't possible (it would dangle),
//! and the only way around that is a Dynamically Sized Type, which would
//! force every `accum_state` to be contiguous. Since statepacks store their
//! states in an interleaved manner (see [`StatePackViewMut`]), we instead
//! return small view objects by value, one type for each mutability.
//!
//! [`Reducer`]: crate::Reducer

use core::ops::{Index, IndexMut};

pub struct AccumStateView<'a> {
    len: usize,
    stride: usize,
    data: &'a [f64],
}

impl<'a> AccumStateView<'a> {
    /// Private constructor used by other types in this module
    fn internal_new(len: usize, stride: usize, data: &'a [f64]) -> Self {
        debug_assert!(len > 0 && ((len - 1) * stride) < data.len());
        Self { len, stride, data }
    }

    pub fn from_contiguous_slice(data: &'a [f64]) -> Self {
        assert!(!data.is_empty(), "can't construct an empty AccumStateView");
        Self {
            len: data.len(),
            stride: 1,
            data,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for AccumStateView<'_> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: usize) -> &Self::Output {
        debug_assert!(index < self.len);
        self.data.index(index * self.stride)
    }
}

pub struct AccumStateViewMut<'a> {
    len: usize,
    stride: usize,
    data: &'a mut [f64],
}

impl<'a> AccumStateViewMut<'a> {
    /// Private constructor used by other types in this module
    fn internal_new(len: usize, stride: usize, data: &'a mut [f64]) -> Self {
        debug_assert!(len > 0 && ((len - 1) * stride) < data.len());
        Self { len, stride, data }
    }

    // consider returning an option rather than panicing
    pub fn from_contiguous_slice(data: &'a mut [f64]) -> Self {
        assert!(!data.is_empty(), "can't construct an empty AccumStateViewMut");
        Self {
            len: data.len(),
            stride: 1,
            data,
        }
    }

    pub fn as_view<'b>(&'b self) -> AccumStateView<'b> {
        AccumStateView {
            len: self.len,
            stride: self.stride,
            data: &self.data,
        }
    }

    pub fn fill(&mut self, val: f64) {
        for i in 0..self.len {
            self[i] = val;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for AccumStateViewMut<'_> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: usize) -> &Self::Output {
        debug_assert!(index < self.len);
        self.data.index(index * self.stride)
    }
}

impl IndexMut<usize> for AccumStateViewMut<'_> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        debug_assert!(index < self.len);
        self.data.index_mut(index * self.stride)
    }
}

/// checks the arguments of the statepack constructors
fn check_statepack_args(
    n_states: usize,
    state_size: usize,
    data_len: usize,
) -> Result<(), &'static str> {
    if n_states == 0 {
        Err("a statepack must hold at least 1 state")
    } else if state_size == 0 {
        Err("an accum_state must hold at least 1 value")
    } else if n_states.checked_mul(state_size) != Some(data_len) {
        Err("the slice's length must be n_states * state_size")
    } else {
        Ok(())
    }
}

/// Represents a read-only collection of accumulator states
pub struct StatePackView<'a> {
    data: &'a [f64],
    n_states: usize,
    state_size: usize,
}

impl<'a> StatePackView<'a> {
    pub fn from_slice(
        n_states: usize,
        state_size: usize,
        data: &'a [f64],
    ) -> Result<Self, &'static str> {
        check_statepack_args(n_states, state_size, data.len())?;
        Ok(Self {
            data,
            n_states,
            state_size,
        })
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    #[inline]
    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        assert!(i < self.n_states);
        AccumStateView::internal_new(self.state_size, self.n_states, &self.data[i..])
    }

    #[inline]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }
}

/// Represents a collection of accumulator states
///
/// # Data Representation
/// This type stores accumulator states in an interleaved manner. Register
/// `k` of state `i` lives at index `k * n_states + i` of the underlying
/// slice. In other words, the slice can be interpreted as a row-major array
/// of shape `[state_size, n_states]`, where each column is an `accum_state`.
///
/// When the states describe a grid of `(channel, roi)` cells (with `roi`
/// varying fastest), each row of that array is itself a row-major
/// `[n_channels, n_rois]` array. This makes it cheap to pull out a single
/// register (e.g. the pair count) for every cell at once.
pub struct StatePackViewMut<'a> {
    data: &'a mut [f64],
    n_states: usize,
    state_size: usize,
}

impl<'a> StatePackViewMut<'a> {
    pub fn from_slice(
        n_states: usize,
        state_size: usize,
        data: &'a mut [f64],
    ) -> Result<Self, &'static str> {
        check_statepack_args(n_states, state_size, data.len())?;
        Ok(Self {
            data,
            n_states,
            state_size,
        })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_view<'b>(&'b self) -> StatePackView<'b> {
        StatePackView {
            data: &self.data,
            n_states: self.n_states,
            state_size: self.state_size,
        }
    }

    #[inline]
    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        assert!(i < self.n_states);
        AccumStateView::internal_new(self.state_size, self.n_states, &self.data[i..])
    }

    #[inline]
    pub fn get_state_mut(&mut self, i: usize) -> AccumStateViewMut<'_> {
        assert!(i < self.n_states);
        AccumStateViewMut::internal_new(self.state_size, self.n_states, &mut self.data[i..])
    }

    #[inline]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }
}
