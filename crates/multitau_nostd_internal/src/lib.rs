//! Numerical core of the `multitau` crate.
//!
//! Everything in here operates on caller-owned memory: this crate never
//! allocates. The `multitau` crate owns the buffers and wraps them with the
//! view types defined in [`state`](crate::StatePackViewMut).
//!
//! The pieces are:
//! - [`LagSchedule`]: the bookkeeping that maps `(level, bin)` pairs to
//!   output channels and lag times.
//! - [`Reducer`] & [`NormalizedProduct`]: the logic for updating a single
//!   accumulator cell.
//! - the ring helpers ([`newest_slot`], [`lagged_slot`]) used to walk a
//!   level's circular buffer.
#![no_std]
mod lags;
mod reduce_utils;
mod reducer;
mod ring;
mod state;

pub use lags::{LagSchedule, MAX_LEVELS};
pub use reduce_utils::{merge_full_statepacks, reset_full_statepack};
pub use reducer::{NormalizedProduct, OutputDescr, PairDatum, Reducer};
pub use ring::{lagged_slot, newest_slot, slot_pair_for_coarsening};
pub use state::{AccumStateView, AccumStateViewMut, StatePackView, StatePackViewMut};
