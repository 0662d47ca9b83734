//! Slot arithmetic for the circular buffers that back each pyramid level.
//!
//! A level's buffer holds `len` slots. The level tracks a `cursor`, the slot
//! that the *next* value gets written into. Consequently, the most recently
//! written value lives one slot behind the cursor.

/// the slot holding the most recently written value
#[inline]
pub fn newest_slot(cursor: usize, len: usize) -> usize {
    lagged_slot(cursor, 0, len)
}

/// the slot holding the value written `lag` writes before the newest one
///
/// `lag` must be smaller than `len`.
#[inline]
pub fn lagged_slot(cursor: usize, lag: usize, len: usize) -> usize {
    debug_assert!(lag < len && cursor < len);
    (cursor + 2 * len - 1 - lag) % len
}

/// the pair of slots, `[older, newer]`, holding the 2 most recent values.
/// These get averaged together when a level forwards a value to the next
/// (coarser) level.
#[inline]
pub fn slot_pair_for_coarsening(cursor: usize, len: usize) -> [usize; 2] {
    [lagged_slot(cursor, 1, len), newest_slot(cursor, len)]
}
