// this defines some basic utilities for working with full statepacks.
// it's unclear if we want these things to be part of the public API.

use crate::reducer::Reducer;
use crate::state::StatePackViewMut;

/// initialize every accum_state in `statepack`
pub fn reset_full_statepack(reducer: &impl Reducer, statepack: &mut StatePackViewMut) {
    for i in 0..statepack.n_states() {
        reducer.init_accum_state(&mut statepack.get_state_mut(i));
    }
}

// ideally, other would be more clearly immutable, but I don't think we want to
// introduce another type just for this 1 case
/// merge every accum_state of `other` into the matching accum_state of
/// `statepack`
pub fn merge_full_statepacks(
    reducer: &impl Reducer,
    statepack: &mut StatePackViewMut,
    other: &StatePackViewMut,
) -> Result<(), &'static str> {
    if statepack.n_states() != other.n_states() {
        return Err("the statepacks hold different numbers of states");
    } else if statepack.state_size() != other.state_size() {
        return Err("the statepacks hold states of different sizes");
    }
    for i in 0..statepack.n_states() {
        reducer.merge(&mut statepack.get_state_mut(i), &other.get_state(i));
    }
    Ok(())
}
