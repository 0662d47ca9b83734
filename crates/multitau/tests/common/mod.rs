// do we have to use this to silence warnings?
#![allow(dead_code)]

// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use ndarray::{Array2, Array3, ArrayView2};
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

/// checks that 2 arrays are identical, bit for bit (any 2 NaNs are
/// considered equal)
pub fn assert_bitwise_eq(actual: ArrayView2<f64>, expected: ArrayView2<f64>) {
    assert_eq!(actual.dim(), expected.dim(), "the array shapes differ");
    for ((idx, &actual_val), &ref_val) in actual.indexed_iter().zip(expected.iter()) {
        let same = (actual_val.is_nan() && ref_val.is_nan())
            || (actual_val.to_bits() == ref_val.to_bits());
        assert!(
            same,
            "the values at {idx:?} differ\
            \n  actual   = {actual_val}\
            \n  expected = {ref_val}",
        );
    }
}

/// a stack of frames, where every pixel is drawn from a uniform distribution
/// over `[1, 3)`
pub fn random_frames(seed: u64, n_frames: usize, shape: [usize; 2]) -> Array3<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let distribution = Uniform::new(1.0, 3.0).unwrap();
    Array3::from_shape_simple_fn((n_frames, shape[0], shape[1]), || {
        distribution.sample(&mut rng)
    })
}

/// a stack of frames, where every pixel is an integer drawn uniformly from
/// `{1, 2}` (like numpy's `randint(1, 3)`)
pub fn random_integer_frames(seed: u64, n_frames: usize, shape: [usize; 2]) -> Array3<u8> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let distribution = Uniform::new(1_u8, 3_u8).unwrap();
    Array3::from_shape_simple_fn((n_frames, shape[0], shape[1]), || {
        distribution.sample(&mut rng)
    })
}

/// a label map with 2 ROIs: the left half is labelled 5, the right half is
/// labelled 3 & the first row is left out
pub fn two_roi_labels(shape: [usize; 2]) -> Array2<u64> {
    Array2::from_shape_fn((shape[0], shape[1]), |(i, j)| {
        if i == 0 {
            0
        } else if j < shape[1] / 2 {
            5
        } else {
            3
        }
    })
}
