use multitau::{CorrelatorBuilder, InternalState, MultiTauCorrelator, Reduction, lazy_multi_tau};
use ndarray::{Array2, ArrayView2, Axis, s};

mod common;

use common::{assert_bitwise_eq, random_frames, two_roi_labels};

fn build_with(
    labels: ArrayView2<u64>,
    num_bufs: usize,
    reduction: Reduction,
    internal_state: Option<InternalState>,
) -> Result<MultiTauCorrelator, multitau::Error> {
    let builder = CorrelatorBuilder::new()
        .num_levels(3)
        .num_bufs(num_bufs)
        .labels(labels)
        .reduction(reduction);
    match internal_state {
        Some(state) => builder.internal_state(state).build(),
        None => builder.build(),
    }
}

fn build(
    labels: ArrayView2<u64>,
    num_bufs: usize,
    internal_state: Option<InternalState>,
) -> Result<MultiTauCorrelator, multitau::Error> {
    build_with(labels, num_bufs, Reduction::RoiMean, internal_state)
}

#[test]
fn split_at_every_frame() {
    let shape = [4, 6];
    let labels = two_roi_labels(shape);
    let frames = random_frames(42, 23, shape);
    let n_frames = frames.len_of(Axis(0));

    let mut single_pass = build(labels.view(), 4, None).unwrap();
    single_pass.ingest_batch(frames.view()).unwrap();

    for k in 1..n_frames {
        let (head, tail) = (frames.slice(s![..k, .., ..]), frames.slice(s![k.., .., ..]));

        let first = build(labels.view(), 4, None).unwrap();
        let first_results: Vec<_> = lazy_multi_tau(head.axis_iter(Axis(0)), first)
            .map(Result::unwrap)
            .collect();
        let state = first_results.last().unwrap().internal_state.clone();
        assert_eq!(state.frames_ingested(), k as u64);

        let second = build(labels.view(), 4, Some(state)).unwrap();
        let last = lazy_multi_tau(tail.axis_iter(Axis(0)), second)
            .map(Result::unwrap)
            .last()
            .unwrap();

        assert_eq!(last.lag_steps, single_pass.lag_steps());
        assert_bitwise_eq(last.g2.view(), single_pass.g2().view());
        assert_eq!(last.internal_state, single_pass.internal_state());
    }
}

#[test]
fn pixel_resolved_split_at_every_frame() {
    let shape = [3, 4];
    let labels = two_roi_labels(shape);
    let frames = random_frames(2718, 19, shape);
    let n_frames = frames.len_of(Axis(0));

    let mut single_pass = build_with(labels.view(), 4, Reduction::PixelResolved, None).unwrap();
    single_pass.ingest_batch(frames.view()).unwrap();

    for k in 1..n_frames {
        let head = frames.slice(s![..k, .., ..]);
        let tail = frames.slice(s![k.., .., ..]);

        let mut first = build_with(labels.view(), 4, Reduction::PixelResolved, None).unwrap();
        first.ingest_batch(head).unwrap();
        let serialized = serde_json::to_string(&first.into_internal_state()).unwrap();
        let state: InternalState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(state.frames_ingested(), k as u64);

        let mut second =
            build_with(labels.view(), 4, Reduction::PixelResolved, Some(state)).unwrap();
        second.ingest_batch(tail).unwrap();

        assert_eq!(second.lag_steps(), single_pass.lag_steps());
        assert_bitwise_eq(second.g2().view(), single_pass.g2().view());
        assert_eq!(second.counts(), single_pass.counts());
        assert_eq!(second.internal_state(), single_pass.internal_state());
    }
}

#[test]
fn checkpoint_with_bad_frame_survives_serialization() {
    let shape = [4, 6];
    let labels = two_roi_labels(shape);
    let mut frames = random_frames(1618, 24, shape);
    frames.index_axis_mut(Axis(0), 4).fill(f64::NAN);

    let mut single_pass = build(labels.view(), 4, None).unwrap();
    single_pass.ingest_batch(frames.view()).unwrap();

    // after 9 frames, the NaN frame has cascaded into levels 1 & 2
    let mut first = build(labels.view(), 4, None).unwrap();
    first.ingest_batch(frames.slice(s![..9, .., ..])).unwrap();
    let state = first.into_internal_state();

    let serialized = serde_json::to_string(&state).unwrap();
    let deserialized: InternalState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized, state);

    let mut resumed = build(labels.view(), 4, Some(deserialized)).unwrap();
    resumed.ingest_batch(frames.slice(s![9.., .., ..])).unwrap();

    assert_bitwise_eq(resumed.g2().view(), single_pass.g2().view());
    assert_eq!(resumed.counts(), single_pass.counts());
    assert_eq!(resumed.internal_state(), single_pass.internal_state());
}

#[test]
fn checkpoint_survives_serialization() {
    let shape = [4, 6];
    let labels = two_roi_labels(shape);
    let frames = random_frames(8675309, 30, shape);

    let mut first = build(labels.view(), 4, None).unwrap();
    first.ingest_batch(frames.slice(s![..13, .., ..])).unwrap();
    let state = first.internal_state();

    let serialized = serde_json::to_string(&state).unwrap();
    let deserialized: InternalState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized, state);

    let mut resumed = build(labels.view(), 4, Some(deserialized)).unwrap();
    resumed.ingest_batch(frames.slice(s![13.., .., ..])).unwrap();
    first.ingest_batch(frames.slice(s![13.., .., ..])).unwrap();

    assert_bitwise_eq(resumed.g2().view(), first.g2().view());
    assert_eq!(resumed.counts(), first.counts());
}

#[test]
fn corrupted_checkpoint_is_rejected() {
    let shape = [4, 6];
    let labels = two_roi_labels(shape);
    let frames = random_frames(31337, 5, shape);

    let mut correlator = build(labels.view(), 4, None).unwrap();
    correlator.ingest_batch(frames.view()).unwrap();
    let state = correlator.into_internal_state();

    // after 5 frames, the level 0 cursor must be 1
    let mut value = serde_json::to_value(&state).unwrap();
    value["pyramid"]["cursors"][0] = serde_json::json!(3);
    let tampered: InternalState = serde_json::from_value(value).unwrap();
    let err = build(labels.view(), 4, Some(tampered)).unwrap_err();
    assert!(err.is_state_corruption());

    let mut value = serde_json::to_value(&state).unwrap();
    value["accum_statepack"] = serde_json::json!([1.0, 2.0]);
    let tampered: InternalState = serde_json::from_value(value).unwrap();
    let err = build(labels.view(), 4, Some(tampered)).unwrap_err();
    assert!(err.is_state_corruption());

    // the untouched state is still fine
    assert!(build(labels.view(), 4, Some(state)).is_ok());
}

#[test]
fn mismatched_checkpoint_is_rejected() {
    let shape = [4, 6];
    let labels = two_roi_labels(shape);
    let frames = random_frames(5, 6, shape);

    let mut correlator = build(labels.view(), 4, None).unwrap();
    correlator.ingest_batch(frames.view()).unwrap();
    let state = correlator.internal_state();

    let err = build(labels.view(), 2, Some(state.clone())).unwrap_err();
    assert!(err.is_state_corruption());

    let other_labels = Array2::<u64>::ones((4, 6));
    let err = build(other_labels.view(), 4, Some(state.clone())).unwrap_err();
    assert!(err.is_state_corruption());

    // configuration errors take precedence over the state
    let err = build(labels.view(), 3, Some(state)).unwrap_err();
    assert!(err.is_configuration());
}
