use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use multitau::{CorrelatorBuilder, MultiTauCorrelator, Reduction};
use ndarray::{Array2, Array3};
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

const N_FRAMES: usize = 64;

fn random_frames(shape: [usize; 2], seed: u64) -> Array3<u16> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let dist = Uniform::try_from(0..=1000_u16).unwrap();
    Array3::from_shape_simple_fn((N_FRAMES, shape[0], shape[1]), || dist.sample(&mut rng))
}

/// 8 horizontal bands
fn band_labels(shape: [usize; 2]) -> Array2<u64> {
    Array2::from_shape_fn((shape[0], shape[1]), |(i, _)| 1 + (8 * i / shape[0]) as u64)
}

fn help_setup_criterion_benchmark(c: &mut Criterion, reduction: Reduction) {
    let mut group = c.benchmark_group(format!("{reduction:?}"));
    for side in [32usize, 64, 128, 256].into_iter() {
        let shape = [side, side];
        let labels = band_labels(shape);
        let frames = random_frames(shape, 2525365464_u64);
        let setup_fn = || -> MultiTauCorrelator {
            CorrelatorBuilder::new()
                .num_levels(6)
                .num_bufs(8)
                .labels(labels.view())
                .reduction(reduction)
                .build()
                .unwrap()
        };

        group.throughput(Throughput::Elements((N_FRAMES * side * side) as u64));
        group.bench_with_input(
            BenchmarkId::new("ingest_batch", side),
            &frames,
            |b, frames: &Array3<u16>| {
                b.iter_batched_ref(
                    setup_fn,
                    |correlator: &mut MultiTauCorrelator| correlator.ingest_batch(frames.view()),
                    BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

fn criterion_benchmark(c: &mut Criterion) {
    help_setup_criterion_benchmark(c, Reduction::RoiMean);
    help_setup_criterion_benchmark(c, Reduction::PixelResolved);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
