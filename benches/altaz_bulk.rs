use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hifitime::Epoch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skyplan::coordinates::{altaz, altaz_bulk, EquatorialPosition};
use skyplan::observers::Observer;

/// Random J2000 positions, uniform on the sphere.
fn random_positions(rng: &mut StdRng, n: usize) -> Vec<EquatorialPosition> {
    (0..n)
        .map(|_| {
            let ra = rng.random_range(0.0..360.0);
            let dec = rng.random_range(-1.0f64..=1.0).asin().to_degrees();
            EquatorialPosition::j2000(ra, dec)
        })
        .collect()
}

fn bench_altaz(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let observer = Observer::new(48.8566, 2.3522, 35.0, None).unwrap();
    let epoch = Epoch::from_gregorian_utc_hms(2024, 1, 15, 21, 0, 0);
    let samples = 5_000usize;

    c.bench_function("altaz/single_calls", |b| {
        b.iter_batched(
            || random_positions(&mut rng, samples),
            |positions| {
                for p in &positions {
                    black_box(altaz(&observer, p, &epoch).unwrap());
                }
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("altaz/bulk", |b| {
        b.iter_batched(
            || random_positions(&mut rng, samples),
            |positions| black_box(altaz_bulk(&observer, &positions, &epoch).unwrap()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_altaz);
criterion_main!(benches);
