use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use skyplan::astrophotography::{best_imaging_time, ImagingRequest};
use skyplan::cancel::CancelToken;
use skyplan::catalog::{Target, TargetCatalog};
use skyplan::config::{AstrophotographySettings, EventSettings};
use skyplan::ephemeris::AnalyticEphemeris;
use skyplan::solar_events::solar_lunar_events;
use skyplan::time::CalendarDate;

fn bench_night_scan(c: &mut Criterion) {
    let targets = TargetCatalog::builtin().unwrap();
    let date = CalendarDate::new(2024, 1, 15).unwrap();
    let settings = AstrophotographySettings::default();
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("night_scan");
    group.sample_size(20);

    let m42 = ImagingRequest::new(targets.find("M42").unwrap(), 48.8566, 2.3522, date);
    group.bench_function("deep_sky", |b| {
        b.iter(|| black_box(best_imaging_time(&m42, &AnalyticEphemeris, &settings, &cancel).unwrap()))
    });

    let jupiter = ImagingRequest::new(targets.find("jupiter").unwrap(), 48.8566, 2.3522, date);
    group.bench_function("planet", |b| {
        b.iter(|| black_box(best_imaging_time(&jupiter, &AnalyticEphemeris, &settings, &cancel).unwrap()))
    });

    let polaris = ImagingRequest::new(Target::coordinates(37.95, 89.26).unwrap(), 48.8566, 2.3522, date);
    group.bench_function("coordinates", |b| {
        b.iter(|| black_box(best_imaging_time(&polaris, &AnalyticEphemeris, &settings, &cancel).unwrap()))
    });

    group.bench_function("events_7_days", |b| {
        b.iter(|| {
            black_box(
                solar_lunar_events(
                    48.8566,
                    2.3522,
                    date,
                    7,
                    &AnalyticEphemeris,
                    &EventSettings::default(),
                    &cancel,
                )
                .unwrap(),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_night_scan);
criterion_main!(benches);
