use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rundown_core::objective::ObjectiveKind;
use rundown_core::random::Generator;
use rundown_core::validate::validate_level;
use rundown_core::{build_level, build_rundown, Bulkhead, Complex, GenerationConfig, LayoutOptions, LevelRequest, Tier};

fn bench_random_engine(c: &mut Criterion) {
    let table: Vec<(f64, u32)> = (0..16).map(|i| (1.0 + i as f64, i)).collect();

    c.bench_function("select_16", |b| {
        let mut rng = Generator::seeded("bench");
        b.iter(|| rng.select(black_box(&table)).copied())
    });

    c.bench_function("seed_from_str", |b| {
        b.iter(|| Generator::seeded(black_box("test-1")))
    });
}

fn bench_level_build(c: &mut Criterion) {
    c.bench_function("build_level_c_gather", |b| {
        let request = LevelRequest::new(Tier::C, 1, Complex::Mining)
            .with_objective(Bulkhead::Main, ObjectiveKind::GatherSmallItems);
        b.iter(|| {
            let mut rng = Generator::seeded("test-1");
            build_level(&mut rng, LayoutOptions::default(), black_box(&request))
        })
    });

    c.bench_function("build_level_e_three_bulkheads", |b| {
        let request = LevelRequest::new(Tier::E, 1, Complex::Tech)
            .with_bulkheads(&[Bulkhead::Extreme, Bulkhead::Overload]);
        b.iter(|| {
            let mut rng = Generator::seeded("heavy");
            build_level(&mut rng, LayoutOptions::default(), black_box(&request))
        })
    });

    c.bench_function("validate_level_e", |b| {
        let mut rng = Generator::seeded("validate");
        let request = LevelRequest::new(Tier::E, 1, Complex::Mining).with_bulkheads(&[Bulkhead::Extreme]);
        let level = build_level(&mut rng, LayoutOptions::default(), &request).unwrap();
        b.iter(|| validate_level(black_box(&level)))
    });
}

fn bench_rundown(c: &mut Criterion) {
    let config = GenerationConfig::default().with_seed("weekly");
    c.bench_function("build_rundown_default", |b| {
        b.iter(|| build_rundown(black_box(&config)))
    });
}

criterion_group!(benches, bench_random_engine, bench_level_build, bench_rundown);
criterion_main!(benches);
