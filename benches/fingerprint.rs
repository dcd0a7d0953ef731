use criterion::{black_box, criterion_group, criterion_main, Criterion};

use maskfleet::fingerprint::{similarity, validate, Fingerprint, FingerprintGenerator};

fn bench_generate(c: &mut Criterion) {
    c.bench_function("generate", |b| {
        let mut generator = FingerprintGenerator::with_seed(1);
        b.iter(|| black_box(generator.generate(None)));
    });
}

fn bench_validate(c: &mut Criterion) {
    let fp = FingerprintGenerator::with_seed(2).generate(None);
    c.bench_function("validate", |b| {
        b.iter(|| black_box(validate(black_box(&fp))));
    });
}

fn bench_similarity(c: &mut Criterion) {
    let population: Vec<Fingerprint> = (0..100)
        .map(|seed| FingerprintGenerator::with_seed(seed).generate(None))
        .collect();
    let probe = FingerprintGenerator::with_seed(500).generate(None);

    c.bench_function("similarity_vs_100", |b| {
        b.iter(|| {
            for other in &population {
                black_box(similarity(black_box(&probe), other));
            }
        });
    });
}

criterion_group!(benches, bench_generate, bench_validate, bench_similarity);
criterion_main!(benches);
