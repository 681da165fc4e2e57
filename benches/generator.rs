use criterion::{criterion_group, criterion_main, Criterion};
use serial_keygen::*;

fn generate_key(generator: &Generator) {
    let _ = generator.generate("a-reasonably-long-username");
}

fn criterion_benchmark(c: &mut Criterion) {
    let generator = Generator::new(WideCharPolicy::Reject);
    c.bench_function("generate_key", |b| b.iter(|| generate_key(&generator)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
