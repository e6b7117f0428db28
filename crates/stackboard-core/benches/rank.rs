use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use stackboard_core::rank::Rank;
use stackboard_core::reorder::resolve_rank;

const DEPTHS: [usize; 3] = [10, 100, 1_000];

/// Rank produced after `depth` insertions at the same spot between two
/// fixed neighbours, the worst case for rank length.
fn grown_rank(depth: usize) -> (Rank, Rank) {
    let low = Rank::initial();
    let mut high = low.after();
    for _ in 0..depth {
        high = Rank::between(&low, &high);
    }
    (low, high)
}

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank.allocate");

    let r0 = Rank::initial();
    group.bench_function("after", |b| b.iter(|| black_box(r0.after())));
    group.bench_function("before", |b| b.iter(|| black_box(r0.before())));

    for depth in DEPTHS {
        let (low, high) = grown_rank(depth);
        group.throughput(Throughput::Bytes(high.as_str().len() as u64));
        group.bench_with_input(
            BenchmarkId::new("between_same_spot", depth),
            &(low, high),
            |b, (low, high)| b.iter(|| black_box(Rank::between(low, high))),
        );
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank.append");

    for count in DEPTHS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("resolve", count), &count, |b, &count| {
            b.iter(|| {
                let mut last = resolve_rank(None, None);
                for _ in 0..count {
                    last = resolve_rank(Some(&last), None);
                }
                black_box(last)
            });
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let (_, long) = grown_rank(1_000);
    let raw = long.as_str().to_string();
    c.bench_function("rank.parse.long", |b| {
        b.iter(|| black_box(Rank::parse(black_box(&raw))))
    });
}

criterion_group!(benches, bench_allocation, bench_append, bench_parse);
criterion_main!(benches);
