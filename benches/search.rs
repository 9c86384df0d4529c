use criterion::{criterion_group, BenchmarkId, Criterion};
use hmsearch::{proper_buckets, HmIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const LENGTH: u32 = 64;
const ALPHABET: u32 = 256;
const RANGE: u32 = 4;

fn bench_build(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(5);
    eprintln!("Generating random keys...");
    let keys_buf: Vec<[u8; 64]> = (0..1 << 12)
        .map(|_| {
            let mut k = [0u8; 64];
            rng.fill(&mut k[..]);
            k
        })
        .collect();
    let keys: Vec<&[u8]> = keys_buf.iter().map(|k| &k[..]).collect();
    eprintln!("Done.");

    c.bench_function("build_4096_keys", |bencher| {
        bencher.iter(|| HmIndex::build(&keys, LENGTH, ALPHABET, proper_buckets(RANGE)));
    });
}

fn bench_search(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(5);
    eprintln!("Generating random keys...");
    let all_keys: Vec<[u8; 64]> = (0..1 << 16)
        .map(|_| {
            let mut k = [0u8; 64];
            rng.fill(&mut k[..]);
            k
        })
        .collect();
    eprintln!("Done.");

    let mut group = c.benchmark_group("search");
    for &magnitude in &[10u32, 13, 16] {
        let total = 1usize << magnitude;
        eprintln!("Building index over {} keys...", total);
        let keys: Vec<&[u8]> = all_keys[..total].iter().map(|k| &k[..]).collect();
        let index = HmIndex::build(&keys, LENGTH, ALPHABET, proper_buckets(RANGE));
        eprintln!("Done.");

        let mut cycle = (0..total).cycle();
        group.bench_with_input(BenchmarkId::new("radius_4", total), &total, |bencher, _| {
            bencher.iter(|| {
                let i = cycle.next().unwrap();
                let mut results = 0u32;
                index.search(&all_keys[i], RANGE, |_| results += 1);
                assert!(results >= 1);
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_build, bench_search
}
