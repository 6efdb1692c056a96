use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use binmap::{ActivateBinMap, BrandedBinMap, GhostToken};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Key whose hash ignores most of its bits, forcing long collision runs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Adversarial(u64);

impl Hash for Adversarial {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0 % 4);
    }
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinMap Insert");

    for size in [1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::new("std::HashMap", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = HashMap::new();
                for i in 0..size {
                    map.insert(black_box(i), black_box(i));
                }
                map
            })
        });

        group.bench_with_input(BenchmarkId::new("BrandedBinMap", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = BrandedBinMap::new();
                for i in 0..size {
                    map.insert(black_box(i), black_box(i));
                }
                map.len()
            })
        });

        group.bench_with_input(BenchmarkId::new("ActiveBinMap", size), &size, |b, &size| {
            b.iter(|| {
                GhostToken::new(|mut token| {
                    let mut map = BrandedBinMap::new();
                    let mut active = map.activate(&mut token);
                    for i in 0..size {
                        active.put(black_box(i), black_box(i));
                    }
                    active.len()
                })
            })
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinMap Get");
    let size = 10_000u64;

    let std_map: HashMap<u64, u64> = (0..size).map(|i| (i, i)).collect();
    group.bench_function("std::HashMap", |b| {
        b.iter(|| {
            for i in 0..size {
                black_box(std_map.get(&i));
            }
        })
    });

    GhostToken::new(|token| {
        let map: BrandedBinMap<'_, u64, u64> = (0..size).map(|i| (i, i)).collect();
        group.bench_function("BrandedBinMap", |b| {
            b.iter(|| {
                for i in 0..size {
                    black_box(map.get(&token, &i));
                }
            })
        });
    });

    group.finish();
}

fn bench_adversarial(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinMap Adversarial Keys");
    let size = 2_000u64;

    group.bench_function("std::HashMap", |b| {
        b.iter(|| {
            let mut map = HashMap::new();
            for i in 0..size {
                map.insert(Adversarial(i), i);
            }
            for i in 0..size {
                black_box(map.get(&Adversarial(i)));
            }
        })
    });

    group.bench_function("BrandedBinMap", |b| {
        b.iter(|| {
            GhostToken::new(|token| {
                let mut map = BrandedBinMap::new();
                for i in 0..size {
                    map.insert(Adversarial(i), i);
                }
                for i in 0..size {
                    black_box(map.get(&token, &Adversarial(i)));
                }
            })
        })
    });

    group.bench_function("BrandedBinMap natural order", |b| {
        b.iter(|| {
            GhostToken::new(|token| {
                let mut map = BrandedBinMap::new().with_natural_order();
                for i in 0..size {
                    map.insert(Adversarial(i), i);
                }
                for i in 0..size {
                    black_box(map.get(&token, &Adversarial(i)));
                }
            })
        })
    });

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("BinMap Remove");
    let size = 10_000u64;

    group.bench_function("BrandedBinMap", |b| {
        b.iter(|| {
            let mut map: BrandedBinMap<'_, u64, u64> = (0..size).map(|i| (i, i)).collect();
            for i in 0..size {
                black_box(map.remove(&i));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_adversarial, bench_remove);
criterion_main!(benches);
