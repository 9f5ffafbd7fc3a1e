use cipherpost_files::{Cksum, cksum};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bench_cksum_sizes(c: &mut Criterion) {
    let sizes: Vec<(usize, &str)> = vec![
        (1024, "1_KiB"),
        (64 * 1024, "64_KiB"),
        (1024 * 1024, "1_MiB"),
    ];

    let mut group = c.benchmark_group("cksum");

    for (size, name) in sizes {
        let data = vec![0x5A; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(name, |b| b.iter(|| cksum(black_box(&data))));
    }

    group.finish();
}

fn bench_cksum_incremental(c: &mut Criterion) {
    let data = vec![0xA5; 1024 * 1024];

    let mut group = c.benchmark_group("cksum_incremental");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("1_MiB_in_4_KiB_chunks", |b| {
        b.iter(|| {
            let mut state = Cksum::new();
            for chunk in black_box(&data).chunks(4096) {
                state.update(chunk);
            }
            state.finalize()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_cksum_sizes, bench_cksum_incremental);
criterion_main!(benches);
