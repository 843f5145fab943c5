// Trial benchmark - one aligned and one non-aligned workload
//
// Runs the full driver against the in-memory writer so the numbers reflect
// generation plus encoding, without disk I/O.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tsbench::{BenchConfig, Driver};
use tsbench_writer::{DataType, ParquetTsWriter, WriterSettings};

const POINTS: usize = 1_000;

fn workload(aligned: bool) -> BenchConfig {
    let mut config = BenchConfig::default();
    config.workload.devices = 20;
    config.workload.sensors = 10;
    config.workload.points = vec![POINTS];
    config.workload.data_type = DataType::Double;
    config.workload.aligned = aligned;
    config
}

fn bench_trial(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_trial");
    group.sample_size(10);

    for aligned in [true, false] {
        let config = workload(aligned);
        let points = (config.workload.devices * config.workload.sensors * POINTS) as u64;
        group.throughput(Throughput::Elements(points));

        let label = if aligned { "aligned" } else { "non_aligned" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &config, |b, config| {
            b.iter(|| {
                let mut writer = ParquetTsWriter::in_memory(WriterSettings::default());
                Driver::new(config, POINTS).run(&mut writer).unwrap();
                black_box(writer.into_bytes().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_trial);
criterion_main!(benches);
