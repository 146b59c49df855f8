use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kernel_checkpoint::{CheckpointMetadata, Checkpointer, MemoryCheckpointer};

fn checkpoint_put_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("memory checkpoint put", |b| {
        b.to_async(&runtime).iter(|| async {
            let saver = MemoryCheckpointer::new();
            saver
                .put("bench-thread", black_box(vec![0u8; 1024]), CheckpointMetadata::new("bench"))
                .await
                .unwrap();
        });
    });
}

fn checkpoint_get_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("memory checkpoint get", |b| {
        b.to_async(&runtime).iter(|| async {
            let saver = MemoryCheckpointer::new();
            saver
                .put("bench-thread", vec![0u8; 1024], CheckpointMetadata::new("bench"))
                .await
                .unwrap();
            saver.get(black_box("bench-thread"), None).await.unwrap();
        });
    });
}

criterion_group!(benches, checkpoint_put_benchmark, checkpoint_get_benchmark);
criterion_main!(benches);
