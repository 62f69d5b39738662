use criterion::{criterion_group, criterion_main, Criterion};
use signbook::capture::{Point, SignaturePad};
use signbook::store::{JournalOptions, JournalStore, MemoryStore, SignatureStore};

fn sample_signature() -> String {
    let mut pad = SignaturePad::new();
    pad.draw_stroke([
        Point::new(20.0, 90.0),
        Point::new(140.0, 20.0),
        Point::new(260.0, 90.0),
    ]);
    pad.export().expect("export failed")
}

fn bench_memory_store(c: &mut Criterion) {
    let signature = sample_signature();

    c.bench_function("memory_insert", |b| {
        let store = MemoryStore::new();
        b.iter(|| store.insert("bench", &signature).unwrap())
    });

    let store = MemoryStore::new();
    for i in 0..1000 {
        store.insert(&format!("n{}", i), &signature).unwrap();
    }
    c.bench_function("memory_list_1000", |b| b.iter(|| store.list().unwrap()));
}

fn bench_journal_store(c: &mut Criterion) {
    let signature = sample_signature();
    let dir = tempfile::tempdir().expect("tempdir");
    let opts = JournalOptions {
        sync: false,
        ..Default::default()
    };

    let store = JournalStore::open(dir.path().join("insert.journal"), opts.clone()).unwrap();
    c.bench_function("journal_insert_nosync", |b| {
        b.iter(|| store.insert("bench", &signature).unwrap())
    });

    let path = dir.path().join("replay.journal");
    {
        let store = JournalStore::open(&path, opts.clone()).unwrap();
        for i in 0..1000 {
            store.insert(&format!("n{}", i), &signature).unwrap();
        }
        store.close().unwrap();
    }
    c.bench_function("journal_replay_1000", |b| {
        b.iter(|| JournalStore::open(&path, opts.clone()).unwrap())
    });
}

fn bench_export(c: &mut Criterion) {
    let mut pad = SignaturePad::new();
    pad.draw_stroke([Point::new(20.0, 90.0), Point::new(780.0, 30.0)]);
    c.bench_function("pad_export_800x120", |b| b.iter(|| pad.export().unwrap()));
}

criterion_group!(benches, bench_memory_store, bench_journal_store, bench_export);
criterion_main!(benches);
