use criterion::{black_box, criterion_group, criterion_main, Criterion};
use attestor_core::{IgnoreRuleSet, TreeHasher};

fn build_tree(root: &std::path::Path) {
    for dir in 0..16 {
        let sub = root.join(format!("pkg{dir}"));
        std::fs::create_dir_all(&sub).unwrap();
        for file in 0..32 {
            let content = format!("module {dir}/{file}\n").repeat(256);
            std::fs::write(sub.join(format!("f{file}.txt")), content).unwrap();
        }
    }
}

fn bench_tree_hash(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let rules = IgnoreRuleSet::new(["**/f0.txt"]).unwrap();

    c.bench_function("hash_dir_sequential", |b| {
        let hasher = TreeHasher::new(false);
        b.iter(|| hasher.hash_dir(black_box(dir.path()), &rules).unwrap())
    });

    c.bench_function("hash_dir_parallel", |b| {
        let hasher = TreeHasher::new(true);
        b.iter(|| hasher.hash_dir(black_box(dir.path()), &rules).unwrap())
    });
}

criterion_group!(benches, bench_tree_hash);
criterion_main!(benches);
