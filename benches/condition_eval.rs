use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tomoyo_cond::condition::{
    parse, GroupRegistry, MiniStat, ObjectInfo, RequestInfo, StaticPathNode, TaskCredentials,
};
use tomoyo_cond::ConditionEngine;

const PATH_CONDITION: &str = "task.uid=path1.uid path1.type=file path1.perm=owner_execute \
                              path1.parent.uid=0 path1.parent.perm=sticky";

fn file_request() -> RequestInfo {
    let dir = StaticPathNode::new(MiniStat {
        uid: 0,
        mode: 0o41777,
        ..MiniStat::default()
    });
    let file = StaticPathNode::new(MiniStat {
        uid: 1000,
        gid: 1000,
        ino: 4242,
        mode: 0o100755,
        ..MiniStat::default()
    })
    .with_parent(dir);

    RequestInfo::new(TaskCredentials::with_ids(1000, 1000))
        .with_object(ObjectInfo::new().with_path1(Arc::new(file)))
}

/// Benchmark compiling expressions of increasing length
fn bench_parse(c: &mut Criterion) {
    let clause_counts = vec![1, 8, 64];
    let groups = GroupRegistry::new();

    let mut group = c.benchmark_group("parse");

    for count in clause_counts {
        let expr = (0..count)
            .map(|i| format!("task.uid!={}-{}", i * 10, i * 10 + 5))
            .collect::<Vec<_>>()
            .join(" ");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &expr, |b, expr| {
            b.iter(|| black_box(parse(expr, &groups).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark evaluation with attributes already fetched (hot path)
fn bench_eval_cached(c: &mut Criterion) {
    let engine = ConditionEngine::new_default();
    let cond = engine.compile(PATH_CONDITION).unwrap();

    let mut group = c.benchmark_group("eval_cached");
    group.bench_function("path_condition", |b| {
        let mut request = file_request();
        b.iter(|| black_box(engine.evaluate(Some(&cond), &mut request)));
    });
    group.finish();
}

/// Benchmark evaluation on a fresh request each time (attribute fetch)
fn bench_eval_uncached(c: &mut Criterion) {
    let engine = ConditionEngine::new_default();
    let cond = engine.compile(PATH_CONDITION).unwrap();

    let mut group = c.benchmark_group("eval_uncached");
    group.bench_function("path_condition", |b| {
        b.iter(|| {
            let mut request = file_request();
            black_box(engine.evaluate(Some(&cond), &mut request))
        });
    });
    group.finish();
}

/// Benchmark group membership tests against groups of increasing size
fn bench_group_membership(c: &mut Criterion) {
    let member_counts = vec![4, 64, 1024];

    let mut group = c.benchmark_group("group_membership");

    for count in member_counts {
        let engine = ConditionEngine::new_default();
        let members: Vec<String> = (0..count).map(|i| format!("{}", i * 2)).collect();
        engine.groups().define_literals("uids", &members).unwrap();
        let cond = engine.compile("task.uid=@uids").unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let uid = rand::random::<u32>() % (count as u32 * 2);
                let mut request = RequestInfo::new(TaskCredentials::with_ids(uid, 0));
                black_box(engine.evaluate(Some(&cond), &mut request))
            });
        });
    }

    group.finish();
}

/// Benchmark committing a duplicate into stores of increasing size
fn bench_commit_duplicate(c: &mut Criterion) {
    let store_sizes = vec![10, 100, 1000];

    let mut group = c.benchmark_group("commit_duplicate");

    for size in store_sizes {
        let engine = ConditionEngine::new_default();
        let kept: Vec<_> = (0..size)
            .map(|i| engine.compile(&format!("task.uid={}", i)).unwrap())
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(engine.compile("task.uid=0").unwrap()));
        });
        drop(kept);
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_eval_cached,
    bench_eval_uncached,
    bench_group_membership,
    bench_commit_duplicate
);
criterion_main!(benches);
