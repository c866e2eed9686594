use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tracewrap::trace::Tracer;
use tracewrap::Context;

fn criterion_benchmark(c: &mut Criterion) {
    let tracer = Tracer::builder().build();

    let mut group = c.benchmark_group("context");

    group.bench_function("current()", |b| {
        b.iter(|| {
            black_box(Context::current());
        })
    });

    group.bench_function("map_current(|cx| cx.has_active_span())", |b| {
        b.iter(|| {
            black_box(Context::map_current(|cx| cx.has_active_span()));
        })
    });

    group.bench_function("attach/detach", |b| {
        let span = tracer.start_span("bench");
        b.iter(|| {
            let guard = tracer.with_scope(&span);
            black_box(&guard);
        })
    });

    group.bench_function("in_scope(noop)", |b| {
        b.iter(|| {
            let span = tracer.start_span("bench");
            black_box(tracer.in_scope(span, || ()));
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
