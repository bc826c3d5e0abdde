use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use webinput::{InputAccessor, RequestScope, ServerRequest};

fn sample_request(headers: usize) -> ServerRequest {
    let mut request = ServerRequest::new("GET", "http://localhost/search?q=rust&page=2&sort=desc")
        .with_header("Accept", "text/html, application/json;q=0.9")
        .with_header("X-Requested-With", "XMLHttpRequest")
        .with_server_param("REMOTE_ADDR", json!("127.0.0.1"));
    for i in 0..headers {
        request = request.with_header(&format!("X-Custom-{}", i), "value");
    }
    request
}

fn memoized_bag_access_benchmark(c: &mut Criterion) {
    let scope = Arc::new(RequestScope::with_request(sample_request(8)));
    let input = InputAccessor::new(scope);

    c.bench_function("memoized_query_access", |b| {
        b.iter(|| {
            let query = input.query().unwrap();
            black_box(query.get("page"));
        });
    });
}

fn rebuilt_bag_access_benchmark(c: &mut Criterion) {
    let scope = Arc::new(RequestScope::new());
    let input = InputAccessor::new(scope.clone());
    let request = Arc::new(sample_request(8));

    // 每次迭代重新绑定，缓存总是失效
    c.bench_function("rebuilt_query_access", |b| {
        b.iter(|| {
            scope.bind_shared(Arc::clone(&request));
            let query = input.query().unwrap();
            black_box(query.get("page"));
        });
    });
}

fn header_predicates_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_predicates");

    for count in [0, 16, 128].iter() {
        let scope = Arc::new(RequestScope::with_request(sample_request(*count)));
        let input = InputAccessor::new(scope);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                black_box(input.is_ajax().unwrap());
                black_box(input.is_json_expected().unwrap());
                black_box(input.remote_address().unwrap());
            });
        });
    }

    group.finish();
}

fn path_and_method_benchmark(c: &mut Criterion) {
    let scope = Arc::new(RequestScope::with_request(ServerRequest::new(
        "patch",
        "http://localhost/very/long/path/to/resource",
    )));
    let input = InputAccessor::new(scope);

    c.bench_function("path_and_method", |b| {
        b.iter(|| {
            black_box(input.path().unwrap());
            black_box(input.method().unwrap());
        });
    });
}

criterion_group!(
    benches,
    memoized_bag_access_benchmark,
    rebuilt_bag_access_benchmark,
    header_predicates_benchmark,
    path_and_method_benchmark
);
criterion_main!(benches);
