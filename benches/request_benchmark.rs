use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webinput::ServerRequest;

fn simple_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test\r\n\r\n";

    c.bench_function("simple_request_parse", |b| {
        b.iter(|| {
            let buffer = black_box(request.to_vec());
            let _ = ServerRequest::try_from(&buffer, 0).unwrap();
        });
    });
}

fn complex_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /path/to/resource?id=123&name=test&tags[]=a&tags[]=b HTTP/1.1\r\n\
                    Host: localhost:7878\r\n\
                    User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Language: en-US,en;q=0.9\r\n\
                    Cookie: session=abc123; theme=dark; lang=zh\r\n\
                    X-Requested-With: XMLHttpRequest\r\n\
                    Connection: keep-alive\r\n\
                    \r\n";

    c.bench_function("complex_request_parse", |b| {
        b.iter(|| {
            let buffer = black_box(request.to_vec());
            let _ = ServerRequest::try_from(&buffer, 0).unwrap();
        });
    });
}

fn request_parse_body_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_body");

    let requests = [
        (
            "empty",
            b"POST /submit HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice(),
        ),
        (
            "urlencoded",
            b"POST /submit HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nname=ann&user[email]=a%40b.c&tags[]=x&tags[]=y".as_slice(),
        ),
        (
            "json",
            b"POST /submit HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\r\n{\"name\":\"ann\",\"user\":{\"email\":\"a@b.c\"},\"tags\":[\"x\",\"y\"]}".as_slice(),
        ),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            b.iter(|| {
                let buffer = black_box(request.to_vec());
                let _ = ServerRequest::try_from(&buffer, 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_parse_different_path_lengths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_path_length");

    let paths = [
        ("short", "/"),
        ("medium", "/path/to/resource"),
        ("long", "/very/long/path/to/some/resource/with/many/segments/and/a/query?param1=value1&param2=value2&param3=value3"),
    ];

    for (name, path) in paths.iter() {
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| {
                let buffer = black_box(request.as_bytes().to_vec());
                let _ = ServerRequest::try_from(&buffer, 0).unwrap();
            });
        });
    }

    group.finish();
}

fn request_parse_batch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_batch");

    for count in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let request = b"GET /?q=1 HTTP/1.1\r\nHost: localhost\r\nUser-Agent: Test\r\nAccept: application/json\r\n\r\n";

            b.iter(|| {
                for _ in 0..count {
                    let buffer = black_box(request.to_vec());
                    let _ = ServerRequest::try_from(&buffer, 0).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    simple_request_parse_benchmark,
    complex_request_parse_benchmark,
    request_parse_body_benchmark,
    request_parse_different_path_lengths_benchmark,
    request_parse_batch_benchmark
);
criterion_main!(benches);
