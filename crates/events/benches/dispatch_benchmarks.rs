use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cloudrelay_events::{
    AUDIT_LOG_WRITTEN, DecodedPayload, Dispatcher, Envelope, MESSAGE_PUBLISHED, PUBSUB_PUBLISH,
};

fn envelope(event_type: &str, data: Vec<u8>) -> Envelope {
    Envelope::builder()
        .id("bench")
        .event_type(event_type)
        .source("//bench")
        .content_type("application/json")
        .data(data)
        .build()
        .expect("valid bench envelope")
}

fn bench_dispatch_by_type(c: &mut Criterion) {
    let dispatcher = Dispatcher::default();
    let mut group = c.benchmark_group("dispatch_by_type");

    let cases = [
        (PUBSUB_PUBLISH, br#"{"data":"fooo"}"#.to_vec()),
        (
            MESSAGE_PUBLISHED,
            format!(r#"{{"message":{{"data":"{}","messageId":"1"}}}}"#, STANDARD.encode(b"fooo"))
                .into_bytes(),
        ),
        (
            AUDIT_LOG_WRITTEN,
            br#"{"severity":"ERROR","logName":"projects/p/logs/activity","protoPayload":{"methodName":"x"}}"#
                .to_vec(),
        ),
    ];

    for (event_type, data) in cases {
        let env = envelope(event_type, data);
        group.bench_function(event_type, |b| {
            b.iter(|| {
                dispatcher
                    .dispatch(black_box(&env), |p: DecodedPayload| p.kind())
                    .expect("dispatch")
            })
        });
    }

    let unknown = envelope("not.a.real.type", b"{}".to_vec());
    group.bench_function("unknown_type", |b| {
        b.iter(|| dispatcher.dispatch(black_box(&unknown), |_| ()).is_err())
    });

    group.finish();
}

fn bench_message_size(c: &mut Criterion) {
    let dispatcher = Dispatcher::default();
    let mut group = c.benchmark_group("message_published_size");

    for size in [64usize, 4 * 1024, 256 * 1024] {
        let payload = vec![b'x'; size];
        let data = format!(r#"{{"message":{{"data":"{}"}}}}"#, STANDARD.encode(&payload));
        let env = envelope(MESSAGE_PUBLISHED, data.into_bytes());

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &env, |b, env| {
            b.iter(|| dispatcher.dispatch(black_box(env), |_| ()).expect("dispatch"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch_by_type, bench_message_size);
criterion_main!(benches);
