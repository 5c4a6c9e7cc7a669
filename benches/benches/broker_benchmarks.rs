use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use postbox::{Broker, BrokerConfig, DiagnosticLevel, Message, SubscriberId};

/// Брокер без диагностики: иначе бенчмарк «нет слушателей» мерил бы логгер.
fn quiet_broker() -> Broker {
    Broker::with_config(BrokerConfig {
        no_listener_level: DiagnosticLevel::Off,
        ..Default::default()
    })
}

fn bench_subscribe(c: &mut Criterion) {
    let broker = quiet_broker();
    let owner = SubscriberId::next();
    c.bench_function("broker_subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = broker.subscribe(owner, "chan", |_: &mut Message| Ok(()));
            black_box(broker.unsubscribe(&sub));
        })
    });
}

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");
    for observers in [1usize, 10, 100] {
        let broker = quiet_broker();
        let owner = SubscriberId::next();
        for _ in 0..observers {
            broker.subscribe(owner, "chan", |msg: &mut Message| {
                black_box(msg.payload.get_float("myValue")?);
                Ok(())
            });
        }
        let mut msg = Message::new().with("myInfo", "device #").with("myValue", 0.42);

        group.bench_with_input(BenchmarkId::from_parameter(observers), &observers, |b, _| {
            b.iter(|| black_box(broker.publish("chan", &mut msg).unwrap()))
        });
    }
    group.finish();
}

fn bench_publish_no_listeners(c: &mut Criterion) {
    let broker = quiet_broker();
    c.bench_function("publish_no_listeners", |b| {
        b.iter(|| black_box(broker.publish_default("nobody").unwrap()))
    });
}

criterion_group!(
    benches,
    bench_subscribe,
    bench_publish_fanout,
    bench_publish_no_listeners
);
criterion_main!(benches);
