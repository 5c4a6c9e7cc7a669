use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};

use postbox::Message;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Disconnect {
    my_thing: i64,
    my_ohter_thing: String,
}

fn bench_typed_getters(c: &mut Criterion) {
    let msg = Message::new()
        .with("myThing", 1)
        .with("myOhterThing", "banana");
    c.bench_function("payload_typed_getters", |b| {
        b.iter(|| {
            black_box(msg.payload.get_int("myThing").unwrap());
            black_box(msg.payload.get_str("myOhterThing").unwrap());
        })
    });
}

fn bench_from_data_decode(c: &mut Criterion) {
    let data = Disconnect {
        my_thing: 1,
        my_ohter_thing: "banana".to_string(),
    };
    c.bench_function("payload_from_data", |b| {
        b.iter(|| black_box(Message::from_data(black_box(&data)).unwrap()))
    });

    let msg = Message::from_data(&data).unwrap();
    c.bench_function("payload_decode", |b| {
        b.iter(|| black_box(msg.decode::<Disconnect>().unwrap()))
    });
}

fn bench_extension(c: &mut Criterion) {
    let msg = Message::new().with_extension(Disconnect {
        my_thing: 1,
        my_ohter_thing: "banana".to_string(),
    });
    c.bench_function("extension_downcast", |b| {
        b.iter(|| black_box(msg.extension::<Disconnect>().unwrap().my_thing))
    });
}

criterion_group!(
    benches,
    bench_typed_getters,
    bench_from_data_decode,
    bench_extension
);
criterion_main!(benches);
