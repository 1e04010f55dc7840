use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use nox_relay::core::ObfuscationKey;
use nox_relay::protocol::message::{MsgAccepted, MsgTextMessage, MsgTimestamp};
use nox_relay::protocol::{append, split, DecodeState, Interceptor, Message};

#[allow(clippy::unwrap_used)]
fn frame(count: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..count {
        let msg: Message = match i % 3 {
            0 => MsgTimestamp {
                timestamp: i as u16,
            }
            .into(),
            1 => MsgAccepted { id: i as u32 }.into(),
            _ => MsgTextMessage {
                sender: 1,
                flags: 0,
                text: "gg".repeat(8),
            }
            .into(),
        };
        append(&mut out, &msg).unwrap();
    }
    out
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_frame");
    let state = DecodeState::new(false);

    for &count in &[1usize, 8, 64] {
        let payload = frame(count);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_function(format!("split_{count}_msgs"), |b| {
            b.iter(|| {
                let parts = split(black_box(&payload), &state);
                assert!(parts.fully_split);
            })
        });
    }

    group.finish();
}

fn bench_intercept(c: &mut Criterion) {
    let mut group = c.benchmark_group("intercept_server");
    let interceptor = Interceptor::default();
    let accept = [0x80u8, 0x00, 0x14, 0x01, 0x00, 0x00, 0x00, 0x37];
    let plain = frame(8);

    group.bench_function("server_accept", |b| {
        b.iter_batched(
            ObfuscationKey::new,
            |key| interceptor.intercept_server(&key, black_box(&accept)).len(),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("pass_through", |b| {
        let key = ObfuscationKey::new();
        b.iter(|| interceptor.intercept_server(&key, black_box(&plain)).len())
    });

    group.finish();
}

criterion_group!(benches, bench_split, bench_intercept);
criterion_main!(benches);
