// Benchmarks for datagram sealing and verification.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use sensorlink_proto::codec::{decode, encode};
use sensorlink_proto::datagram::{Address, Encoding, parse_public_header};
use sensorlink_proto::keys::{Credentials, Iv, SymmetricKey};
use sensorlink_proto::time::{assemble_time, disassemble_time};

const PAYLOAD: &[u8] = br#"{"sensor_id":3,"value":21.5,"type":"temperature","unit":"C"}"#;

fn bench_encode(c: &mut Criterion) {
    let address = Address::new("greenhouse/3").unwrap();
    let key = SymmetricKey::new([7u8; 16]);
    let iv = Iv::new([9u8; 16]);

    c.bench_function("encode_json_reading", |b| {
        b.iter(|| {
            encode(
                black_box(&address),
                b"passphrase",
                &key,
                &iv,
                1_700_000_000,
                Encoding::Json,
                black_box(PAYLOAD),
            )
            .unwrap()
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let address = Address::new("greenhouse/3").unwrap();
    let key = SymmetricKey::new([7u8; 16]);
    let datagram = encode(
        &address,
        b"passphrase",
        &key,
        &Iv::new([9u8; 16]),
        1_700_000_000,
        Encoding::Json,
        PAYLOAD,
    )
    .unwrap();

    c.bench_function("decode_json_reading", |b| {
        b.iter(|| decode(black_box(&datagram), b"passphrase", &key).unwrap())
    });

    let mut forged = datagram.clone();
    let last = forged.len() - 1;
    forged[last] ^= 1;
    c.bench_function("decode_rejects_bad_mac", |b| {
        b.iter(|| decode(black_box(&forged), b"passphrase", &key).is_err())
    });

    c.bench_function("parse_public_header", |b| {
        b.iter(|| parse_public_header(black_box(&datagram)).unwrap())
    });
}

fn bench_time(c: &mut Criterion) {
    let address = Address::new("hub").unwrap();
    let creds = Credentials::from_passphrase("passphrase");
    let datagram = assemble_time(&address, &creds, 1_700_000_000).unwrap();

    c.bench_function("assemble_time", |b| {
        b.iter(|| assemble_time(&address, &creds, black_box(1_700_000_000)).unwrap())
    });
    c.bench_function("disassemble_time", |b| {
        b.iter(|| disassemble_time(black_box(&datagram), &address, &creds).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_time);
criterion_main!(benches);
