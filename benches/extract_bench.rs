use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fsfreader::{build_index, FsfReader, Scramble};
use std::io::Cursor;

#[path = "../tests/common/mod.rs"]
mod common;

use common::ContainerBuilder;

/// 32 files of 16 KiB each, data blocks interleaved across the container.
fn container() -> Vec<u8> {
    let files = 32u32;
    let blocks_per_file = 32u32;
    let content: Vec<u8> = (0..16 * 1024).map(|i| (i % 251) as u8).collect();
    let mut b = ContainerBuilder::new(1);
    for f in 0..files {
        let index_block = 1 + f;
        let next_index = if f + 1 == files { 0 } else { index_block + 1 };
        let chain: Vec<u32> = (0..blocks_per_file).map(|i| files + 1 + i * files + f).collect();
        b.file(index_block, next_index, format!("page_{f}.xml").as_bytes(), &chain, &content);
    }
    b.build()
}

fn bench_index_and_extract(c: &mut Criterion) {
    let data = container();

    c.bench_function("build_index_32_files", |b| {
        b.iter(|| {
            let mut reader = FsfReader::new(Cursor::new(black_box(&data[..]))).unwrap();
            build_index(&mut reader).unwrap()
        })
    });

    c.bench_function("extract_32x16k_in_memory", |b| {
        b.iter(|| {
            let mut reader = FsfReader::new(Cursor::new(black_box(&data[..]))).unwrap();
            let index = build_index(&mut reader).unwrap();
            let mut total = 0;
            for entry in &index.entries {
                total += reader.extract_file(entry).unwrap().data.len();
            }
            total
        })
    });
}

fn bench_scramble(c: &mut Criterion) {
    let data = vec![0x5au8; 64 * 1024];
    let mut scramble = Scramble::new();
    scramble.derive_key("0123456789abcdef", "saltsalt").unwrap();
    let cipher = scramble.encrypt(&data).unwrap();

    c.bench_function("derive_key_sha1_x5", |b| {
        b.iter(|| Scramble::new().derive_key(black_box("0123456789abcdef"), "saltsalt").map(|_| ()).unwrap())
    });
    c.bench_function("decrypt_64k", |b| b.iter(|| scramble.decrypt(black_box(&cipher)).unwrap()));
    c.bench_function("encrypt_64k", |b| b.iter(|| scramble.encrypt(black_box(&data)).unwrap()));
}

criterion_group!(benches, bench_index_and_extract, bench_scramble);
criterion_main!(benches);
