use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stegfs::crypto::{CipherContext, IV_LEN, KEY_LEN};
use stegfs::{Block, BLOCK_SIZE};

fn ctx() -> CipherContext {
    CipherContext::new(&[7u8; KEY_LEN], &[9u8; IV_LEN])
}

fn sample_block() -> Block {
    let mut block = Block::zeroed();
    block.path_tag = [1u8; 16];
    block.data[..11].copy_from_slice(b"hello world");
    block.set_next_index(42);
    block
}

fn bench_block_codec(c: &mut Criterion) {
    let ctx = ctx();
    let raw: [u8; BLOCK_SIZE] = sample_block().encode(&ctx).unwrap();

    c.bench_function("block_encode", |b| {
        b.iter(|| sample_block().encode(black_box(&ctx)).unwrap())
    });
    c.bench_function("block_decode", |b| {
        b.iter(|| Block::decode(black_box(&raw), black_box(&ctx)).unwrap())
    });
}

criterion_group!(benches, bench_block_codec);
criterion_main!(benches);
