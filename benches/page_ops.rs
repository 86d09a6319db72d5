//! Criterion micro-benchmarks for page allocation and reclamation.

use criterion::{criterion_group, criterion_main, Criterion};
use lifo_page::{Page, DEFAULT_PAGE_SIZE};
use std::hint::black_box;

const BLOCKS: usize = 64;

fn bench_allocate_release_in_order(c: &mut Criterion) {
    let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
    let mut page = Page::<DEFAULT_PAGE_SIZE>::new(&mut buf).unwrap();
    let mut blocks = Vec::with_capacity(BLOCKS);
    c.bench_function("allocate_release_lifo_64", |b| {
        b.iter(|| {
            for _ in 0..BLOCKS {
                blocks.push(page.allocate(black_box(256)).unwrap());
            }
            while let Some(block) = blocks.pop() {
                page.deallocate(block);
            }
        });
    });
}

fn bench_allocate_release_reversed(c: &mut Criterion) {
    let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
    let mut page = Page::<DEFAULT_PAGE_SIZE>::new(&mut buf).unwrap();
    let mut blocks = Vec::with_capacity(BLOCKS);
    // Oldest first: every free but the last only marks, the last compacts all.
    c.bench_function("allocate_release_buried_64", |b| {
        b.iter(|| {
            for _ in 0..BLOCKS {
                blocks.push(page.allocate(black_box(256)).unwrap());
            }
            for block in blocks.drain(..) {
                page.deallocate(block);
            }
        });
    });
}

fn bench_exhaustion(c: &mut Criterion) {
    let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
    let mut page = Page::<DEFAULT_PAGE_SIZE>::new(&mut buf).unwrap();
    let mut blocks = Vec::new();
    c.bench_function("allocate_until_exhausted", |b| {
        b.iter(|| {
            while let Some(block) = page.allocate(black_box(1024)) {
                blocks.push(block);
            }
            while let Some(block) = blocks.pop() {
                page.deallocate(block);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_release_in_order,
    bench_allocate_release_reversed,
    bench_exhaustion,
);
criterion_main!(benches);
