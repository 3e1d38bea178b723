//! Performance benchmarks for message chunking
//!
//! Tests chunking time for different message lengths, emote densities,
//! and native span counts. Run with: cargo bench

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lantern::chat::chunk_message;
use lantern::models::{Emote, EmoteProvider, EmoteSpan};

/// Build a lookup table of third-party emotes named Kappa0..KappaN.
fn emote_table(count: usize) -> HashMap<String, Emote> {
    (0..count)
        .map(|i| {
            let name = format!("Kappa{}", i);
            let emote = Emote::new(
                name.clone(),
                format!("https://cdn.example/{}/1x", i),
                EmoteProvider::SevenTv,
            );
            (name, emote)
        })
        .collect()
}

/// Generate a message of `words` words where every third word is an emote
/// from the table and the rest never match.
fn generate_emote_dense_text(words: usize) -> String {
    (0..words)
        .map(|i| {
            if i % 3 == 0 {
                format!("Kappa{}", i % 50)
            } else {
                format!("word{}", i)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate plain prose with no emote hits at all.
fn generate_plain_text(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a message of repeated native emotes with their tag spans.
fn generate_native_spans(count: usize) -> (String, Vec<EmoteSpan>) {
    let word = "Kappa";
    let text = std::iter::repeat(word)
        .take(count)
        .collect::<Vec<_>>()
        .join(" ");
    let spans = (0..count)
        .map(|i| {
            let start = i * (word.len() + 1);
            EmoteSpan {
                emote_id: "25".to_string(),
                start,
                end: start + word.len() - 1,
            }
        })
        .collect();
    (text, spans)
}

/// Benchmark chunking of plain text where no word resolves to an emote
fn bench_chunk_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_plain_text");
    let table = emote_table(1000);

    for words in [10, 50, 200].iter() {
        let text = generate_plain_text(*words);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_words", words)),
            &text,
            |b, text| {
                b.iter(|| {
                    let chunks =
                        chunk_message(black_box(text), &[], |word| table.get(word).cloned());
                    black_box(chunks)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark chunking where every third word resolves to an emote
fn bench_chunk_emote_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_emote_dense");
    let table = emote_table(1000);

    for words in [10, 50, 200].iter() {
        let text = generate_emote_dense_text(*words);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_words", words)),
            &text,
            |b, text| {
                b.iter(|| {
                    let chunks =
                        chunk_message(black_box(text), &[], |word| table.get(word).cloned());
                    black_box(chunks)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the native span splitting pass
fn bench_chunk_native_spans(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_native_spans");

    for count in [1, 10, 50].iter() {
        let (text, spans) = generate_native_spans(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_spans", count)),
            &(text, spans),
            |b, (text, spans)| {
                b.iter(|| {
                    let chunks = chunk_message(black_box(text), black_box(spans), |_| None);
                    black_box(chunks)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_plain_text,
    bench_chunk_emote_dense,
    bench_chunk_native_spans,
);

criterion_main!(benches);
