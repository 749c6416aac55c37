use criterion::{black_box, criterion_group, criterion_main, Criterion};
use decoder_core::models::{BackoffLm, MemoryPhraseTable};
use decoder_core::{Decoder, DecoderConfig, Models, Vocabulary};
use std::collections::BTreeMap;
use std::sync::Arc;

const WORDS: usize = 40;

/// A synthetic model with two translations per word, a bigram phrase per
/// adjacent pair and a bigram LM over the target words.
fn build_decoder(parallel_expansion: bool) -> (Decoder, String) {
    let vocab = Arc::new(Vocabulary::new());
    let mut table = MemoryPhraseTable::new(1);
    let mut lm = BackoffLm::new(2);
    lm.insert_text(&vocab, "<s>", -99.0, -0.5);
    lm.insert_text(&vocab, "</s>", -2.0, 0.0);
    for i in 0..WORDS {
        let score = -0.1 * (i % 7) as f32 - 0.2;
        table.insert_text(&vocab, &format!("s{i}"), &format!("t{i}"), vec![score]);
        table.insert_text(&vocab, &format!("s{i}"), &format!("u{i}"), vec![score - 0.4]);
        lm.insert_text(&vocab, &format!("t{i}"), -3.0, -0.4);
        lm.insert_text(&vocab, &format!("u{i}"), -3.5, -0.4);
        if i + 1 < WORDS {
            table.insert_text(
                &vocab,
                &format!("s{i} s{}", i + 1),
                &format!("t{i} t{}", i + 1),
                vec![score - 0.1],
            );
            lm.insert_text(&vocab, &format!("t{i} t{}", i + 1), -0.5, 0.0);
        }
    }
    let config = DecoderConfig {
        weights: BTreeMap::from([
            ("tm".to_string(), vec![1.0]),
            ("distortion".to_string(), vec![0.3]),
            ("word_penalty".to_string(), vec![-0.2]),
            ("unknown_word_penalty".to_string(), vec![-100.0]),
            ("lm0".to_string(), vec![0.8]),
        ]),
        stack_size: 100,
        parallel_expansion,
        ..DecoderConfig::default()
    };
    let models = Models::new(Arc::new(table)).with_language_model(Arc::new(lm));
    let sentence = (0..WORDS).map(|i| format!("s{i}")).collect::<Vec<_>>().join(" ");
    let decoder = Decoder::new(models, vocab, config).expect("valid benchmark configuration");
    (decoder, sentence)
}

fn decode_benchmark(c: &mut Criterion) {
    let (sequential, sentence) = build_decoder(false);
    c.bench_function("decode_40_words", |b| {
        b.iter(|| sequential.translate(0, black_box(&sentence)))
    });

    let (parallel, sentence) = build_decoder(true);
    c.bench_function("decode_40_words_parallel_expansion", |b| {
        b.iter(|| parallel.translate(0, black_box(&sentence)))
    });
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
