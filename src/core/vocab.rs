// File: src/core/vocab.rs
use crate::core::types::{Phrase, WordId};
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const BOS: &str = "<s>";
pub const EOS: &str = "</s>";
pub const UNK: &str = "<unk>";

pub const BOS_ID: WordId = 0;
pub const EOS_ID: WordId = 1;
pub const UNK_ID: WordId = 2;

#[derive(Default)]
struct Interner {
    str_to_id: FxHashMap<Arc<str>, WordId>,
    id_to_str: Vec<Arc<str>>,
}

/// Shared string interner for source and target words.
///
/// Models and the decoder hold the same `Arc<Vocabulary>`; new words seen in
/// input sentences are added on the fly, so interning takes a write lock while
/// lookups only take a read lock.
pub struct Vocabulary {
    inner: RwLock<Interner>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let vocab = Self {
            inner: RwLock::new(Interner::default()),
        };
        for special in [BOS, EOS, UNK] {
            vocab.intern(special);
        }
        vocab
    }

    pub fn intern(&self, word: &str) -> WordId {
        if let Some(id) = self.get(word) {
            return id;
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = inner.str_to_id.get(word) {
            return id;
        }
        let id = inner.id_to_str.len() as WordId;
        let word: Arc<str> = Arc::from(word);
        inner.str_to_id.insert(word.clone(), id);
        inner.id_to_str.push(word);
        id
    }

    pub fn get(&self, word: &str) -> Option<WordId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.str_to_id.get(word).copied()
    }

    /// Surface form of `id`; ids not issued by this vocabulary render as `<unk>`.
    pub fn word(&self, id: WordId) -> Arc<str> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .id_to_str
            .get(id as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(UNK))
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whitespace tokenization, interning every token.
    pub fn tokenize(&self, text: &str) -> Phrase {
        text.split_whitespace().map(|w| self.intern(w)).collect()
    }

    pub fn render(&self, words: &[WordId]) -> String {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        words
            .iter()
            .map(|&id| inner.id_to_str.get(id as usize).map_or(UNK, |w| &**w))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_tokens_have_fixed_ids() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.get(BOS), Some(BOS_ID));
        assert_eq!(vocab.get(EOS), Some(EOS_ID));
        assert_eq!(vocab.get(UNK), Some(UNK_ID));
    }

    #[test]
    fn interning_is_idempotent() {
        let vocab = Vocabulary::new();
        let a = vocab.intern("haus");
        assert_eq!(vocab.intern("haus"), a);
        assert_eq!(&*vocab.word(a), "haus");
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn tokenize_and_render_roundtrip() {
        let vocab = Vocabulary::new();
        let words = vocab.tokenize("  das   ist ein haus ");
        assert_eq!(words.len(), 4);
        assert_eq!(vocab.render(&words), "das ist ein haus");
    }

    #[test]
    fn concurrent_interning_agrees() {
        let vocab = Arc::new(Vocabulary::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let vocab = Arc::clone(&vocab);
                std::thread::spawn(move || vocab.tokenize("a b c d e"))
            })
            .collect();
        let results: Vec<Phrase> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(vocab.len(), 8);
    }
}
