use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::embed::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::model::{FaqEntry, FaqSeed};

/// Ordered, non-empty set of unique intent labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLabelSet {
    labels: Vec<String>,
}

impl IntentLabelSet {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(FaqError::EmptyLabelSet);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(FaqError::BlankLabel(i));
            }
            if !seen.insert(label.as_str()) {
                return Err(FaqError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self { labels })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The embedded corpus plus its intent buckets. Read-only once built.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseIndex {
    entries: Vec<FaqEntry>,
    labels: IntentLabelSet,
    buckets: HashMap<String, Vec<usize>>,
    dim: usize,
}

impl KnowledgeBaseIndex {
    /// Embeds every question once and builds the index.
    pub fn load<E>(seeds: Vec<FaqSeed>, embedder: &E, labels: IntentLabelSet) -> Result<Self>
    where
        E: EmbeddingProvider + ?Sized,
    {
        // Validate before spending any embedder calls.
        for (position, seed) in seeds.iter().enumerate() {
            check_seed(position, seed, &labels)?;
        }

        let mut entries = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let embedding = embedder
                .embed(&seed.question)
                .map_err(FaqError::Embedding)?;
            entries.push(FaqEntry::from_seed(seed, embedding));
        }

        Self::from_embedded(entries, labels)
    }

    /// Builds the index from entries that already carry embeddings.
    pub fn from_embedded(entries: Vec<FaqEntry>, labels: IntentLabelSet) -> Result<Self> {
        let mut dim = 0;
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();

        for (position, entry) in entries.iter().enumerate() {
            if !labels.contains(&entry.intent_tag) {
                return Err(FaqError::UnknownIntent {
                    position,
                    tag: entry.intent_tag.clone(),
                });
            }
            check_text(position, "question", &entry.question)?;
            check_text(position, "answer", &entry.answer)?;

            if entry.embedding.is_empty() {
                return Err(FaqError::EmptyEmbedding(position));
            }
            if position == 0 {
                dim = entry.embedding.len();
            } else if entry.embedding.len() != dim {
                return Err(FaqError::DimensionMismatch {
                    position,
                    expected: dim,
                    actual: entry.embedding.len(),
                });
            }
            if entry.embedding.iter().all(|x| *x == 0.0) {
                warn!(position, question = %entry.question, "zero-norm embedding; entry can never match");
            }

            buckets
                .entry(entry.intent_tag.clone())
                .or_default()
                .push(position);
        }

        info!(
            entries = entries.len(),
            dim,
            intents = labels.len(),
            populated_intents = buckets.len(),
            "knowledge base indexed"
        );

        Ok(Self {
            entries,
            labels,
            buckets,
            dim,
        })
    }

    /// Positions of the entries tagged `tag`, in corpus order. Empty when
    /// the tag has no entries.
    pub fn entries_for(&self, tag: &str) -> &[usize] {
        self.buckets.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_entries(&self) -> Vec<usize> {
        (0..self.entries.len()).collect()
    }

    pub fn entry(&self, position: usize) -> Option<&FaqEntry> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn labels(&self) -> &IntentLabelSet {
        &self.labels
    }

    /// Embedding dimension; 0 for an empty corpus.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<FaqEntry> {
        self.entries
    }
}

fn check_seed(position: usize, seed: &FaqSeed, labels: &IntentLabelSet) -> Result<()> {
    if !labels.contains(&seed.intent_tag) {
        return Err(FaqError::UnknownIntent {
            position,
            tag: seed.intent_tag.clone(),
        });
    }
    check_text(position, "question", &seed.question)?;
    check_text(position, "answer", &seed.answer)
}

fn check_text(position: usize, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FaqError::BlankField { position, field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn labels() -> IntentLabelSet {
        IntentLabelSet::new(["clinic hours", "test results", "contact support"]).unwrap()
    }

    fn seeds() -> Vec<FaqSeed> {
        vec![
            FaqSeed::new("When do you open?", "At 8 AM.", "clinic hours"),
            FaqSeed::new("Where are my results?", "In the portal.", "test results"),
            FaqSeed::new("Are you open Sundays?", "No.", "clinic hours"),
        ]
    }

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingProvider for CountingEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
    }

    #[test]
    fn label_set_rejects_empty_blank_and_duplicates() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            IntentLabelSet::new(empty),
            Err(FaqError::EmptyLabelSet)
        ));
        assert!(matches!(
            IntentLabelSet::new(["a", " "]),
            Err(FaqError::BlankLabel(1))
        ));
        assert!(matches!(
            IntentLabelSet::new(["a", "b", "a"]),
            Err(FaqError::DuplicateLabel(l)) if l == "a"
        ));
    }

    #[test]
    fn buckets_partition_the_corpus() {
        let index =
            KnowledgeBaseIndex::load(seeds(), &HashEmbeddingProvider::new(32), labels()).unwrap();

        assert_eq!(index.entries_for("clinic hours"), &[0, 2]);
        assert_eq!(index.entries_for("test results"), &[1]);
        assert!(index.entries_for("contact support").is_empty());
        assert!(index.entries_for("not a label").is_empty());
        assert_eq!(index.all_entries(), vec![0, 1, 2]);
        assert_eq!(index.dim(), 32);

        let mut union: Vec<usize> = index
            .labels()
            .as_slice()
            .iter()
            .flat_map(|l| index.entries_for(l).iter().copied())
            .collect();
        union.sort_unstable();
        assert_eq!(union, index.all_entries());
    }

    #[test]
    fn unknown_intent_is_rejected_before_embedding() {
        let mut bad = seeds();
        bad.push(FaqSeed::new("Do you sell shoes?", "No.", "retail"));
        let embedder = CountingEmbedder::default();

        let err = KnowledgeBaseIndex::load(bad, &embedder, labels()).unwrap_err();
        assert!(matches!(
            err,
            FaqError::UnknownIntent { position: 3, ref tag } if tag == "retail"
        ));
        assert!(err.is_configuration());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn load_embeds_each_question_once() {
        let embedder = CountingEmbedder::default();
        KnowledgeBaseIndex::load(seeds(), &embedder, labels()).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn blank_answer_is_a_configuration_error() {
        let bad = vec![FaqSeed::new("When do you open?", "  ", "clinic hours")];
        let err =
            KnowledgeBaseIndex::load(bad, &HashEmbeddingProvider::new(8), labels()).unwrap_err();
        assert!(matches!(
            err,
            FaqError::BlankField {
                position: 0,
                field: "answer"
            }
        ));
    }

    #[test]
    fn inconsistent_dimensions_are_rejected() {
        let entries = vec![
            FaqEntry::from_seed(seeds()[0].clone(), vec![1.0, 0.0]),
            FaqEntry::from_seed(seeds()[1].clone(), vec![1.0, 0.0, 0.0]),
        ];
        let err = KnowledgeBaseIndex::from_embedded(entries, labels()).unwrap_err();
        assert!(matches!(
            err,
            FaqError::DimensionMismatch {
                position: 1,
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn embedder_failure_propagates() {
        struct Failing;
        impl EmbeddingProvider for Failing {
            fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
                anyhow::bail!("model offline")
            }
        }

        let err = KnowledgeBaseIndex::load(seeds(), &Failing, labels()).unwrap_err();
        match err {
            FaqError::Embedding(source) => assert_eq!(source.to_string(), "model offline"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
