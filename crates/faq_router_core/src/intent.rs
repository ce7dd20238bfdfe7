use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::config::ZeroShotConfig;
use crate::embed::EmbeddingProvider;
use crate::knowledge::IntentLabelSet;
use crate::model::IntentScore;
use crate::similarity::cosine_similarity;

/// Scores a text against a set of candidate labels.
///
/// The returned list is sorted by descending score, each score in `[0, 1]`.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<IntentScore>>;
}

impl IntentClassifier for Box<dyn IntentClassifier> {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<IntentScore>> {
        (**self).classify(text, labels)
    }
}

impl<T: IntentClassifier + ?Sized> IntentClassifier for Arc<T> {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<IntentScore>> {
        (**self).classify(text, labels)
    }
}

impl<T: IntentClassifier + ?Sized> IntentClassifier for &T {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<IntentScore>> {
        (**self).classify(text, labels)
    }
}

/// Zero-shot labelling on top of any embedding model.
///
/// Each label is rendered through the hypothesis template and embedded
/// once up front. A query is scored by cosine similarity to every label,
/// and the similarities are turned into a probability distribution with a
/// temperature softmax.
pub struct ZeroShotIntentClassifier<E> {
    embedder: E,
    config: ZeroShotConfig,
    hypotheses: HashMap<String, Vec<f32>>,
}

impl<E: EmbeddingProvider> ZeroShotIntentClassifier<E> {
    pub fn new(embedder: E, labels: &IntentLabelSet, config: ZeroShotConfig) -> Result<Self> {
        if !(config.temperature.is_finite() && config.temperature > 0.0) {
            bail!(
                "zero-shot temperature must be positive, got {}",
                config.temperature
            );
        }

        let mut hypotheses = HashMap::with_capacity(labels.len());
        for label in labels.as_slice() {
            let v = embedder.embed(&config.hypothesis(label))?;
            hypotheses.insert(label.clone(), v);
        }

        Ok(Self {
            embedder,
            config,
            hypotheses,
        })
    }

    fn label_vector(&self, label: &str) -> Result<Vec<f32>> {
        match self.hypotheses.get(label) {
            Some(v) => Ok(v.clone()),
            None => self.embedder.embed(&self.config.hypothesis(label)),
        }
    }
}

impl<E: EmbeddingProvider> IntentClassifier for ZeroShotIntentClassifier<E> {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<IntentScore>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text)?;
        let mut logits = Vec::with_capacity(labels.len());
        for label in labels {
            let sim = cosine_similarity(&query, &self.label_vector(label)?);
            // Degenerate vectors carry no evidence for any label.
            let sim = if sim.is_finite() { sim } else { 0.0 };
            logits.push(sim / self.config.temperature);
        }

        let probs = softmax(&logits);
        let mut ranked: Vec<IntentScore> = labels
            .iter()
            .zip(probs)
            .map(|(label, score)| IntentScore::new(label.clone(), score))
            .collect();

        // Stable, so equal scores keep label-set order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;

    fn labels() -> IntentLabelSet {
        IntentLabelSet::new(["clinic hours", "insurance inquiry", "contact support"]).unwrap()
    }

    fn classifier() -> ZeroShotIntentClassifier<HashEmbeddingProvider> {
        ZeroShotIntentClassifier::new(
            HashEmbeddingProvider::default(),
            &labels(),
            ZeroShotConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn ranks_overlapping_label_first() {
        let c = classifier();
        let ranked = c
            .classify("What are your clinic hours?", labels().as_slice())
            .unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].label, "clinic hours");
        assert!(ranked[0].score > 0.9, "score was {}", ranked[0].score);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));

        let total: f32 = ranked.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn textless_query_gives_uniform_scores_in_label_order() {
        let c = classifier();
        let ranked = c.classify("???", labels().as_slice()).unwrap();

        let names: Vec<&str> = ranked.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(names, ["clinic hours", "insurance inquiry", "contact support"]);
        for s in &ranked {
            assert!((s.score - 1.0 / 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn labels_outside_the_cache_are_embedded_on_demand() {
        let c = classifier();
        let extra = vec!["clinic hours".to_string(), "billing".to_string()];
        let ranked = c.classify("question about billing", &extra).unwrap();
        assert_eq!(ranked[0].label, "billing");
    }

    #[test]
    fn empty_label_list_returns_empty_ranking() {
        assert!(classifier().classify("hello", &[]).unwrap().is_empty());
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        let config = ZeroShotConfig {
            temperature: 0.0,
            ..ZeroShotConfig::default()
        };
        assert!(
            ZeroShotIntentClassifier::new(HashEmbeddingProvider::default(), &labels(), config)
                .is_err()
        );
    }
}
