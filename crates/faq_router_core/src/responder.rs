use std::sync::Arc;

use tracing::debug;

use crate::config::Thresholds;
use crate::embed::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::intent::IntentClassifier;
use crate::knowledge::KnowledgeBaseIndex;
use crate::model::{Fallback, IntentScore, MatchResult, MatchStage};
use crate::similarity::{best_match, BestMatch};

/// Answers questions from a shared knowledge base with the two-stage
/// protocol: classify the intent, then rank questions either inside the
/// predicted intent or, when the classifier is unsure, across the whole
/// corpus.
///
/// Holds no per-query state, so one responder serves any number of
/// concurrent callers when its collaborators are `Sync`.
pub struct FaqResponder<E, C> {
    index: Arc<KnowledgeBaseIndex>,
    embedder: E,
    classifier: C,
}

impl<E, C> FaqResponder<E, C>
where
    E: EmbeddingProvider,
    C: IntentClassifier,
{
    pub fn new(index: Arc<KnowledgeBaseIndex>, embedder: E, classifier: C) -> Self {
        Self {
            index,
            embedder,
            classifier,
        }
    }

    pub fn index(&self) -> &Arc<KnowledgeBaseIndex> {
        &self.index
    }

    /// Text to show the user: the stored answer or one of the fallback
    /// messages.
    pub fn answer(&self, query: &str, thresholds: Thresholds) -> Result<String> {
        Ok(self.respond(query, thresholds)?.into_text())
    }

    /// Structured outcome of one query.
    pub fn respond(&self, query: &str, thresholds: Thresholds) -> Result<MatchResult> {
        // Embedded once up front and reused by whichever search runs.
        let query_vec = self.embedder.embed(query).map_err(FaqError::Embedding)?;
        if self.index.dim() != 0 && query_vec.len() != self.index.dim() {
            return Err(FaqError::Embedding(anyhow::anyhow!(
                "query embedding has dimension {}, index has {}",
                query_vec.len(),
                self.index.dim()
            )));
        }

        let top = self
            .classifier
            .classify(query, self.index.labels().as_slice())
            .map_err(FaqError::Classification)?
            .into_iter()
            .next()
            .ok_or_else(|| FaqError::Classification(anyhow::anyhow!("empty intent ranking")))?;

        debug!(intent = %top.label, confidence = top.score, "intent classified");

        // NaN confidence is not trusted.
        let result = if !(top.score >= thresholds.intent) {
            self.global_search(&query_vec, top, thresholds.faq)
        } else {
            self.intent_scoped_search(&query_vec, top, thresholds.faq)
        };

        debug!(
            stage = ?result.stage,
            score = result.score,
            entry = ?result.matched_entry,
            "query resolved"
        );
        Ok(result)
    }

    fn intent_scoped_search(
        &self,
        query_vec: &[f32],
        intent: IntentScore,
        threshold_faq: f32,
    ) -> MatchResult {
        let candidates = self.index.entries_for(&intent.label);
        if candidates.is_empty() {
            return no_match(BestMatch::NONE, Fallback::NoAnswerForTopic, intent);
        }

        let best = best_match(query_vec, candidates, &self.index);
        self.accept(best, threshold_faq, MatchStage::IntentScoped, intent)
            .unwrap_or_else(|intent| no_match(best, Fallback::NoCloseQuestion, intent))
    }

    fn global_search(
        &self,
        query_vec: &[f32],
        intent: IntentScore,
        threshold_faq: f32,
    ) -> MatchResult {
        let best = best_match(query_vec, &self.index.all_entries(), &self.index);
        self.accept(best, threshold_faq, MatchStage::GlobalFallback, intent)
            .unwrap_or_else(|intent| no_match(best, Fallback::NotUnderstood, intent))
    }

    /// A match when `best` clears the threshold; hands the intent back
    /// otherwise so the caller can build its own fallback.
    fn accept(
        &self,
        best: BestMatch,
        threshold_faq: f32,
        stage: MatchStage,
        intent: IntentScore,
    ) -> std::result::Result<MatchResult, IntentScore> {
        let entry = match best.position.and_then(|p| self.index.entry(p)) {
            Some(entry) if best.score >= threshold_faq => entry,
            _ => return Err(intent),
        };

        Ok(MatchResult {
            answer: Some(entry.answer.clone()),
            matched_entry: best.position,
            score: best.score,
            stage,
            intent: Some(intent),
        })
    }
}

fn no_match(best: BestMatch, reason: Fallback, intent: IntentScore) -> MatchResult {
    MatchResult {
        answer: None,
        matched_entry: None,
        score: best.score,
        stage: MatchStage::NoMatch { reason },
        intent: Some(intent),
    }
}
