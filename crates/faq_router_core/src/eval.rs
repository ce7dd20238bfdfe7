use crate::config::Thresholds;
use crate::embed::EmbeddingProvider;
use crate::intent::IntentClassifier;
use crate::model::StageKind;
use crate::responder::FaqResponder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub question: String,
    pub expected_stage: StageKind,
    /// When set, the returned text must equal it exactly. For `no_match`
    /// cases this pins which fallback message is expected.
    #[serde(default)]
    pub expected_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_stage: StageKind,
    pub actual_entry: Option<usize>,
    pub intent: Option<String>,
    pub intent_confidence: Option<f32>,
    pub text: String,
    pub score: f32,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

impl EvalSummary {
    pub fn meets(&self, required_pass_rate: f32) -> bool {
        self.pass_rate >= required_pass_rate
    }

    pub fn total_latency_ms(&self) -> f64 {
        self.outcomes.iter().map(|o| o.latency_ms).sum()
    }
}

pub struct CaseExpectation;

impl CaseExpectation {
    pub fn matches(
        expected_stage: StageKind,
        expected_answer: Option<&str>,
        actual_stage: StageKind,
        actual_text: &str,
    ) -> bool {
        if expected_stage != actual_stage {
            return false;
        }

        match expected_answer {
            Some(expected) => expected == actual_text,
            None => true,
        }
    }
}

/// Runs every case through the responder. Cases run in parallel; outcomes
/// keep the input order.
pub fn evaluate_cases<E, C>(
    responder: &FaqResponder<E, C>,
    cases: &[EvalCase],
    thresholds: Thresholds,
) -> crate::error::Result<EvalSummary>
where
    E: EmbeddingProvider,
    C: IntentClassifier,
{
    let outcomes = cases
        .par_iter()
        .map(|case| {
            let start = Instant::now();
            let result = responder.respond(&case.question, thresholds)?;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            let actual_stage = result.stage.kind();
            let passed = CaseExpectation::matches(
                case.expected_stage,
                case.expected_answer.as_deref(),
                actual_stage,
                result.text(),
            );

            Ok(EvalOutcome {
                case_id: case.case_id.clone(),
                passed,
                actual_stage,
                actual_entry: result.matched_entry,
                intent: result.intent.as_ref().map(|i| i.label.clone()),
                intent_confidence: result.intent.as_ref().map(|i| i.score),
                text: result.text().to_string(),
                score: result.score,
                latency_ms,
            })
        })
        .collect::<crate::error::Result<Vec<_>>>()?;

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    Ok(EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    })
}
