use serde::{Deserialize, Serialize};

/// A corpus row before its question has been embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqSeed {
    pub question: String,
    pub answer: String,
    #[serde(rename = "intent")]
    pub intent_tag: String,
}

impl FaqSeed {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        intent_tag: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            intent_tag: intent_tag.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(rename = "intent")]
    pub intent_tag: String,
    pub embedding: Vec<f32>,
}

impl FaqEntry {
    pub fn from_seed(seed: FaqSeed, embedding: Vec<f32>) -> Self {
        Self {
            question: seed.question,
            answer: seed.answer,
            intent_tag: seed.intent_tag,
            embedding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub label: String,
    pub score: f32,
}

impl IntentScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Why a query ended without an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Intent confidence was low and nothing in the whole corpus was close.
    NotUnderstood,
    /// The predicted intent has no entries.
    NoAnswerForTopic,
    /// The predicted intent has entries but none were close enough.
    NoCloseQuestion,
}

impl Fallback {
    pub fn message(self) -> &'static str {
        match self {
            Fallback::NotUnderstood => {
                "Sorry, I didn't understand your question. Please try rephrasing."
            }
            Fallback::NoAnswerForTopic => "Sorry, I don't have an answer for that topic yet.",
            Fallback::NoCloseQuestion => "Sorry, I couldn't find a good match for your question.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchStage {
    IntentScoped,
    GlobalFallback,
    NoMatch { reason: Fallback },
}

impl MatchStage {
    pub fn kind(self) -> StageKind {
        match self {
            MatchStage::IntentScoped => StageKind::IntentScoped,
            MatchStage::GlobalFallback => StageKind::GlobalFallback,
            MatchStage::NoMatch { .. } => StageKind::NoMatch,
        }
    }
}

/// `MatchStage` without the fallback reason, for expectations and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    IntentScoped,
    GlobalFallback,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub answer: Option<String>,
    pub matched_entry: Option<usize>,
    /// Best cosine score seen; `-inf` when no candidate was ranked.
    pub score: f32,
    pub stage: MatchStage,
    pub intent: Option<IntentScore>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.answer.is_some()
    }

    /// User-facing text: the stored answer or the fallback message.
    pub fn text(&self) -> &str {
        match (&self.answer, self.stage) {
            (Some(answer), _) => answer,
            (None, MatchStage::NoMatch { reason }) => reason.message(),
            // The responder never builds a match stage without an answer;
            // hand-built results still render as a fallback.
            (None, _) => Fallback::NotUnderstood.message(),
        }
    }

    pub fn into_text(self) -> String {
        match self.answer {
            Some(answer) => answer,
            None => self.text().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_messages_are_distinct() {
        let all = [
            Fallback::NotUnderstood,
            Fallback::NoAnswerForTopic,
            Fallback::NoCloseQuestion,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(!a.message().is_empty());
            for b in &all[i + 1..] {
                assert_ne!(a.message(), b.message());
            }
        }
    }

    #[test]
    fn text_prefers_answer_then_reason() {
        let mut result = MatchResult {
            answer: Some("Open at 8.".to_string()),
            matched_entry: Some(0),
            score: 0.9,
            stage: MatchStage::IntentScoped,
            intent: None,
        };
        assert_eq!(result.text(), "Open at 8.");

        result.answer = None;
        assert_eq!(result.text(), Fallback::NotUnderstood.message());

        result.stage = MatchStage::NoMatch {
            reason: Fallback::NoAnswerForTopic,
        };
        assert_eq!(result.into_text(), Fallback::NoAnswerForTopic.message());
    }

    #[test]
    fn stage_serializes_with_reason() {
        let stage = MatchStage::NoMatch {
            reason: Fallback::NoCloseQuestion,
        };
        let json = serde_json::to_value(stage).unwrap();
        assert_eq!(json["kind"], "no_match");
        assert_eq!(json["reason"], "no_close_question");

        let scoped = serde_json::to_value(MatchStage::IntentScoped).unwrap();
        assert_eq!(scoped["kind"], "intent_scoped");
    }

    #[test]
    fn seed_reads_intent_field() {
        let seed: FaqSeed =
            serde_json::from_str(r#"{"question":"q","answer":"a","intent":"clinic hours"}"#)
                .unwrap();
        assert_eq!(seed.intent_tag, "clinic hours");
    }
}
