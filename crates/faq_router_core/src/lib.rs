pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod eval;
pub mod intent;
pub mod knowledge;
pub mod minilm_embed;
pub mod model;
pub mod responder;
pub mod similarity;
pub mod storage;

pub use config::{
    RouterConfig, Thresholds, ZeroShotConfig, DEFAULT_EMBEDDING_DIM, DEFAULT_REQUIRED_PASS_RATE,
    DEFAULT_THRESHOLD_FAQ, DEFAULT_THRESHOLD_INTENT,
};
pub use corpus::{clinic_faqs, clinic_intents, CLINIC_INTENTS};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::FaqError;
pub use eval::{evaluate_cases, CaseExpectation, EvalCase, EvalOutcome, EvalSummary};
pub use intent::{IntentClassifier, ZeroShotIntentClassifier};
pub use knowledge::{IntentLabelSet, KnowledgeBaseIndex};
pub use minilm_embed::MiniLmEmbeddingProvider;
pub use model::{
    FaqEntry, FaqSeed, Fallback, IntentScore, MatchResult, MatchStage, StageKind,
};
pub use responder::FaqResponder;
pub use similarity::{best_match, cosine_similarity, BestMatch};
pub use storage::{load_entries_jsonl, load_intent_labels, load_seeds_jsonl, save_entries_jsonl};
