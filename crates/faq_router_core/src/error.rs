use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaqError {
    #[error("configuration error: intent label set is empty")]
    EmptyLabelSet,

    #[error("configuration error: intent label at position {0} is blank")]
    BlankLabel(usize),

    #[error("configuration error: duplicate intent label '{0}'")]
    DuplicateLabel(String),

    #[error("configuration error: entry {position} uses unknown intent '{tag}'")]
    UnknownIntent { position: usize, tag: String },

    #[error("configuration error: entry {position} has a blank {field}")]
    BlankField {
        position: usize,
        field: &'static str,
    },

    #[error("configuration error: entry {position} has embedding dimension {actual}, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("configuration error: entry {0} has an empty embedding")]
    EmptyEmbedding(usize),

    #[error("configuration error: {name} threshold {value} is outside [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("embedding provider failed")]
    Embedding(#[source] anyhow::Error),

    #[error("intent classifier failed")]
    Classification(#[source] anyhow::Error),
}

impl FaqError {
    /// True for errors raised while building the knowledge base or its
    /// settings, as opposed to collaborator failures at query time.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, FaqError::Embedding(_) | FaqError::Classification(_))
    }
}

pub type Result<T> = std::result::Result<T, FaqError>;
