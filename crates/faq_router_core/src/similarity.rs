use crate::knowledge::KnowledgeBaseIndex;

/// Cosine similarity of two vectors.
///
/// Returns `-inf` when either vector has zero norm, is empty, or the
/// lengths differ, so a degenerate candidate can never be selected.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return f32::NEG_INFINITY;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        f32::NEG_INFINITY
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Winner of a similarity ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// Absolute position in the knowledge base, `None` when nothing ranked.
    pub position: Option<usize>,
    pub score: f32,
}

impl BestMatch {
    pub const NONE: BestMatch = BestMatch {
        position: None,
        score: f32::NEG_INFINITY,
    };
}

/// Ranks `candidates` against `query` and returns the top one.
///
/// Only a strictly greater score replaces the current best, so equal
/// scores resolve to the earliest candidate. An empty candidate list, or
/// one made only of degenerate vectors, yields [`BestMatch::NONE`].
pub fn best_match(query: &[f32], candidates: &[usize], index: &KnowledgeBaseIndex) -> BestMatch {
    candidates
        .iter()
        .filter_map(|&position| {
            index
                .entry(position)
                .map(|entry| (position, cosine_similarity(query, &entry.embedding)))
        })
        .fold(BestMatch::NONE, |best, (position, score)| {
            if score > best.score {
                BestMatch {
                    position: Some(position),
                    score,
                }
            } else {
                best
            }
        })
}
