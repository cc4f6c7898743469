//! Embedding capability and vector utilities.
//!
//! The core treats embedding generation as an external capability behind
//! the [`Embedder`] trait (`embed(text) → vector`). Nearest-neighbour search
//! is a store operation ([`RecruitStore::match_candidates`](crate::store::RecruitStore::match_candidates)).
//!
//! Also provides the text chunks embedded for each record and helpers for
//! storing vectors as SQLite BLOBs.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Candidate, Job};

/// Token usage reported by an embedding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

/// A single embedding result.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub usage: EmbeddingUsage,
}

/// External text-embedding capability.
///
/// Implementations truncate input to their own character budget before
/// submission (see [`truncate_chars`]).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, e.g. `"text-embedding-3-small"`.
    fn model_name(&self) -> &str;
    /// Vector dimensionality, e.g. `1536`.
    fn dims(&self) -> usize;
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The text chunk embedded for a candidate.
pub fn candidate_chunk_text(c: &Candidate) -> String {
    let mut out = format!("Name: {}\n", c.name);
    if !c.skills.is_empty() {
        out.push_str(&format!("Skills: {}\n", c.skills.join(", ")));
    }
    if let Some(exp) = &c.experience {
        out.push_str(&format!("Experience: {}\n", exp));
    }
    if let Some(loc) = &c.location {
        out.push_str(&format!("Location: {}\n", loc));
    }
    if let Some(resume) = &c.resume_text {
        out.push_str(&format!("Resume: {}\n", resume));
    }
    out
}

/// The text chunk embedded for a job posting.
pub fn job_chunk_text(j: &Job) -> String {
    let mut out = format!("Job {}: {}\n", j.job_id, j.title);
    if !j.skills.is_empty() {
        out.push_str(&format!("Skills: {}\n", j.skills.join(", ")));
    }
    if let Some(loc) = &j.location {
        out.push_str(&format!("Location: {}\n", loc));
    }
    if let Some(desc) = &j.description {
        out.push_str(&format!("Description: {}\n", desc));
    }
    out
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use recruit_chat_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB produced by [`vec_to_blob`]. Trailing bytes that do not
/// form a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty, zero, or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, na, nb), (x, y)| {
            (d + x * y, na + x * x, nb + y * y)
        });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
