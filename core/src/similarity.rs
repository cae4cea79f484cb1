//! Pairwise cosine similarity and top-k neighbor retrieval.

use crate::config::Strategy;
use crate::error::{RecommendError, Result};
use crate::vectorize::FeatureVector;
use crate::ItemId;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Corpus position of the neighbor.
    pub position: usize,
    pub id: ItemId,
    pub score: f32,
}

/// Descending score, then ascending corpus position.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score.total_cmp(&a.score).then(a.position.cmp(&b.position))
}

enum Scores {
    /// Row-major N x N.
    Precomputed(Vec<f32>),
    OnDemand,
}

pub struct SimilarityIndex {
    ids: Vec<ItemId>,
    positions: HashMap<ItemId, usize>,
    vectors: Vec<FeatureVector>,
    scores: Scores,
}

impl SimilarityIndex {
    /// `ids[i]` and `vectors[i]` describe the item at corpus position `i`.
    pub fn build(ids: Vec<ItemId>, vectors: Vec<FeatureVector>, strategy: Strategy) -> Result<Self> {
        if ids.len() != vectors.len() {
            return Err(RecommendError::CorpusMismatch(format!(
                "{} item ids but {} vectors",
                ids.len(),
                vectors.len()
            )));
        }
        let mut positions = HashMap::with_capacity(ids.len());
        for (pos, &id) in ids.iter().enumerate() {
            if positions.insert(id, pos).is_some() {
                return Err(RecommendError::DuplicateId(id));
            }
        }

        let scores = match strategy {
            Strategy::Precomputed => {
                let n = vectors.len();
                tracing::debug!(n, bytes = n * n * std::mem::size_of::<f32>(), "precomputing similarity matrix");
                let mut matrix = vec![0.0f32; n * n];
                for i in 0..n {
                    for j in i..n {
                        let s = vectors[i].dot(&vectors[j]);
                        matrix[i * n + j] = s;
                        matrix[j * n + i] = s;
                    }
                }
                Scores::Precomputed(matrix)
            }
            Strategy::OnDemand => Scores::OnDemand,
        };

        Ok(Self { ids, positions, vectors, scores })
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn strategy(&self) -> Strategy {
        match self.scores {
            Scores::Precomputed(_) => Strategy::Precomputed,
            Scores::OnDemand => Strategy::OnDemand,
        }
    }

    pub fn vectors(&self) -> &[FeatureVector] { &self.vectors }

    pub fn position(&self, id: ItemId) -> Option<usize> { self.positions.get(&id).copied() }

    fn score_at(&self, i: usize, j: usize) -> f32 {
        match &self.scores {
            Scores::Precomputed(matrix) => matrix[i * self.ids.len() + j],
            Scores::OnDemand => self.vectors[i].dot(&self.vectors[j]),
        }
    }

    /// Cosine similarity between two items.
    pub fn similarity(&self, a: ItemId, b: ItemId) -> Result<f32> {
        let i = self.position(a).ok_or(RecommendError::UnknownId(a))?;
        let j = self.position(b).ok_or(RecommendError::UnknownId(b))?;
        Ok(self.score_at(i, j))
    }

    /// The `k` most similar other items, best first. Asking for more neighbors
    /// than exist returns all of them.
    pub fn neighbors(&self, id: ItemId, k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(RecommendError::InvalidK(k));
        }
        let query = self.position(id).ok_or(RecommendError::UnknownId(id))?;
        Ok(self.neighbors_of(query, k))
    }

    pub(crate) fn neighbors_of(&self, query: usize, k: usize) -> Vec<Neighbor> {
        let mut candidates: Vec<Neighbor> = (0..self.ids.len())
            .filter(|&pos| pos != query)
            .map(|pos| Neighbor { position: pos, id: self.ids[pos], score: self.score_at(query, pos) })
            .collect();

        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, rank);
            candidates.truncate(k);
        }
        candidates.sort_by(rank);
        candidates
    }
}
