//! TF-IDF fitting and transformation.
//!
//! Weights follow the usual sublinear scheme: `tf = 1 + ln(count)`, multiplied by
//! the idf chosen in [`IdfMode`]. Every vector is L2-normalized, so the dot
//! product of two vectors is their cosine similarity.

use crate::compose::Document;
use crate::config::{IdfMode, IndexConfig};
use crate::error::{RecommendError, Result};
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sparse, unit-length (or all-zero) vector. Entries are sorted by term id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    dim: u32,
    entries: Vec<(TermId, f32)>,
}

impl FeatureVector {
    pub fn zero(dim: u32) -> Self { Self { dim, entries: Vec::new() } }

    pub fn dim(&self) -> u32 { self.dim }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }

    pub fn is_zero(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, term: TermId) -> f32 {
        self.entries
            .binary_search_by_key(&term, |&(t, _)| t)
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    /// Merge-join over the sorted entries. Products are summed in ascending term
    /// order whichever side is `self`, so `a.dot(b) == b.dot(a)` bit for bit.
    pub fn dot(&self, other: &FeatureVector) -> f32 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.dim as usize];
        for &(t, w) in &self.entries {
            dense[t as usize] = w;
        }
        dense
    }

    /// Sorted entries with ids inside `dim`; used when reading vectors back from disk.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].0 < w[1].0)
            && self.entries.last().map_or(true, |&(t, _)| t < self.dim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vectorizer {
    min_df: usize,
    max_df: f32,
    idf: IdfMode,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl Vectorizer {
    pub fn new(min_df: usize, max_df: f32, idf: IdfMode) -> Self {
        Self { min_df: min_df.max(1), max_df, idf }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.min_df, config.max_df, config.idf)
    }

    /// Learn vocabulary and idf from the whole corpus in one pass.
    pub fn fit(&self, documents: &[Document]) -> Result<FittedModel> {
        if documents.is_empty() {
            return Err(RecommendError::EmptyCorpus);
        }
        let num_docs = documents.len();

        // BTreeMap keeps term id assignment independent of hash order.
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            let seen: HashSet<&str> = doc.terms().collect();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        let num_terms_seen = df.len();

        let max_df_count = self.max_df * num_docs as f32;
        let mut vocabulary: HashMap<String, TermId> = HashMap::new();
        let mut idf: Vec<f32> = Vec::new();
        for (term, df_t) in df {
            if df_t < self.min_df || df_t as f32 > max_df_count {
                continue;
            }
            vocabulary.insert(term.to_string(), idf.len() as TermId);
            idf.push(self.idf.idf(num_docs, df_t));
        }

        if vocabulary.is_empty() {
            return Err(RecommendError::EmptyVocabulary { num_docs, min_df: self.min_df, max_df: self.max_df });
        }
        tracing::debug!(num_docs, num_terms_seen, vocab_size = vocabulary.len(), "fitted vocabulary");

        Ok(FittedModel {
            vocabulary,
            idf,
            num_docs: num_docs as u32,
            idf_mode: self.idf,
            corpus_fingerprint: None,
        })
    }
}

/// Vocabulary and idf learned from one corpus. Vectors from different models
/// are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    vocabulary: HashMap<String, TermId>,
    idf: Vec<f32>,
    num_docs: u32,
    idf_mode: IdfMode,
    /// Fingerprint of the corpus the documents came from, once known.
    corpus_fingerprint: Option<String>,
}

impl FittedModel {
    /// Record which corpus the fitted documents were composed from.
    pub fn bind_to_corpus(mut self, fingerprint: impl Into<String>) -> Self {
        self.corpus_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn corpus_fingerprint(&self) -> Option<&str> { self.corpus_fingerprint.as_deref() }

    pub fn dim(&self) -> u32 { self.idf.len() as u32 }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn idf_mode(&self) -> IdfMode { self.idf_mode }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.vocabulary.get(term).copied() }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.term_id(term).map(|t| self.idf[t as usize])
    }

    pub fn is_consistent(&self) -> bool {
        self.vocabulary.len() == self.idf.len()
            && self.vocabulary.values().all(|&t| (t as usize) < self.idf.len())
    }

    /// Terms outside the vocabulary are ignored; a document with none left maps
    /// to the zero vector.
    pub fn transform(&self, document: &Document) -> FeatureVector {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for term in document.terms() {
            if let Some(tid) = self.term_id(term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(TermId, f32)> = counts
            .into_iter()
            .map(|(tid, tf_raw)| {
                let tf = 1.0 + (tf_raw as f32).ln();
                (tid, tf * self.idf[tid as usize])
            })
            .filter(|&(_, w)| w > 0.0)
            .collect();
        entries.sort_by_key(|&(t, _)| t);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm == 0.0 {
            return FeatureVector::zero(self.dim());
        }
        for (_, w) in entries.iter_mut() {
            *w /= norm;
        }
        FeatureVector { dim: self.dim(), entries }
    }

    pub fn transform_all(&self, documents: &[Document]) -> Vec<FeatureVector> {
        documents.iter().map(|d| self.transform(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<Document> {
        texts.iter().map(|t| Document::from(*t)).collect()
    }

    #[test]
    fn empty_corpus_fails() {
        assert!(matches!(Vectorizer::default().fit(&[]), Err(RecommendError::EmptyCorpus)));
    }

    #[test]
    fn single_document_has_no_vocabulary_under_default_max_df() {
        let err = Vectorizer::default().fit(&docs(&["hero city"])).unwrap_err();
        assert!(matches!(err, RecommendError::EmptyVocabulary { num_docs: 1, .. }));
    }

    #[test]
    fn all_empty_documents_fail() {
        let err = Vectorizer::default().fit(&docs(&["", ""])).unwrap_err();
        assert!(matches!(err, RecommendError::EmptyVocabulary { .. }));
    }

    #[test]
    fn df_thresholds_filter_terms() {
        let corpus = docs(&["film hero", "film hero", "film love", "film noise"]);
        let model = Vectorizer::new(2, 0.9, IdfMode::Smoothed).fit(&corpus).unwrap();
        assert!(model.term_id("hero").is_some());
        // Too rare.
        assert!(model.term_id("love").is_none());
        // Too common.
        assert!(model.term_id("film").is_none());
        assert_eq!(model.dim(), 1);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let corpus = docs(&["common rare", "common", "common", "common other"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        assert!(model.idf("rare").unwrap() > model.idf("common").unwrap());
        let v = model.transform(&corpus[0]);
        assert!(v.get(model.term_id("rare").unwrap()) > v.get(model.term_id("common").unwrap()));
    }

    #[test]
    fn vectors_are_unit_length() {
        let corpus = docs(&["a b b c", "b c d", "d e"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        for v in model.transform_all(&corpus) {
            assert!((v.norm() - 1.0).abs() < 1e-5);
            assert_eq!(v.dim(), model.dim());
            assert!(v.is_well_formed());
        }
    }

    #[test]
    fn raw_idf_zeroes_universal_terms() {
        let corpus = docs(&["x y", "x z"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Raw).fit(&corpus).unwrap();
        let v = model.transform(&Document::from("x"));
        assert!(v.is_zero());
        assert_eq!(v.dot(&v), 0.0);
    }

    #[test]
    fn unknown_terms_are_ignored() {
        let corpus = docs(&["x y", "y z"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        assert!(model.transform(&Document::from("nope never")).is_zero());
    }

    #[test]
    fn term_ids_follow_lexicographic_order() {
        let corpus = docs(&["zeta alpha", "mid alpha"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        assert_eq!(model.term_id("alpha"), Some(0));
        assert_eq!(model.term_id("mid"), Some(1));
        assert_eq!(model.term_id("zeta"), Some(2));
        assert!(model.is_consistent());
    }

    #[test]
    fn fit_leaves_model_unbound_until_told() {
        let corpus = docs(&["x y", "y z"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        assert_eq!(model.corpus_fingerprint(), None);
        assert_eq!(model.bind_to_corpus("abc").corpus_fingerprint(), Some("abc"));
    }

    #[test]
    fn dot_matches_dense_product() {
        let corpus = docs(&["a b c", "b c d", "c d e"]);
        let model = Vectorizer::new(1, 1.0, IdfMode::Smoothed).fit(&corpus).unwrap();
        let vs = model.transform_all(&corpus);
        let dense: f32 = vs[0].to_dense().iter().zip(vs[1].to_dense()).map(|(a, b)| a * b).sum();
        assert!((vs[0].dot(&vs[1]) - dense).abs() < 1e-6);
        assert_eq!(vs[0].dot(&vs[1]), vs[1].dot(&vs[0]));
    }
}
