use crate::compose::FeatureComposer;
use crate::config::IndexConfig;
use crate::error::{RecommendError, Result};
use crate::item::{Corpus, Item};
use crate::similarity::SimilarityIndex;
use crate::vectorize::{FeatureVector, FittedModel, Vectorizer};
use crate::ItemId;
use std::collections::HashMap;
use std::time::Instant;

/// Everything needed to answer queries for one corpus: the items, the fitted
/// model, and the similarity structure. Immutable once built.
pub struct Index {
    config: IndexConfig,
    corpus: Corpus,
    model: FittedModel,
    similarity: SimilarityIndex,
    /// Normalized title -> corpus positions, ascending.
    pub(crate) titles: HashMap<String, Vec<usize>>,
}

/// Compose, fit and index a corpus in one batch.
pub fn build_index(items: Vec<Item>, config: &IndexConfig) -> Result<Index> {
    config.validate()?;
    if items.is_empty() {
        return Err(RecommendError::EmptyCorpus);
    }
    let start = Instant::now();
    let corpus = Corpus::new(items)?;

    let documents = FeatureComposer::new(config.label_weight).compose_all(corpus.items());
    let empty_docs = documents.iter().filter(|d| d.is_empty()).count();
    if empty_docs > 0 {
        tracing::warn!(empty_docs, "items without any descriptive text");
    }

    let model = Vectorizer::from_config(config).fit(&documents)?.bind_to_corpus(corpus.fingerprint());
    let vectors = model.transform_all(&documents);
    let zero_vectors = vectors.iter().filter(|v| v.is_zero()).count();
    if zero_vectors > empty_docs {
        tracing::warn!(zero_vectors, "items whose terms were all filtered out");
    }

    let index = Index::from_parts(config.clone(), corpus, model, vectors)?;
    tracing::info!(
        num_items = index.len(),
        vocab_size = index.model.dim(),
        strategy = ?config.strategy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index built"
    );
    Ok(index)
}

pub(crate) fn title_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl Index {
    /// Assemble an index from parts that must all describe the same corpus.
    pub fn from_parts(
        config: IndexConfig,
        corpus: Corpus,
        model: FittedModel,
        vectors: Vec<FeatureVector>,
    ) -> Result<Self> {
        config.validate()?;
        if corpus.is_empty() {
            return Err(RecommendError::EmptyCorpus);
        }
        if !model.is_consistent() {
            return Err(RecommendError::CorpusMismatch("model vocabulary and idf disagree".into()));
        }
        if model.corpus_fingerprint() != Some(corpus.fingerprint()) {
            return Err(RecommendError::CorpusMismatch(format!(
                "model was fitted on corpus {}, items hash to {}",
                model.corpus_fingerprint().unwrap_or("<unbound>"),
                corpus.fingerprint()
            )));
        }
        if model.num_docs() as usize != corpus.len() {
            return Err(RecommendError::CorpusMismatch(format!(
                "model fitted on {} documents, corpus has {} items",
                model.num_docs(),
                corpus.len()
            )));
        }
        if let Some(pos) = vectors.iter().position(|v| v.dim() != model.dim() || !v.is_well_formed()) {
            return Err(RecommendError::CorpusMismatch(format!(
                "vector {pos} does not match a vocabulary of {} terms",
                model.dim()
            )));
        }

        let ids = corpus.items().iter().map(|i| i.id).collect();
        let similarity = SimilarityIndex::build(ids, vectors, config.strategy)?;

        let mut titles: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, item) in corpus.items().iter().enumerate() {
            titles.entry(title_key(&item.title)).or_default().push(pos);
        }

        Ok(Self { config, corpus, model, similarity, titles })
    }

    pub fn config(&self) -> &IndexConfig { &self.config }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn fingerprint(&self) -> &str { self.corpus.fingerprint() }

    pub fn model(&self) -> &FittedModel { &self.model }

    pub fn similarity_index(&self) -> &SimilarityIndex { &self.similarity }

    pub fn len(&self) -> usize { self.corpus.len() }

    pub fn is_empty(&self) -> bool { self.corpus.is_empty() }

    pub fn item(&self, id: ItemId) -> Option<&Item> { self.corpus.by_id(id) }

    pub fn vector(&self, id: ItemId) -> Option<&FeatureVector> {
        self.corpus.position(id).map(|pos| &self.similarity.vectors()[pos])
    }

    pub fn similarity(&self, a: ItemId, b: ItemId) -> Result<f32> {
        self.similarity.similarity(a, b)
    }

    /// Most similar items to `id` with their scores, best first.
    pub fn neighbors(&self, id: ItemId, k: usize) -> Result<Vec<(&Item, f32)>> {
        let hits = self.similarity.neighbors(id, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|n| self.corpus.get(n.position).map(|item| (item, n.score)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;

    fn item(id: ItemId, title: &str, genre: &str, overview: &str) -> Item {
        let mut it = Item::new(id, title);
        it.genres = vec![genre.into()];
        it.overview = overview.into();
        it
    }

    fn corpus() -> Vec<Item> {
        vec![
            item(1, "Alpha", "Action", "a hero saves the city"),
            item(2, "Beta", "Action", "a hero saves the world"),
            item(3, "Gamma", "Romance", "two people fall in love"),
        ]
    }

    #[test]
    fn builds_and_ranks() {
        let index = build_index(corpus(), &IndexConfig::default()).unwrap();
        assert_eq!(index.len(), 3);
        let hits = index.neighbors(1, 2).unwrap();
        assert_eq!(hits[0].0.title, "Beta");
        assert_eq!(hits[1].0.title, "Gamma");
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        assert!(matches!(build_index(vec![], &IndexConfig::default()), Err(RecommendError::EmptyCorpus)));
    }

    #[test]
    fn single_item_has_no_vocabulary() {
        let err = build_index(vec![corpus().remove(0)], &IndexConfig::default()).err().unwrap();
        assert!(matches!(err, RecommendError::EmptyVocabulary { num_docs: 1, .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let cfg = IndexConfig { label_weight: 0, ..Default::default() };
        assert!(matches!(build_index(corpus(), &cfg), Err(RecommendError::InvalidConfig(_))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut items = corpus();
        items[2].id = 1;
        assert!(matches!(build_index(items, &IndexConfig::default()), Err(RecommendError::DuplicateId(1))));
    }

    #[test]
    fn item_without_text_still_indexes() {
        let mut items = corpus();
        items.push(Item::new(4, "Blank"));
        let index = build_index(items, &IndexConfig::default()).unwrap();
        assert!(index.vector(4).unwrap().is_zero());
        assert_eq!(index.similarity(4, 1).unwrap(), 0.0);
        assert_eq!(index.neighbors(4, 5).unwrap().len(), 3);
    }

    #[test]
    fn from_parts_rejects_mismatched_vectors() {
        let index = build_index(corpus(), &IndexConfig::default()).unwrap();
        let mut vectors = index.similarity_index().vectors().to_vec();
        vectors.pop();
        let err = Index::from_parts(IndexConfig::default(), index.corpus().clone(), index.model().clone(), vectors);
        assert!(matches!(err, Err(RecommendError::CorpusMismatch(_))));

        let wrong_dim = vec![FeatureVector::zero(index.model().dim() + 1); 3];
        let err = Index::from_parts(IndexConfig::default(), index.corpus().clone(), index.model().clone(), wrong_dim);
        assert!(matches!(err, Err(RecommendError::CorpusMismatch(_))));
    }

    #[test]
    fn from_parts_rejects_model_of_another_corpus() {
        let index = build_index(corpus(), &IndexConfig::default()).unwrap();
        let mut reordered = corpus();
        reordered.reverse();
        let err = Index::from_parts(
            IndexConfig::default(),
            Corpus::new(reordered).unwrap(),
            index.model().clone(),
            index.similarity_index().vectors().to_vec(),
        );
        assert!(matches!(err, Err(RecommendError::CorpusMismatch(_))));

        let documents = FeatureComposer::default().compose_all(index.corpus().items());
        let unbound = Vectorizer::default().fit(&documents).unwrap();
        let vectors = unbound.transform_all(&documents);
        let err = Index::from_parts(IndexConfig::default(), index.corpus().clone(), unbound, vectors);
        assert!(matches!(err, Err(RecommendError::CorpusMismatch(_))));
    }

    #[test]
    fn rebuild_is_deterministic() {
        for strategy in [Strategy::Precomputed, Strategy::OnDemand] {
            let cfg = IndexConfig { strategy, ..Default::default() };
            let a = build_index(corpus(), &cfg).unwrap();
            let b = build_index(corpus(), &cfg).unwrap();
            for id in 1..=3 {
                let ra: Vec<(ItemId, f32)> = a.neighbors(id, 5).unwrap().iter().map(|(i, s)| (i.id, *s)).collect();
                let rb: Vec<(ItemId, f32)> = b.neighbors(id, 5).unwrap().iter().map(|(i, s)| (i.id, *s)).collect();
                assert_eq!(ra, rb);
            }
        }
    }

    #[test]
    fn title_key_normalizes_case_and_spacing() {
        assert_eq!(title_key("  The   Dark Knight "), "the dark knight");
    }
}
