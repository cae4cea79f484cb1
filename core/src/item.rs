use crate::error::{RecommendError, Result};
use crate::ItemId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Maximum number of cast members carried per item.
pub const MAX_CAST: usize = 5;

/// One record as produced by the metadata fetcher. Every field except `id` and
/// `title` may be missing or `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub top_cast: Option<Vec<String>>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub release_year: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub production_companies: Option<Vec<String>>,
}

/// An immutable movie record. Only the descriptive fields feed similarity; the
/// numeric metadata is carried through for display and title disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub top_cast: Vec<String>,
    pub director: Option<String>,
    /// Four-digit year, or empty when unknown.
    pub release_year: String,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub original_language: Option<String>,
    pub production_companies: Vec<String>,
}

impl Item {
    /// Minimal item with only an id and title; the rest is empty.
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: String::new(),
            genres: Vec::new(),
            keywords: Vec::new(),
            top_cast: Vec::new(),
            director: None,
            release_year: String::new(),
            runtime: None,
            budget: None,
            revenue: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
            original_language: None,
            production_companies: Vec::new(),
        }
    }

    pub fn year(&self) -> Option<u16> {
        self.release_year.trim().parse().ok()
    }
}

impl From<ItemRecord> for Item {
    fn from(r: ItemRecord) -> Self {
        let mut top_cast = r.top_cast.unwrap_or_default();
        top_cast.truncate(MAX_CAST);
        Self {
            id: r.id,
            title: r.title,
            overview: r.overview.unwrap_or_default(),
            genres: r.genres.unwrap_or_default(),
            keywords: r.keywords.unwrap_or_default(),
            top_cast,
            director: r.director.filter(|d| !d.trim().is_empty()),
            release_year: r.release_year.unwrap_or_default(),
            runtime: r.runtime,
            budget: r.budget,
            revenue: r.revenue,
            popularity: r.popularity,
            vote_average: r.vote_average,
            vote_count: r.vote_count,
            original_language: r.original_language,
            production_companies: r.production_companies.unwrap_or_default(),
        }
    }
}

/// Ordered items, addressable by position and by id.
#[derive(Debug, Clone)]
pub struct Corpus {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
    fingerprint: String,
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_list(hasher: &mut Sha256, list: &[String]) {
    hasher.update((list.len() as u64).to_le_bytes());
    for s in list {
        hash_str(hasher, s);
    }
}

/// SHA-256 over the item count and, in order, every field that feeds a document.
/// Models and vectors fitted on a corpus carry this value; a reordered or edited
/// corpus hashes differently.
pub fn corpus_fingerprint(items: &[Item]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((items.len() as u64).to_le_bytes());
    for item in items {
        hasher.update(item.id.to_le_bytes());
        hash_str(&mut hasher, &item.title);
        hash_str(&mut hasher, &item.overview);
        hash_list(&mut hasher, &item.genres);
        hash_list(&mut hasher, &item.keywords);
        hash_list(&mut hasher, &item.top_cast);
        hash_str(&mut hasher, item.director.as_deref().unwrap_or(""));
    }
    hex::encode(hasher.finalize())
}

impl Corpus {
    /// Fails with `DuplicateId` if two items share an id.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if by_id.insert(item.id, pos).is_some() {
                return Err(RecommendError::DuplicateId(item.id));
            }
        }
        let fingerprint = corpus_fingerprint(&items);
        Ok(Self { items, by_id, fingerprint })
    }

    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn items(&self) -> &[Item] { &self.items }

    pub fn get(&self, pos: usize) -> Option<&Item> { self.items.get(pos) }

    pub fn position(&self, id: ItemId) -> Option<usize> { self.by_id.get(&id).copied() }

    pub fn by_id(&self, id: ItemId) -> Option<&Item> {
        self.position(id).map(|pos| &self.items[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_nulls_become_empty() {
        let json = r#"{
            "id": 7, "title": "Heat", "overview": null, "genres": ["Crime"],
            "keywords": null, "top_cast": ["A","B","C","D","E","F"], "director": null,
            "release_year": "1995", "runtime": 170, "vote_count": null
        }"#;
        let record: ItemRecord = serde_json::from_str(json).unwrap();
        let item = Item::from(record);
        assert_eq!(item.overview, "");
        assert!(item.keywords.is_empty());
        assert_eq!(item.top_cast.len(), MAX_CAST);
        assert_eq!(item.director, None);
        assert_eq!(item.year(), Some(1995));
        assert!(item.production_companies.is_empty());
    }

    #[test]
    fn blank_year_is_none() {
        let item = Item::new(1, "Untitled");
        assert_eq!(item.year(), None);
    }

    #[test]
    fn corpus_rejects_duplicate_ids() {
        let err = Corpus::new(vec![Item::new(1, "A"), Item::new(1, "B")]).unwrap_err();
        assert!(matches!(err, RecommendError::DuplicateId(1)));
    }

    #[test]
    fn fingerprint_tracks_order_and_content() {
        let a = vec![Item::new(1, "A"), Item::new(2, "B")];
        let same = Corpus::new(a.clone()).unwrap();
        assert_eq!(same.fingerprint(), corpus_fingerprint(&a));

        let mut reversed = a.clone();
        reversed.reverse();
        assert_ne!(corpus_fingerprint(&reversed), same.fingerprint());

        let mut edited = a.clone();
        edited[1].overview = "a new synopsis".into();
        assert_ne!(corpus_fingerprint(&edited), same.fingerprint());

        // Field boundaries are length-prefixed.
        let mut x = Item::new(1, "ab");
        x.overview = "c".into();
        let mut y = Item::new(1, "a");
        y.overview = "bc".into();
        assert_ne!(corpus_fingerprint(&[x]), corpus_fingerprint(&[y]));
    }

    #[test]
    fn corpus_lookup_by_id_and_position() {
        let corpus = Corpus::new(vec![Item::new(10, "A"), Item::new(20, "B")]).unwrap();
        assert_eq!(corpus.position(20), Some(1));
        assert_eq!(corpus.by_id(10).map(|i| i.title.as_str()), Some("A"));
        assert!(corpus.by_id(30).is_none());
    }
}
