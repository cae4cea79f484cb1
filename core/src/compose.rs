//! Turns an [`Item`] into the whitespace-separated term string that the
//! vectorizer consumes.

use crate::item::{Item, MAX_CAST};
use crate::tokenizer::{normalize_label, tokenize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized terms of one item, separated by single spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.0.split_whitespace() }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Document {
    /// Wraps already-normalized text; terms are whatever whitespace separates.
    fn from(s: &str) -> Self {
        Document(s.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureComposer {
    label_weight: usize,
}

impl Default for FeatureComposer {
    fn default() -> Self { Self { label_weight: 1 } }
}

impl FeatureComposer {
    /// `label_weight` below 1 is treated as 1.
    pub fn new(label_weight: usize) -> Self {
        Self { label_weight: label_weight.max(1) }
    }

    pub fn label_weight(&self) -> usize { self.label_weight }

    /// Field order: genres, keywords, director, cast, overview.
    /// Genres and director are emitted `label_weight` times.
    pub fn compose(&self, item: &Item) -> Document {
        let mut terms: Vec<String> = Vec::new();

        let genres: Vec<String> = item.genres.iter().filter_map(|g| normalize_label(g)).collect();
        for _ in 0..self.label_weight {
            terms.extend(genres.iter().cloned());
        }

        terms.extend(item.keywords.iter().filter_map(|k| normalize_label(k)));

        if let Some(director) = item.director.as_deref().and_then(normalize_label) {
            for _ in 0..self.label_weight {
                terms.push(director.clone());
            }
        }

        terms.extend(item.top_cast.iter().take(MAX_CAST).filter_map(|c| normalize_label(c)));

        terms.extend(tokenize(&item.overview).into_iter().map(|(term, _)| term));

        Document(terms.join(" "))
    }

    pub fn compose_all(&self, items: &[Item]) -> Vec<Document> {
        items.iter().map(|item| self.compose(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        let mut item = Item::new(1, "Jaws");
        item.genres = vec!["Thriller".into(), "Science Fiction".into()];
        item.keywords = vec!["shark attack".into()];
        item.director = Some("Steven Spielberg".into());
        item.top_cast = vec!["Roy Scheider".into(), "Robert Shaw".into()];
        item.overview = "A great white shark terrorizes a beach town.".into();
        item
    }

    #[test]
    fn fields_in_fixed_order() {
        let doc = FeatureComposer::default().compose(&sample());
        let terms: Vec<&str> = doc.terms().collect();
        assert_eq!(
            &terms[..6],
            &["thriller", "sciencefiction", "sharkattack", "stevenspielberg", "royscheider", "robertshaw"]
        );
        assert!(terms.contains(&"shark"));
        assert!(!terms.contains(&"a"));
    }

    #[test]
    fn label_weight_repeats_genres_and_director_only() {
        let doc = FeatureComposer::new(3).compose(&sample());
        let count = |t: &str| doc.terms().filter(|x| *x == t).count();
        assert_eq!(count("thriller"), 3);
        assert_eq!(count("stevenspielberg"), 3);
        assert_eq!(count("sharkattack"), 1);
        assert_eq!(count("royscheider"), 1);
    }

    #[test]
    fn empty_item_gives_empty_document() {
        let mut item = Item::new(2, "Nothing");
        item.genres = vec!["  ".into()];
        item.director = Some("".into());
        assert!(FeatureComposer::default().compose(&item).is_empty());
    }

    #[test]
    fn zero_weight_is_clamped() {
        assert_eq!(FeatureComposer::new(0).label_weight(), 1);
    }
}
