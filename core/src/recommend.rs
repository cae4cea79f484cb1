use crate::error::{RecommendError, Result};
use crate::index::{title_key, Index};
use crate::item::Item;
use crate::ItemId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation<'a> {
    pub item: &'a Item,
    pub score: f32,
}

impl Index {
    /// Resolve a title by trimmed, case-insensitive exact match. When several
    /// items share the title, the one with the most votes wins, then the
    /// earliest in the corpus.
    pub fn resolve_title(&self, title: &str) -> Result<&Item> {
        let items = self.corpus().items();
        self.titles
            .get(&title_key(title))
            .and_then(|positions| {
                positions
                    .iter()
                    .map(|&pos| &items[pos])
                    .min_by_key(|item| std::cmp::Reverse(item.vote_count.unwrap_or(0)))
            })
            .ok_or_else(|| RecommendError::ItemNotFound {
                title: title.to_string(),
                suggestion: self.suggest(title),
            })
    }

    /// Best-voted title that contains the query or is contained in it.
    fn suggest(&self, title: &str) -> Option<String> {
        let query = title_key(title);
        if query.is_empty() {
            return None;
        }
        self.corpus()
            .items()
            .iter()
            .filter(|item| {
                let key = title_key(&item.title);
                !key.is_empty() && (key.contains(&query) || query.contains(&key))
            })
            .min_by_key(|item| std::cmp::Reverse(item.vote_count.unwrap_or(0)))
            .map(|item| item.title.clone())
    }

    /// Up to `k` items most similar to the one titled `title`, best first.
    pub fn recommend(&self, title: &str, k: usize) -> Result<Vec<Recommendation<'_>>> {
        if k == 0 {
            return Err(RecommendError::InvalidK(k));
        }
        let query = self.resolve_title(title)?;
        tracing::debug!(title, id = query.id, k, "recommend");
        self.recommend_by_id(query.id, k)
    }

    pub fn recommend_by_id(&self, id: ItemId, k: usize) -> Result<Vec<Recommendation<'_>>> {
        Ok(self
            .neighbors(id, k)?
            .into_iter()
            .map(|(item, score)| Recommendation { item, score })
            .collect())
    }
}
