//! Content-based movie recommendations.
//!
//! Items are turned into term documents ([`compose`]), weighted with TF-IDF
//! ([`vectorize`]), and compared by cosine similarity ([`similarity`]).
//! [`build_index`] runs the whole pipeline once; the resulting [`Index`] is
//! immutable and answers [`Index::recommend`] from any number of threads.
//!
//! ```
//! use cinematch_core::{build_index, IndexConfig, Item};
//!
//! let mut items = Vec::new();
//! for (id, title, genre, overview) in [
//!     (1, "Alpha", "Action", "a hero saves the city"),
//!     (2, "Beta", "Action", "a hero saves the world"),
//!     (3, "Gamma", "Romance", "two people fall in love"),
//! ] {
//!     let mut item = Item::new(id, title);
//!     item.genres = vec![genre.to_string()];
//!     item.overview = overview.to_string();
//!     items.push(item);
//! }
//!
//! let index = build_index(items, &IndexConfig::default()).unwrap();
//! let recs = index.recommend("alpha", 2).unwrap();
//! assert_eq!(recs[0].item.title, "Beta");
//! ```

pub mod compose;
pub mod config;
pub mod error;
pub mod handle;
pub mod index;
pub mod item;
pub mod persist;
pub mod recommend;
pub mod similarity;
pub mod tokenizer;
pub mod vectorize;

pub type TermId = u32;
pub type ItemId = u64;

pub use compose::{Document, FeatureComposer};
pub use config::{IdfMode, IndexConfig, Strategy};
pub use error::RecommendError;
pub use handle::IndexHandle;
pub use index::{build_index, Index};
pub use item::{Corpus, Item, ItemRecord};
pub use recommend::Recommendation;
pub use similarity::{Neighbor, SimilarityIndex};
pub use vectorize::{FeatureVector, FittedModel, Vectorizer};
