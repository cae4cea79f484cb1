use crate::ItemId;

/// Errors raised while building an index or answering a query.
///
/// Every variant is recoverable: callers report it and retry with corrected input.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("no terms survive document-frequency filtering ({num_docs} documents, min_df={min_df}, max_df={max_df})")]
    EmptyVocabulary { num_docs: usize, min_df: usize, max_df: f32 },

    #[error("no item titled {title:?}{}", did_you_mean(.suggestion))]
    ItemNotFound { title: String, suggestion: Option<String> },

    #[error("no item with id {0}")]
    UnknownId(ItemId),

    #[error("k must be at least 1, got {0}")]
    InvalidK(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("duplicate item id {0} in corpus")]
    DuplicateId(ItemId),

    #[error("index parts do not belong to the same corpus: {0}")]
    CorpusMismatch(String),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean {s:?}?"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
