use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};

/// Inverse-document-frequency formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// `ln(1 + N/df)`: strictly positive, so terms in every document still count.
    #[default]
    Smoothed,
    /// `ln(N/df)`: terms present in every document weigh zero.
    Raw,
}

impl IdfMode {
    pub fn idf(self, num_docs: usize, df: usize) -> f32 {
        let n = num_docs.max(1) as f32;
        let df = df.max(1) as f32;
        match self {
            IdfMode::Smoothed => (1.0 + n / df).ln(),
            IdfMode::Raw => (n / df).ln(),
        }
    }
}

/// How pairwise similarities are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Dense N x N matrix computed at build time.
    #[default]
    Precomputed,
    /// One pass over all vectors per query.
    OnDemand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Drop terms found in fewer documents than this.
    pub min_df: usize,
    /// Drop terms found in more than this fraction of documents.
    pub max_df: f32,
    /// How many times genres and director are repeated in a document.
    pub label_weight: usize,
    /// Neighbors returned when the caller does not ask for a count.
    pub k_default: usize,
    pub idf: IdfMode,
    pub strategy: Strategy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_df: 0.95,
            label_weight: 1,
            k_default: 5,
            idf: IdfMode::default(),
            strategy: Strategy::default(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_df == 0 {
            return Err(RecommendError::InvalidConfig("min_df must be at least 1".into()));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(RecommendError::InvalidConfig(format!("max_df must be in (0, 1], got {}", self.max_df)));
        }
        if self.label_weight == 0 {
            return Err(RecommendError::InvalidConfig("label_weight must be at least 1".into()));
        }
        if self.k_default == 0 {
            return Err(RecommendError::InvalidConfig("k_default must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        IndexConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        for cfg in [
            IndexConfig { min_df: 0, ..Default::default() },
            IndexConfig { max_df: 0.0, ..Default::default() },
            IndexConfig { max_df: 1.5, ..Default::default() },
            IndexConfig { max_df: f32::NAN, ..Default::default() },
            IndexConfig { label_weight: 0, ..Default::default() },
            IndexConfig { k_default: 0, ..Default::default() },
        ] {
            assert!(matches!(cfg.validate(), Err(RecommendError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn idf_never_increases_with_df() {
        for mode in [IdfMode::Smoothed, IdfMode::Raw] {
            let weights: Vec<f32> = (1..=10).map(|df| mode.idf(10, df)).collect();
            assert!(weights.windows(2).all(|w| w[0] >= w[1]), "{mode:?}: {weights:?}");
        }
        assert_eq!(IdfMode::Raw.idf(10, 10), 0.0);
        assert!(IdfMode::Smoothed.idf(10, 10) > 0.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: IndexConfig = serde_json::from_str(r#"{"label_weight": 3, "strategy": "on_demand"}"#).unwrap();
        assert_eq!(cfg.label_weight, 3);
        assert_eq!(cfg.strategy, Strategy::OnDemand);
        assert_eq!(cfg.k_default, 5);
    }
}
