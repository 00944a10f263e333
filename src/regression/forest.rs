//! Bagged regression-tree ensembles.

use super::tree::{Criterion, RegressionTree, TreeConfig};
use super::{validate_training, Regressor};
use crate::deterministic::DesignMatrix;
use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest settings.
///
/// Defaults: 50 trees of depth at most 5, absolute-error splits, every
/// feature considered at every split, bootstrap sampling, seed 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    /// Draw each tree's training rows with replacement.
    pub bootstrap: bool,
    /// Seed for bootstrap draws and feature subsampling.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        let tree = TreeConfig::default();
        Self {
            n_estimators: 50,
            criterion: tree.criterion,
            max_depth: tree.max_depth,
            min_samples_split: tree.min_samples_split,
            min_samples_leaf: tree.min_samples_leaf,
            max_features: tree.max_features,
            bootstrap: true,
            seed: 0,
        }
    }
}

impl ForestConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_features(mut self, features: Option<usize>) -> Self {
        self.max_features = features;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Per-tree growth limits.
    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            criterion: self.criterion,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Random forest regressor: the mean prediction of trees grown on
/// bootstrap resamples of the training rows.
///
/// Training is deterministic for a fixed [`ForestConfig::seed`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    columns: Vec<String>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &DesignMatrix, y: &[f64]) -> Result<()> {
        validate_training(x, y)?;
        if self.config.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".into(),
            ));
        }

        let n = x.n_rows();
        let tree_config = self.config.tree_config();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for _ in 0..self.config.n_estimators {
            let sample: Vec<usize> = if self.config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let mut tree = RegressionTree::new(tree_config.clone());
            tree.grow(x.rows(), y, sample, x.columns(), &mut rng);
            trees.push(tree);
        }

        debug!(
            rows = n,
            columns = x.n_cols(),
            trees = trees.len(),
            max_depth = trees.iter().map(|t| t.depth()).max().unwrap_or(0),
            "fitted random forest"
        );

        self.trees = trees;
        self.columns = x.columns().to_vec();
        Ok(())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(ForecastError::UnfittedModel);
        }
        x.ensure_columns(&self.columns)?;
        let k = self.trees.len() as f64;
        Ok(x
            .rows()
            .iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / k)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "RandomForestRegressor"
    }
}
