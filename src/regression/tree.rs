//! CART regression trees.

use super::{validate_training, Regressor};
use crate::deterministic::DesignMatrix;
use crate::error::{ForecastError, Result};
use crate::utils::stats::{abs_deviation_sorted, mean, median_sorted};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Node impurities below this are treated as pure.
const PURE_EPS: f64 = 1e-12;

/// Split quality measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Sum of absolute deviations from the node median; leaves predict the median.
    #[default]
    AbsoluteError,
    /// Sum of squared deviations from the node mean; leaves predict the mean.
    SquaredError,
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub criterion: Criterion,
    /// Maximum depth; `None` grows until the other limits stop it.
    pub max_depth: Option<usize>,
    /// A node needs at least this many samples to be split.
    pub min_samples_split: usize,
    /// Each child keeps at least this many samples.
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all.
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::AbsoluteError,
            max_depth: Some(5),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A binary regression tree. Rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    config: TreeConfig,
    seed: u64,
    nodes: Vec<Node>,
    columns: Vec<String>,
    depth: usize,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl RegressionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            seed: 0,
            nodes: Vec::new(),
            columns: Vec::new(),
            depth: 0,
        }
    }

    /// Seed for feature subsampling when `max_features` is set.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Depth of the fitted tree (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Grow the tree on the rows selected by `sample`, which may repeat
    /// indices (bootstrap draws).
    pub(crate) fn grow<R: Rng + ?Sized>(
        &mut self,
        rows: &[Vec<f64>],
        y: &[f64],
        sample: Vec<usize>,
        columns: &[String],
        rng: &mut R,
    ) {
        let mut builder = Builder {
            rows,
            y,
            config: &self.config,
            rng,
            nodes: Vec::new(),
            depth: 0,
        };
        builder.grow(sample, 0);
        self.depth = builder.depth;
        self.nodes = builder.nodes;
        self.columns = columns.to_vec();
    }

    /// Prediction for one raw feature row.
    pub(crate) fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => id = if row[*feature] <= *threshold { *left } else { *right },
                None => return f64::NAN,
            }
        }
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, x: &DesignMatrix, y: &[f64]) -> Result<()> {
        validate_training(x, y)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.grow(x.rows(), y, (0..x.n_rows()).collect(), x.columns(), &mut rng);
        Ok(())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<f64>> {
        if self.nodes.is_empty() {
            return Err(ForecastError::UnfittedModel);
        }
        x.ensure_columns(&self.columns)?;
        Ok(x.rows().iter().map(|r| self.predict_row(r)).collect())
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    fn name(&self) -> &str {
        "RegressionTree"
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

struct Builder<'a, R: ?Sized> {
    rows: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a TreeConfig,
    rng: &'a mut R,
    nodes: Vec<Node>,
    depth: usize,
}

impl<R: Rng + ?Sized> Builder<'_, R> {
    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let mut targets: Vec<f64> = sample.iter().map(|&i| self.y[i]).collect();
        targets.sort_by(f64::total_cmp);
        let (value, impurity) = match self.config.criterion {
            Criterion::AbsoluteError => (median_sorted(&targets), abs_deviation_sorted(&targets)),
            Criterion::SquaredError => {
                let m = mean(&targets);
                (m, targets.iter().map(|t| (t - m).powi(2)).sum())
            }
        };

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value });
        self.depth = self.depth.max(depth);

        let n = sample.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let can_deepen = self.config.max_depth.map_or(true, |d| depth < d);
        if !can_deepen
            || n < self.config.min_samples_split.max(2)
            || n < 2 * min_leaf
            || impurity <= PURE_EPS
        {
            return id;
        }

        let Some(split) = self.best_split(&sample, min_leaf) else {
            return id;
        };

        let rows = self.rows;
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| rows[i][split.feature] <= split.threshold);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&mut self, sample: &[usize], min_leaf: usize) -> Option<Candidate> {
        let n_features = self.rows.first().map_or(0, |r| r.len());
        let features: Vec<usize> = match self.config.max_features {
            Some(m) if m < n_features => {
                rand::seq::index::sample(&mut *self.rng, n_features, m.max(1)).into_vec()
            }
            _ => (0..n_features).collect(),
        };

        let n = sample.len();
        let mut best: Option<Candidate> = None;
        for feature in features {
            let mut order = sample.to_vec();
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            let xs: Vec<f64> = order.iter().map(|&i| self.rows[i][feature]).collect();
            let ys: Vec<f64> = order.iter().map(|&i| self.y[i]).collect();
            let costs = split_costs(self.config.criterion, &ys);

            for i in min_leaf..=(n - min_leaf) {
                if xs[i - 1] >= xs[i] {
                    continue;
                }
                let cost = costs[i];
                if best.as_ref().map_or(true, |b| cost < b.cost) {
                    let mid = 0.5 * (xs[i - 1] + xs[i]);
                    let threshold = if mid < xs[i] { mid } else { xs[i - 1] };
                    best = Some(Candidate {
                        feature,
                        threshold,
                        cost,
                    });
                }
            }
        }
        best
    }
}

/// `costs[i]` is the impurity of splitting `ys` into `ys[..i]` and `ys[i..]`.
fn split_costs(criterion: Criterion, ys: &[f64]) -> Vec<f64> {
    let n = ys.len();
    let mut left = vec![0.0; n + 1];
    let mut right = vec![0.0; n + 1];
    match criterion {
        Criterion::SquaredError => {
            let sse = |sum: f64, sumsq: f64, count: usize| {
                if count == 0 {
                    0.0
                } else {
                    (sumsq - sum * sum / count as f64).max(0.0)
                }
            };
            let (mut s, mut ss) = (0.0, 0.0);
            for i in 0..n {
                s += ys[i];
                ss += ys[i] * ys[i];
                left[i + 1] = sse(s, ss, i + 1);
            }
            let (mut s, mut ss) = (0.0, 0.0);
            for i in (0..n).rev() {
                s += ys[i];
                ss += ys[i] * ys[i];
                right[i] = sse(s, ss, n - i);
            }
        }
        Criterion::AbsoluteError => {
            let mut running = RunningMedian::default();
            for i in 0..n {
                running.push(ys[i]);
                left[i + 1] = running.abs_deviation();
            }
            let mut running = RunningMedian::default();
            for i in (0..n).rev() {
                running.push(ys[i]);
                right[i] = running.abs_deviation();
            }
        }
    }
    left.iter().zip(&right).map(|(l, r)| l + r).collect()
}

/// Total order over floats for heap storage.
#[derive(Debug, Clone, Copy)]
struct Total(f64);

impl PartialEq for Total {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Total {}

impl PartialOrd for Total {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Total {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Streaming sum of absolute deviations from the median, kept as two heaps.
/// `lower` holds the smaller half and is never shorter than `upper`.
#[derive(Debug, Default)]
struct RunningMedian {
    lower: BinaryHeap<Total>,
    upper: BinaryHeap<Reverse<Total>>,
    lower_sum: f64,
    upper_sum: f64,
}

impl RunningMedian {
    fn push(&mut self, value: f64) {
        if self.lower.peek().map_or(true, |top| value <= top.0) {
            self.lower.push(Total(value));
            self.lower_sum += value;
        } else {
            self.upper.push(Reverse(Total(value)));
            self.upper_sum += value;
        }

        if self.lower.len() > self.upper.len() + 1 {
            if let Some(Total(moved)) = self.lower.pop() {
                self.lower_sum -= moved;
                self.upper.push(Reverse(Total(moved)));
                self.upper_sum += moved;
            }
        } else if self.upper.len() > self.lower.len() {
            if let Some(Reverse(Total(moved))) = self.upper.pop() {
                self.upper_sum -= moved;
                self.lower.push(Total(moved));
                self.lower_sum += moved;
            }
        }
    }

    fn abs_deviation(&self) -> f64 {
        let Some(&Total(m)) = self.lower.peek() else {
            return 0.0;
        };
        let below = m * self.lower.len() as f64 - self.lower_sum;
        let above = self.upper_sum - m * self.upper.len() as f64;
        (below + above).max(0.0)
    }
}
