//! Multi-output regression trees shared by the forest and boosting models.

/// Growth limits of a single tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeParams {
    /// Maximum depth. `None` grows until leaves are pure.
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    /// Fraction of the features examined at each split.
    pub(crate) max_features: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1.0,
        }
    }
}

impl TreeParams {
    /// Number of candidate features per split, at least one.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn features_per_split(&self, n_features: usize) -> usize {
        ((self.max_features * n_features as f64) as usize).clamp(1, n_features.max(1))
    }
}

/// A node in the regression tree (arena-allocated).
#[derive(Clone, Debug)]
enum TreeNode {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART regression tree with vector-valued leaves.
///
/// Splits maximise the reduction of the squared error summed over all
/// outputs.
#[derive(Clone, Debug)]
pub(crate) struct RegressionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

struct Growth<'a> {
    x: &'a [Vec<f64>],
    y: &'a [Vec<f64>],
    params: &'a TreeParams,
    n_outputs: usize,
}

impl RegressionTree {
    /// Grows a tree on the rows named by `indices` (repeats allowed).
    pub(crate) fn fit(
        x: &[Vec<f64>],
        y: &[Vec<f64>],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let growth = Growth {
            x,
            y,
            params,
            n_outputs: y.first().map_or(0, Vec::len),
        };
        let mut tree = Self {
            nodes: Vec::new(),
            n_features: x.first().map_or(0, Vec::len),
        };
        tree.build_node(&growth, indices, 0, rng);
        tree
    }

    pub(crate) fn n_features(&self) -> usize {
        self.n_features
    }

    /// The leaf value reached by `row`.
    pub(crate) fn predict_row(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn push_leaf(&mut self, value: Vec<f64>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value });
        idx
    }

    #[allow(clippy::cast_precision_loss)]
    fn build_node(
        &mut self,
        g: &Growth<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let n = indices.len();
        let mut sums = vec![0.0; g.n_outputs];
        let mut squares = vec![0.0; g.n_outputs];
        for &i in indices {
            for (k, &v) in g.y[i].iter().enumerate() {
                sums[k] += v;
                squares[k] += v * v;
            }
        }
        let mean: Vec<f64> = sums.iter().map(|s| s / n.max(1) as f64).collect();

        if n < g.params.min_samples_split || g.params.max_depth.is_some_and(|d| depth >= d) {
            return self.push_leaf(mean);
        }

        let total_sse = sse(&sums, &squares, n);
        if total_sse <= f64::EPSILON * (1.0 + squares.iter().sum::<f64>()) {
            return self.push_leaf(mean);
        }

        // Features beyond the quota are examined only while no valid split
        // has been found.
        let quota = g.params.features_per_split(self.n_features);
        let candidates = partial_shuffle(self.n_features, self.n_features, rng);

        let mut best: Option<(f64, usize, f64)> = None;
        for (visited, &feat) in candidates.iter().enumerate() {
            if visited >= quota && best.is_some() {
                break;
            }
            if let Some((score, threshold)) = best_threshold(g, indices, feat, total_sse)
                && best.is_none_or(|(s, _, _)| score > s)
            {
                best = Some((score, feat, threshold));
            }
        }

        let Some((score, feature, threshold)) = best else {
            return self.push_leaf(mean);
        };
        if score <= 0.0 {
            return self.push_leaf(mean);
        }

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| g.x[i][feature] <= threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return self.push_leaf(mean);
        }

        // Placeholder replaced once both children exist.
        let node_idx = self.push_leaf(Vec::new());
        let left = self.build_node(g, &left_indices, depth + 1, rng);
        let right = self.build_node(g, &right_indices, depth + 1, rng);
        self.nodes[node_idx] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }
}

/// Sum of squared deviations from the mean, summed over outputs.
#[allow(clippy::cast_precision_loss)]
fn sse(sums: &[f64], squares: &[f64], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    sums.iter()
        .zip(squares)
        .map(|(s, q)| q - s * s / n as f64)
        .sum()
}

/// Best split of `feature` as `(sse reduction, threshold)`, sweeping the
/// sorted feature values with running sums.
fn best_threshold(
    g: &Growth<'_>,
    indices: &[usize],
    feature: usize,
    total_sse: f64,
) -> Option<(f64, f64)> {
    if indices.len() < 2 {
        return None;
    }
    let mut order: Vec<usize> = indices.to_vec();
    order.sort_by(|&a, &b| g.x[a][feature].total_cmp(&g.x[b][feature]));

    let n = order.len();
    let mut total_sums = vec![0.0; g.n_outputs];
    let mut total_squares = vec![0.0; g.n_outputs];
    for &i in &order {
        for (k, &v) in g.y[i].iter().enumerate() {
            total_sums[k] += v;
            total_squares[k] += v * v;
        }
    }

    let mut l_sums = vec![0.0; g.n_outputs];
    let mut l_squares = vec![0.0; g.n_outputs];
    let mut r_sums = vec![0.0; g.n_outputs];
    let mut r_squares = vec![0.0; g.n_outputs];
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..n - 1 {
        let i = order[pos];
        for (k, &v) in g.y[i].iter().enumerate() {
            l_sums[k] += v;
            l_squares[k] += v * v;
        }
        let here = g.x[i][feature];
        let next = g.x[order[pos + 1]][feature];
        #[allow(clippy::float_cmp)]
        if here == next {
            continue;
        }
        let l_n = pos + 1;
        let r_n = n - l_n;
        if l_n < g.params.min_samples_leaf || r_n < g.params.min_samples_leaf {
            continue;
        }
        for k in 0..g.n_outputs {
            r_sums[k] = total_sums[k] - l_sums[k];
            r_squares[k] = total_squares[k] - l_squares[k];
        }
        let score = total_sse - sse(&l_sums, &l_squares, l_n) - sse(&r_sums, &r_squares, r_n);
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, f64::midpoint(here, next)));
        }
    }
    best
}

/// Select `k` random indices from `0..n` using partial Fisher-Yates shuffle.
fn partial_shuffle(n: usize, k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = rng.usize(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}
