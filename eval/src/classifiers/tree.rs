// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! CART decision trees over sparse rows
//!
//! One builder serves both ensembles: Gini impurity for forest classifiers
//! and squared error for the regression trees used by gradient boosting.
//! Nodes live in a flat arena; leaves hold a value vector (class
//! distribution or a single regression value).

use crate::features::{FeatureMatrix, SparseVector};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features examined per split; `None` examines all
    pub max_features: Option<usize>,
}

/// What the tree is fitted to
pub(crate) enum Target<'a> {
    Classes { labels: &'a [usize], n_classes: usize },
    Values(&'a [f64]),
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { value: Vec<f64> },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

trait SplitStats: Clone {
    fn empty(target: &Target) -> Self;
    fn push(&mut self, target: &Target, sample: usize);
    fn pop(&mut self, target: &Target, sample: usize);
    /// Impurity weighted by sample count
    fn cost(&self) -> f64;
    fn leaf_value(&self) -> Vec<f64>;
    /// Statistics of `self` with the samples counted in `part` removed
    fn without(&self, part: &Self) -> Self;
}

#[derive(Clone)]
struct GiniStats {
    counts: Vec<f64>,
    n: f64,
}

impl SplitStats for GiniStats {
    fn empty(target: &Target) -> Self {
        let n_classes = match target {
            Target::Classes { n_classes, .. } => *n_classes,
            Target::Values(_) => 1,
        };
        Self {
            counts: vec![0.0; n_classes],
            n: 0.0,
        }
    }

    fn push(&mut self, target: &Target, sample: usize) {
        if let Target::Classes { labels, .. } = target {
            self.counts[labels[sample]] += 1.0;
            self.n += 1.0;
        }
    }

    fn pop(&mut self, target: &Target, sample: usize) {
        if let Target::Classes { labels, .. } = target {
            self.counts[labels[sample]] -= 1.0;
            self.n -= 1.0;
        }
    }

    fn cost(&self) -> f64 {
        if self.n == 0.0 {
            return 0.0;
        }
        let sum_sq: f64 = self.counts.iter().map(|c| c * c).sum();
        self.n - sum_sq / self.n
    }

    fn leaf_value(&self) -> Vec<f64> {
        if self.n == 0.0 {
            return self.counts.clone();
        }
        self.counts.iter().map(|c| c / self.n).collect()
    }

    fn without(&self, part: &Self) -> Self {
        Self {
            counts: self.counts.iter().zip(&part.counts).map(|(a, b)| a - b).collect(),
            n: self.n - part.n,
        }
    }
}

#[derive(Clone)]
struct VarianceStats {
    sum: f64,
    sum_sq: f64,
    n: f64,
}

impl SplitStats for VarianceStats {
    fn empty(_target: &Target) -> Self {
        Self {
            sum: 0.0,
            sum_sq: 0.0,
            n: 0.0,
        }
    }

    fn push(&mut self, target: &Target, sample: usize) {
        if let Target::Values(values) = target {
            let v = values[sample];
            self.sum += v;
            self.sum_sq += v * v;
            self.n += 1.0;
        }
    }

    fn pop(&mut self, target: &Target, sample: usize) {
        if let Target::Values(values) = target {
            let v = values[sample];
            self.sum -= v;
            self.sum_sq -= v * v;
            self.n -= 1.0;
        }
    }

    fn cost(&self) -> f64 {
        if self.n == 0.0 {
            return 0.0;
        }
        (self.sum_sq - self.sum * self.sum / self.n).max(0.0)
    }

    fn leaf_value(&self) -> Vec<f64> {
        if self.n == 0.0 {
            return vec![0.0];
        }
        vec![self.sum / self.n]
    }

    fn without(&self, part: &Self) -> Self {
        Self {
            sum: self.sum - part.sum,
            sum_sq: self.sum_sq - part.sum_sq,
            n: self.n - part.n,
        }
    }
}

struct Builder<'a> {
    x: &'a FeatureMatrix,
    target: &'a Target<'a>,
    params: TreeParams,
    rng: &'a mut ChaCha8Rng,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices into `x`, repeats allowed)
    pub(crate) fn fit(
        x: &FeatureMatrix,
        samples: &[usize],
        target: &Target,
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut builder = Builder {
            x,
            target,
            params,
            rng,
            nodes: Vec::new(),
        };
        match target {
            Target::Classes { .. } => builder.grow::<GiniStats>(samples, 0),
            Target::Values(_) => builder.grow::<VarianceStats>(samples, 0),
        };
        Self { nodes: builder.nodes }
    }

    /// Arena index of the leaf `row` falls into
    pub(crate) fn leaf_index(&self, row: &SparseVector) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row.get(*feature) <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn predict(&self, row: &SparseVector) -> &[f64] {
        match &self.nodes[self.leaf_index(row)] {
            Node::Leaf { value } => value,
            Node::Split { .. } => &[],
        }
    }

    /// Replace the value stored at a leaf
    pub(crate) fn set_leaf_value(&mut self, leaf: usize, new_value: Vec<f64>) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(leaf) {
            *value = new_value;
        }
    }

    #[cfg(test)]
    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl Builder<'_> {
    /// Returns the arena index of the subtree root
    fn grow<S: SplitStats>(&mut self, samples: &[usize], depth: usize) -> usize {
        let mut stats = S::empty(self.target);
        for &s in samples {
            stats.push(self.target, s);
        }

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: stats.leaf_value(),
        });

        let parent_cost = stats.cost();
        if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || parent_cost <= MIN_GAIN
        {
            return idx;
        }

        let Some((feature, threshold)) = self.best_split(samples, &stats, parent_cost) else {
            return idx;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| self.x.row(s).get(feature) <= threshold);

        let left = self.grow::<S>(&left_samples, depth + 1);
        let right = self.grow::<S>(&right_samples, depth + 1);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    /// Nonzero entries of the node grouped by feature, as `(value, sample)`
    ///
    /// Repeated samples appear once per repeat. Every sample missing from a
    /// feature's list has value 0 for it.
    fn node_columns(&self, samples: &[usize]) -> BTreeMap<usize, Vec<(f64, usize)>> {
        let mut columns: BTreeMap<usize, Vec<(f64, usize)>> = BTreeMap::new();
        for &s in samples {
            let row = self.x.row(s);
            for (&feature, &value) in row.indices.iter().zip(&row.values) {
                if value != 0.0 {
                    columns.entry(feature).or_default().push((value, s));
                }
            }
        }
        columns
    }

    fn candidate_features(&mut self, columns: &BTreeMap<usize, Vec<(f64, usize)>>) -> Vec<usize> {
        // Features that are zero for every sample cannot split the node
        let mut candidates: Vec<usize> = columns.keys().copied().collect();

        if let Some(k) = self.params.max_features {
            if candidates.len() > k {
                let mut chosen: Vec<usize> = candidates.choose_multiple(&mut *self.rng, k).copied().collect();
                chosen.sort_unstable();
                candidates = chosen;
            }
        }
        candidates
    }

    /// Scan each candidate feature in ascending value order
    ///
    /// Only the node's nonzeros are sorted. The zero-valued samples form one
    /// block between the negative and positive entries, moved left in a
    /// single step, so a feature costs `O(k log k)` for `k` node nonzeros.
    fn best_split<S: SplitStats>(&mut self, samples: &[usize], total: &S, parent_cost: f64) -> Option<(usize, f64)> {
        let mut columns = self.node_columns(samples);
        let mut best = BestSplit {
            split: None,
            cost: parent_cost - MIN_GAIN,
        };

        for feature in self.candidate_features(&columns) {
            let Some(entries) = columns.get_mut(&feature) else {
                continue;
            };
            entries.sort_by(|a, b| a.0.total_cmp(&b.0));
            let n_zero = samples.len() - entries.len();
            let (negative, positive) = entries.split_at(entries.partition_point(|e| e.0 < 0.0));

            let mut left = S::empty(self.target);
            let mut right = total.clone();

            let after_negative = if n_zero > 0 { Some(0.0) } else { positive.first().map(|e| e.0) };
            self.scan_run(feature, negative, after_negative, &mut left, &mut right, &mut best);

            if n_zero > 0 {
                let mut positive_stats = S::empty(self.target);
                for &(_, sample) in positive {
                    positive_stats.push(self.target, sample);
                }
                left = total.without(&positive_stats);
                right = positive_stats;
                if let Some(&(next, _)) = positive.first() {
                    best.offer(feature, 0.0, next, left.cost() + right.cost());
                }
            }

            self.scan_run(feature, positive, None, &mut left, &mut right, &mut best);
        }

        best.split
    }

    /// Move a sorted run of entries from `right` to `left`, scoring each
    /// boundary between distinct values; `next` is the value after the run
    fn scan_run<S: SplitStats>(
        &self,
        feature: usize,
        run: &[(f64, usize)],
        next: Option<f64>,
        left: &mut S,
        right: &mut S,
        best: &mut BestSplit,
    ) {
        for (i, &(value, sample)) in run.iter().enumerate() {
            left.push(self.target, sample);
            right.pop(self.target, sample);

            let Some(following) = run.get(i + 1).map(|e| e.0).or(next) else {
                continue;
            };
            if following <= value {
                continue;
            }
            best.offer(feature, value, following, left.cost() + right.cost());
        }
    }
}

struct BestSplit {
    split: Option<(usize, f64)>,
    cost: f64,
}

impl BestSplit {
    /// Keep the split between `value` and `next` if it is strictly cheaper
    fn offer(&mut self, feature: usize, value: f64, next: f64, cost: f64) {
        if cost < self.cost {
            self.cost = cost;
            self.split = Some((feature, value + (next - value) / 2.0));
        }
    }
}
