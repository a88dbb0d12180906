use crate::histogram::{Bin, NodeHistogram};
use rayon::prelude::*;

/// Gradient statistics of one side of a candidate split.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeInfo {
    pub gradient_sum: f64,
    pub hessian_sum: f64,
    pub counts: usize,
}

impl From<Bin> for NodeInfo {
    fn from(b: Bin) -> Self {
        NodeInfo {
            gradient_sum: b.gradient_sum,
            hessian_sum: b.hessian_sum,
            counts: b.counts,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SplitInfo {
    pub split_gain: f64,
    pub split_feature: usize,
    /// Last bin kept on the left side.
    pub split_bin: u16,
    /// Rows with `value < split_value` go left.
    pub split_value: f64,
    pub missing_left: bool,
    pub left_node: NodeInfo,
    pub right_node: NodeInfo,
}

/// Soft threshold of the gradient sum used by L1 regularization.
#[inline]
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Evaluates candidate splits from node histograms.
#[derive(Debug, Clone)]
pub struct Splitter {
    pub learning_rate: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub min_split_gain: f64,
}

impl Splitter {
    /// Structure score of a node, higher is better.
    #[inline]
    pub fn score(&self, gradient_sum: f64, hessian_sum: f64) -> f64 {
        let t = threshold_l1(gradient_sum, self.reg_alpha);
        t * t / (hessian_sum + self.reg_lambda).max(f64::EPSILON)
    }

    /// Leaf weight after shrinkage.
    #[inline]
    pub fn weight(&self, gradient_sum: f64, hessian_sum: f64) -> f64 {
        let t = threshold_l1(gradient_sum, self.reg_alpha);
        -t / (hessian_sum + self.reg_lambda).max(f64::EPSILON) * self.learning_rate
    }

    #[inline]
    fn is_valid_child(&self, node: &NodeInfo) -> bool {
        node.counts >= self.min_child_samples.max(1) && node.hessian_sum >= self.min_child_weight
    }

    /// Best split of a single feature.
    pub fn best_feature_split(&self, feature: usize, bins: &[Bin], cuts: &[f64], parent: &NodeInfo) -> Option<SplitInfo> {
        if bins.len() < 3 {
            return None;
        }
        let missing = bins[0];
        let parent_score = self.score(parent.gradient_sum, parent.hessian_sum);
        let mut non_missing = Bin::default();
        bins[1..].iter().for_each(|b| non_missing.add(b));

        let mut best: Option<SplitInfo> = None;
        let mut left = Bin::default();
        // The last bin can never be the left side alone.
        for b in 1..(bins.len() - 1) {
            left.add(&bins[b]);
            if bins[b].counts == 0 {
                continue;
            }
            let right = non_missing.sub(&left);
            if right.counts == 0 {
                break;
            }
            let candidates: &[bool] = if missing.counts == 0 { &[false] } else { &[true, false] };
            for &missing_left in candidates {
                let (l, r) = if missing_left {
                    let mut l = left;
                    l.add(&missing);
                    (l, right)
                } else {
                    let mut r = right;
                    r.add(&missing);
                    (left, r)
                };
                let (l, r): (NodeInfo, NodeInfo) = (l.into(), r.into());
                if !self.is_valid_child(&l) || !self.is_valid_child(&r) {
                    continue;
                }
                let gain = self.score(l.gradient_sum, l.hessian_sum) + self.score(r.gradient_sum, r.hessian_sum)
                    - parent_score;
                if gain <= self.min_split_gain.max(0.0) {
                    continue;
                }
                if best.as_ref().map_or(true, |s| gain > s.split_gain) {
                    // Without missing rows in the node, unseen missing values follow the larger side.
                    let missing_left = if missing.counts == 0 {
                        l.counts >= r.counts
                    } else {
                        missing_left
                    };
                    best = Some(SplitInfo {
                        split_gain: gain,
                        split_feature: feature,
                        split_bin: b as u16,
                        split_value: cuts[b - 1],
                        missing_left,
                        left_node: l,
                        right_node: r,
                    });
                }
            }
        }
        best
    }

    /// Best split over the sampled features of a node.
    pub fn best_split(
        &self,
        hist: &NodeHistogram,
        col_index: &[usize],
        cuts: &[Vec<f64>],
        parent: &NodeInfo,
    ) -> Option<SplitInfo> {
        col_index
            .par_iter()
            .filter_map(|&col| self.best_feature_split(col, &hist.data[col], &cuts[col], parent))
            .reduce_with(|a, b| {
                // Ties go to the lower feature index so results do not depend on scheduling.
                if b.split_gain > a.split_gain || (b.split_gain == a.split_gain && b.split_feature < a.split_feature) {
                    b
                } else {
                    a
                }
            })
    }
}
