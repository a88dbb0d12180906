use crate::splitter::SplitInfo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Debug};

/// A node that is waiting in the growth queue, ordered by the gain of its best split.
#[derive(Debug)]
pub struct SplittableNode {
    pub num: usize,
    pub depth: usize,
    pub start_idx: usize,
    pub stop_idx: usize,
    pub split: SplitInfo,
}

impl Ord for SplittableNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.split
            .split_gain
            .total_cmp(&other.split.split_gain)
            // Earlier nodes first on equal gain.
            .then_with(|| other.num.cmp(&self.num))
    }
}

impl PartialOrd for SplittableNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SplittableNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplittableNode {}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub num: usize,
    pub weight_value: f64,
    pub hessian_sum: f64,
    pub counts_sum: usize,
    pub depth: usize,
    pub split_value: f64,
    pub split_feature: usize,
    pub split_gain: f64,
    pub missing_left: bool,
    pub left_child: usize,
    pub right_child: usize,
    pub is_leaf: bool,
}

impl Node {
    pub fn new_leaf(num: usize, weight_value: f64, hessian_sum: f64, counts_sum: usize, depth: usize) -> Self {
        Node {
            num,
            weight_value,
            hessian_sum,
            counts_sum,
            depth,
            split_value: 0.0,
            split_feature: 0,
            split_gain: 0.0,
            missing_left: false,
            left_child: 0,
            right_child: 0,
            is_leaf: true,
        }
    }

    /// Turn a leaf into a parent node.
    pub fn make_parent_node(&mut self, split: &SplitInfo, left_child: usize, right_child: usize) {
        self.is_leaf = false;
        self.split_value = split.split_value;
        self.split_feature = split.split_feature;
        self.split_gain = split.split_gain;
        self.missing_left = split.missing_left;
        self.left_child = left_child;
        self.right_child = right_child;
    }

    /// Get the path that should be traveled down, given a value.
    #[inline]
    pub fn get_child_idx(&self, v: f64) -> usize {
        if v.is_nan() {
            if self.missing_left {
                self.left_child
            } else {
                self.right_child
            }
        } else if v < self.split_value {
            self.left_child
        } else {
            self.right_child
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf {
            write!(f, "{}:leaf={},cover={}", self.num, self.weight_value, self.hessian_sum)
        } else {
            write!(
                f,
                "{}:[{} < {}] yes={},no={},missing={},gain={},cover={}",
                self.num,
                self.split_feature,
                self.split_value,
                self.left_child,
                self.right_child,
                if self.missing_left { self.left_child } else { self.right_child },
                self.split_gain,
                self.hessian_sum
            )
        }
    }
}
