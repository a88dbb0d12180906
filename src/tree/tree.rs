use crate::data::Matrix;
use crate::histogram::NodeHistogram;
use crate::node::{Node, SplittableNode};
use crate::splitter::{NodeInfo, Splitter};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;
use std::fmt::{self, Display};

/// Limits on the shape of a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub depth: usize,
    pub n_leaves: usize,
}

/// Binned training data shared by every tree of a booster.
pub struct TreeData<'a> {
    pub bdata: &'a Matrix<'a, u16>,
    pub cuts: &'a [Vec<f64>],
    pub nbins: &'a [usize],
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Grow the tree leaf-wise, always splitting the leaf with the largest gain.
    ///
    /// * `data` - Binned training data.
    /// * `index` - Rows sampled for this tree.
    /// * `col_index` - Features sampled for this tree.
    pub fn fit(
        &mut self,
        data: &TreeData,
        mut index: Vec<usize>,
        col_index: &[usize],
        grad: &[f64],
        hess: &[f64],
        splitter: &Splitter,
        limits: TreeLimits,
    ) {
        self.nodes.clear();
        let mut root = NodeInfo::default();
        for &i in index.iter() {
            root.gradient_sum += grad[i];
            root.hessian_sum += hess[i];
            root.counts += 1;
        }
        self.nodes.push(Node::new_leaf(
            0,
            splitter.weight(root.gradient_sum, root.hessian_sum),
            root.hessian_sum,
            root.counts,
            0,
        ));
        self.n_leaves = 1;
        self.depth = 0;

        let can_split = |depth: usize| limits.max_depth.map_or(true, |d| depth < d);

        let mut hists: HashMap<usize, NodeHistogram> = HashMap::new();
        let mut growable = BinaryHeap::new();
        if can_split(0) && limits.num_leaves > 1 {
            let root_hist = NodeHistogram::from_index(data.bdata, data.nbins, &index, grad, hess, col_index);
            if let Some(split) = splitter.best_split(&root_hist, col_index, data.cuts, &root) {
                hists.insert(0, root_hist);
                growable.push(SplittableNode {
                    num: 0,
                    depth: 0,
                    start_idx: 0,
                    stop_idx: index.len(),
                    split,
                });
            }
        }

        while self.n_leaves < limits.num_leaves {
            let Some(node) = growable.pop() else {
                break;
            };
            let split = node.split;

            // Partition the node rows, left rows first.
            let col_data = data.bdata.get_col(split.split_feature);
            let rows = &mut index[node.start_idx..node.stop_idx];
            let goes_left = |i: usize| {
                let b = col_data[i];
                if b == 0 {
                    split.missing_left
                } else {
                    b <= split.split_bin
                }
            };
            let mut n_left = 0;
            for k in 0..rows.len() {
                if goes_left(rows[k]) {
                    rows.swap(n_left, k);
                    n_left += 1;
                }
            }
            let mid = node.start_idx + n_left;

            let left_num = self.nodes.len();
            let right_num = left_num + 1;
            let depth = node.depth + 1;
            self.nodes[node.num].make_parent_node(&split, left_num, right_num);
            for (num, info) in [(left_num, split.left_node), (right_num, split.right_node)] {
                self.nodes.push(Node::new_leaf(
                    num,
                    splitter.weight(info.gradient_sum, info.hessian_sum),
                    info.hessian_sum,
                    info.counts,
                    depth,
                ));
            }
            self.n_leaves += 1;
            self.depth = self.depth.max(depth);

            let Some(parent_hist) = hists.remove(&node.num) else {
                continue;
            };
            if !can_split(depth) || self.n_leaves >= limits.num_leaves {
                continue;
            }

            // Build the smaller child directly, derive the sibling by subtraction.
            let (small, large) = if n_left <= (node.stop_idx - mid) {
                ((left_num, node.start_idx, mid), (right_num, mid, node.stop_idx))
            } else {
                ((right_num, mid, node.stop_idx), (left_num, node.start_idx, mid))
            };
            let small_hist =
                NodeHistogram::from_index(data.bdata, data.nbins, &index[small.1..small.2], grad, hess, col_index);
            let large_hist = NodeHistogram::from_parent_child(&parent_hist, &small_hist, col_index);

            for ((num, start, stop), hist) in [(small, small_hist), (large, large_hist)] {
                let info = if num == left_num { split.left_node } else { split.right_node };
                if info.counts < 2 * splitter.min_child_samples.max(1) {
                    continue;
                }
                if let Some(child_split) = splitter.best_split(&hist, col_index, data.cuts, &info) {
                    hists.insert(num, hist);
                    growable.push(SplittableNode {
                        num,
                        depth,
                        start_idx: start,
                        stop_idx: stop,
                        split: child_split,
                    });
                }
            }
        }
    }

    /// Expected value of the tree, leaf weights averaged by row counts.
    pub fn get_average_leaf_weights(&self, i: usize) -> f64 {
        let node = &self.nodes[i];
        if node.is_leaf {
            node.weight_value
        } else {
            let left_node = &self.nodes[node.left_child];
            let right_node = &self.nodes[node.right_child];
            let mut w = left_node.counts_sum as f64 * self.get_average_leaf_weights(node.left_child);
            w += right_node.counts_sum as f64 * self.get_average_leaf_weights(node.right_child);
            w / (node.counts_sum as f64).max(1.0)
        }
    }

    fn get_node_stats<F>(&self, calc_stat: &F, stats: &mut HashMap<usize, (f64, usize)>)
    where
        F: Fn(&Node) -> f64,
    {
        self.nodes.iter().filter(|n| !n.is_leaf).for_each(|n| {
            let v = calc_stat(n);
            stats
                .entry(n.split_feature)
                .and_modify(|(s, c)| {
                    *s += v;
                    *c += 1;
                })
                .or_insert((v, 1));
        });
    }

    pub fn calculate_importance_weight(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|_: &Node| 1., stats);
    }

    pub fn calculate_importance_gain(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|n: &Node| n.split_gain, stats);
    }

    pub fn calculate_importance_cover(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|n: &Node| n.hessian_sum, stats);
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<usize> = vec![0];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node).as_str();
            if !node.is_leaf {
                print_buffer.push(node.right_child);
                print_buffer.push(node.left_child);
            }
        }
        write!(f, "{}", r)
    }
}
