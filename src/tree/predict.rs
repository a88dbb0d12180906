use super::tree::Tree;
use crate::data::Matrix;
use crate::shapley::predict_contributions_row_shapley;
use rayon::prelude::*;

impl Tree {
    /// Predict a single row of a column major matrix.
    #[inline]
    pub fn predict_row(&self, data: &Matrix<f64>, row: usize) -> f64 {
        let mut node_idx = 0;
        loop {
            let node = &self.nodes[node_idx];
            if node.is_leaf {
                return node.weight_value;
            }
            node_idx = node.get_child_idx(*data.get(row, node.split_feature));
        }
    }

    /// Predict a single row given as a slice of feature values.
    pub fn predict_row_from_values(&self, row: &[f64]) -> f64 {
        let mut node_idx = 0;
        loop {
            let node = &self.nodes[node_idx];
            if node.is_leaf {
                return node.weight_value;
            }
            node_idx = node.get_child_idx(row[node.split_feature]);
        }
    }

    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Vec<f64> {
        if parallel {
            data.index.par_iter().map(|i| self.predict_row(data, *i)).collect()
        } else {
            data.index.iter().map(|i| self.predict_row(data, *i)).collect()
        }
    }

    /// Add the exact tree-SHAP contributions of one row, the last slot is the bias.
    pub fn predict_contributions_row_shapley(&self, row: &[f64], contribs: &mut [f64]) {
        predict_contributions_row_shapley(self, row, contribs)
    }
}
