pub mod predict;
pub mod tree;

// Unit-testing
#[cfg(test)]
mod tests {
    use crate::binning::bin_matrix;
    use crate::data::Matrix;
    use crate::objective::{Objective, ObjectiveFunction};
    use crate::splitter::Splitter;
    use crate::tree::tree::{Tree, TreeData, TreeLimits};
    use crate::utils::precision_round;

    fn splitter() -> Splitter {
        Splitter {
            learning_rate: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
            min_child_samples: 1,
            min_child_weight: 0.0,
            min_split_gain: 0.0,
        }
    }

    fn fit_tree(x: &[f64], rows: usize, cols: usize, y: &[f64], limits: TreeLimits) -> Tree {
        let data = Matrix::new(x, rows, cols);
        let yhat = vec![0.0; rows];
        let (g, h) = Objective::SquaredLoss.gradient(y, &yhat, None);
        let b = bin_matrix(&data, 255).unwrap();
        let bdata = Matrix::new(&b.binned_data, rows, cols);
        let tree_data = TreeData {
            bdata: &bdata,
            cuts: &b.cuts,
            nbins: &b.nbins,
        };
        let col_index: Vec<usize> = (0..cols).collect();
        let mut tree = Tree::new();
        tree.fit(&tree_data, data.index.to_owned(), &col_index, &g, &h, &splitter(), limits);
        tree
    }

    #[test]
    fn test_tree_fit_step_function() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let tree = fit_tree(
            &x,
            6,
            1,
            &y,
            TreeLimits {
                num_leaves: 2,
                max_depth: None,
            },
        );
        assert_eq!(tree.n_leaves, 2);
        assert_eq!(tree.depth, 1);
        let data = Matrix::new(&x, 6, 1);
        let preds = tree.predict(&data, true);
        assert_eq!(preds, y);
        assert_eq!(tree.nodes[0].split_value, 3.5);
        // Missing values follow the larger side, ties go left.
        assert_eq!(tree.predict_row_from_values(&[f64::NAN]), 0.0);
    }

    #[test]
    fn test_tree_respects_limits() {
        let x: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (v * 0.37).sin()).collect();
        let tree = fit_tree(
            &x,
            64,
            1,
            &y,
            TreeLimits {
                num_leaves: 31,
                max_depth: Some(3),
            },
        );
        assert!(tree.depth <= 3);
        assert!(tree.n_leaves <= 8);
        let tree = fit_tree(
            &x,
            64,
            1,
            &y,
            TreeLimits {
                num_leaves: 5,
                max_depth: None,
            },
        );
        assert_eq!(tree.n_leaves, 5);
        assert_eq!(tree.nodes.iter().filter(|n| n.is_leaf).count(), 5);
    }

    #[test]
    fn test_tree_shap_sums_to_prediction() {
        let x = vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, // feature 0
            0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, // feature 1
        ];
        let y = vec![0.0, 1.0, 0.0, 1.0, 5.0, 6.0, 5.0, 6.0];
        let tree = fit_tree(
            &x,
            8,
            2,
            &y,
            TreeLimits {
                num_leaves: 4,
                max_depth: None,
            },
        );
        let data = Matrix::new(&x, 8, 2);
        for i in 0..8 {
            let row = data.get_row(i);
            let mut contribs = vec![0.0; 3];
            tree.predict_contributions_row_shapley(&row, &mut contribs);
            let total: f64 = contribs.iter().sum();
            assert_eq!(precision_round(total, 8), precision_round(tree.predict_row(&data, i), 8));
        }
        assert!(format!("{}", tree).contains("leaf="));
    }
}
