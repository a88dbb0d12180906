//! Histogram
//!
//! Aggregated gradient and hessian statistics per bin, used to find the
//! best split of a node. The histogram of the larger child is derived
//! by subtracting the smaller child from the parent.
use crate::data::Matrix;
use rayon::prelude::*;

/// Gradient, hessian and row count accumulated for one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bin {
    pub gradient_sum: f64,
    pub hessian_sum: f64,
    pub counts: usize,
}

impl Bin {
    #[inline]
    pub fn add(&mut self, other: &Bin) {
        self.gradient_sum += other.gradient_sum;
        self.hessian_sum += other.hessian_sum;
        self.counts += other.counts;
    }

    #[inline]
    pub fn sub(&self, other: &Bin) -> Bin {
        Bin {
            gradient_sum: self.gradient_sum - other.gradient_sum,
            hessian_sum: self.hessian_sum - other.hessian_sum,
            counts: self.counts.saturating_sub(other.counts),
        }
    }
}

/// Histograms for all features of a single node. Features that were not
/// sampled for the current tree hold an empty vector.
#[derive(Debug, Clone)]
pub struct NodeHistogram {
    pub data: Vec<Vec<Bin>>,
}

impl NodeHistogram {
    /// Build the histogram of the rows in `index`.
    ///
    /// * `data` - Binned data, column major.
    /// * `nbins` - Number of bins per column, including the missing bin.
    /// * `col_index` - Columns to accumulate.
    pub fn from_index(
        data: &Matrix<u16>,
        nbins: &[usize],
        index: &[usize],
        grad: &[f64],
        hess: &[f64],
        col_index: &[usize],
    ) -> Self {
        let mut hists: Vec<Vec<Bin>> = vec![Vec::new(); data.cols];
        let built: Vec<(usize, Vec<Bin>)> = col_index
            .par_iter()
            .map(|&col| {
                let mut bins = vec![Bin::default(); nbins[col]];
                let col_data = data.get_col(col);
                for &i in index {
                    let b = &mut bins[col_data[i] as usize];
                    b.gradient_sum += grad[i];
                    b.hessian_sum += hess[i];
                    b.counts += 1;
                }
                (col, bins)
            })
            .collect();
        for (col, bins) in built {
            hists[col] = bins;
        }
        NodeHistogram { data: hists }
    }

    /// Histogram of the sibling, given the parent and one child.
    pub fn from_parent_child(parent: &NodeHistogram, child: &NodeHistogram, col_index: &[usize]) -> Self {
        let mut hists: Vec<Vec<Bin>> = vec![Vec::new(); parent.data.len()];
        for &col in col_index {
            hists[col] = parent.data[col]
                .iter()
                .zip(child.data[col].iter())
                .map(|(p, c)| p.sub(c))
                .collect();
        }
        NodeHistogram { data: hists }
    }

    /// Total statistics of a feature, all features sum to the same node totals.
    pub fn totals(&self, col: usize) -> Bin {
        let mut total = Bin::default();
        self.data[col].iter().for_each(|b| total.add(b));
        total
    }
}
