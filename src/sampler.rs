//! Sampler
//!
//! Row and column sampling applied before each new tree is grown
//! (stochastic gradient boosting).
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::Rng;

// A sampler can be used to subset the data prior to fitting a new tree.
pub trait Sampler {
    /// Sample the data, returning a tuple, where the first item is the samples
    /// chosen for training, and the second are the samples excluded.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>);
}

pub struct RandomSampler {
    subsample: f64,
}

impl RandomSampler {
    pub fn new(subsample: f64) -> Self {
        RandomSampler { subsample }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
        if self.subsample >= 1.0 {
            return (index.to_vec(), Vec::new());
        }
        let mut chosen = Vec::new();
        let mut excluded = Vec::new();
        for i in index {
            if rng.gen::<f64>() < self.subsample {
                chosen.push(*i);
            } else {
                excluded.push(*i)
            }
        }
        // A tree needs at least one row.
        if chosen.is_empty() && !excluded.is_empty() {
            let k = rng.gen_range(0..excluded.len());
            chosen.push(excluded.swap_remove(k));
        }
        (chosen, excluded)
    }
}

/// Sorted subset of `ceil(colsample * n_cols)` column indices, at least one.
pub fn sample_columns(rng: &mut StdRng, n_cols: usize, colsample: f64) -> Vec<usize> {
    if colsample >= 1.0 || n_cols <= 1 {
        return (0..n_cols).collect();
    }
    let amount = ((n_cols as f64) * colsample).ceil() as usize;
    let mut cols = sample(rng, n_cols, amount.clamp(1, n_cols)).into_vec();
    cols.sort_unstable();
    cols
}
