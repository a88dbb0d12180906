use crate::errors::CausalError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    items.join(", ")
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    v.iter().map(|n| format!("{:.4}", n)).collect::<Vec<_>>().join(", ")
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), CausalError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), CausalError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(CausalError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check that a row aligned collection has the expected length.
pub fn validate_length(what: &str, expected: usize, found: usize) -> Result<(), CausalError> {
    if expected != found {
        Err(CausalError::LengthMismatch(what.to_string(), expected, found))
    } else {
        Ok(())
    }
}

/// Convert Log odds to probability
#[inline]
pub fn odds(v: f64) -> f64 {
    1. / (1. + (-v).exp())
}

/// Convert a probability to log odds, clipping away from 0 and 1.
#[inline]
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-15, 1.0 - 1e-15);
    (p / (1.0 - p)).ln()
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

pub fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Variance with `ddof` delta degrees of freedom.
pub fn variance(v: &[f64], ddof: usize) -> f64 {
    if v.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(v);
    v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (v.len() - ddof) as f64
}

pub fn std_dev(v: &[f64], ddof: usize) -> f64 {
    variance(v, ddof).sqrt()
}

/// Draw a standard normal value using the Box-Muller transform.
pub fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Shuffle the row indices and split them into `n_folds` test folds.
/// Every index appears in exactly one fold.
pub fn kfold_indices(n: usize, n_folds: usize, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut index: Vec<usize> = (0..n).collect();
    index.shuffle(rng);
    let n_folds = n_folds.clamp(1, n.max(1));
    let mut folds = vec![Vec::new(); n_folds];
    for (i, idx) in index.into_iter().enumerate() {
        folds[i % n_folds].push(idx);
    }
    for f in folds.iter_mut() {
        f.sort_unstable();
    }
    folds
}

/// Complement of a sorted fold within `0..n`.
pub fn complement(n: usize, fold: &[usize]) -> Vec<usize> {
    let mut in_fold = vec![false; n];
    fold.iter().for_each(|&i| in_fold[i] = true);
    (0..n).filter(|&i| !in_fold[i]).collect()
}

/// Shuffled train / test split of the row indices, returns `(train, test)`.
pub fn train_test_split_indices(n: usize, test_pct: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut index: Vec<usize> = (0..n).collect();
    index.shuffle(&mut rng);
    let n_test = ((n as f64) * test_pct).ceil() as usize;
    let n_test = n_test.min(n);
    let test = index[..n_test].to_vec();
    let train = index[n_test..].to_vec();
    (train, test)
}

/// Solve `a x = b` with gaussian elimination and partial pivoting.
/// `a` is row major, `n x n`. Returns None if the system is singular.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let s: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - s) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_round() {
        assert_eq!(0.3, precision_round(0.3333, 1));
        assert_eq!(0.2343, precision_round(0.2343123123123, 4));
    }

    #[test]
    fn test_variance() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(variance(&v, 0), 1.25);
        assert_eq!(precision_round(variance(&v, 1), 4), 1.6667);
        assert!(variance(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_kfold_indices_cover_all_rows() {
        let mut rng = StdRng::seed_from_u64(0);
        let folds = kfold_indices(10, 3, &mut rng);
        assert_eq!(folds.len(), 3);
        let mut all: Vec<usize> = folds.concat();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        let train = complement(10, &folds[0]);
        assert_eq!(train.len() + folds[0].len(), 10);
    }

    #[test]
    fn test_train_test_split() {
        let (train, test) = train_test_split_indices(10, 0.2, 314);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);
        let (train2, test2) = train_test_split_indices(10, 0.2, 314);
        assert_eq!(train, train2);
        assert_eq!(test, test2);
    }

    #[test]
    fn test_solve_linear_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let b = vec![3.0, 5.0];
        let x = solve_linear_system(a, b).unwrap();
        assert_eq!(precision_round(x[0], 6), 0.8);
        assert_eq!(precision_round(x[1], 6), 1.4);

        let singular = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear_system(singular, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..5000).map(|_| standard_normal(&mut rng)).collect();
        assert!(mean(&draws).abs() < 0.1);
        assert!((std_dev(&draws, 0) - 1.0).abs() < 0.1);
    }
}
