use crate::data::Matrix;
use crate::errors::CausalError;
use rayon::prelude::*;

// Every feature is bucketed into discrete bins before trees are grown.
// Bin 0 holds missing values, bins 1..=N hold the non missing values,
// where the cuts are the sorted upper bounds of each bin and the last
// cut is always f64::MAX.
// With cuts [0.5, 1.5, MAX] a value of 1.0 lands in bin 2, and a split
// keeping bins 1..=b on the left translates to [feature < cuts[b - 1]].
#[derive(Debug)]
pub struct BinnedData {
    pub binned_data: Vec<u16>,
    pub cuts: Vec<Vec<f64>>,
    /// Number of bins per column, including the missing bin.
    pub nbins: Vec<usize>,
}

/// Cut points for a single column of non missing values.
///
/// If there are no more unique values than bins, cuts are the midpoints
/// between consecutive unique values, otherwise evenly spaced quantiles.
pub fn column_cuts(values: &[f64], max_bin: u16) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_unstable_by(|a, b| a.total_cmp(b));
    let mut uniq = v.clone();
    uniq.dedup();

    let mut cuts: Vec<f64> = if uniq.len() <= max_bin as usize {
        uniq.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect()
    } else {
        let n = v.len();
        (1..max_bin as usize)
            .map(|i| {
                let pos = ((i as f64 / max_bin as f64) * (n - 1) as f64).round() as usize;
                v[pos]
            })
            .collect()
    };
    // The smallest value must always land in bin 1.
    if let Some(first) = uniq.first() {
        cuts.retain(|c| c > first);
    }
    cuts.dedup();
    cuts.push(f64::MAX);
    cuts
}

/// Map a value onto its bin given the column cuts.
#[inline]
pub fn map_bin(cuts: &[f64], v: f64) -> u16 {
    if v.is_nan() {
        return 0;
    }
    // First cut strictly above the value.
    let idx = cuts.partition_point(|c| *c <= v);
    (idx.min(cuts.len() - 1) + 1) as u16
}

/// Bin a numeric matrix.
///
/// * `data` - A numeric matrix, of data to be binned.
/// * `max_bin` - The maximum number of non missing bins per column.
pub fn bin_matrix(data: &Matrix<f64>, max_bin: u16) -> Result<BinnedData, CausalError> {
    if max_bin < 2 || max_bin == u16::MAX {
        return Err(CausalError::InvalidParameter(
            "max_bin".to_string(),
            format!("integer value within range 2 and {}", u16::MAX - 1),
            max_bin.to_string(),
        ));
    }
    let cuts: Vec<Vec<f64>> = (0..data.cols)
        .into_par_iter()
        .map(|c| column_cuts(data.get_col(c), max_bin))
        .collect();
    let nbins = cuts.iter().map(|c| c.len() + 1).collect();
    let binned_data = (0..data.cols)
        .into_par_iter()
        .flat_map_iter(|c| {
            let col_cuts = &cuts[c];
            data.get_col(c).iter().map(move |v| map_bin(col_cuts, *v))
        })
        .collect();
    Ok(BinnedData {
        binned_data,
        cuts,
        nbins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_cuts_unique_values() {
        let cuts = column_cuts(&[1.0, 2.0, 2.0, 3.0, f64::NAN], 255);
        assert_eq!(cuts, vec![1.5, 2.5, f64::MAX]);
        assert_eq!(map_bin(&cuts, 1.0), 1);
        assert_eq!(map_bin(&cuts, 2.0), 2);
        assert_eq!(map_bin(&cuts, 3.0), 3);
        assert_eq!(map_bin(&cuts, f64::NAN), 0);
        // Values above the largest cut still land in the last bin.
        assert_eq!(map_bin(&cuts, f64::MAX), 3);
    }

    #[test]
    fn test_column_cuts_quantiles() {
        let v: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let cuts = column_cuts(&v, 10);
        assert_eq!(cuts.len(), 10);
        assert_eq!(*cuts.last().unwrap(), f64::MAX);
        let bins: Vec<u16> = v.iter().map(|x| map_bin(&cuts, *x)).collect();
        assert_eq!(*bins.iter().min().unwrap(), 1);
        assert_eq!(*bins.iter().max().unwrap(), 10);
    }

    #[test]
    fn test_bin_matrix() {
        let data = vec![1.0, 2.0, f64::NAN, 5.0, 5.0, 5.0];
        let m = Matrix::new(&data, 3, 2);
        let b = bin_matrix(&m, 255).unwrap();
        assert_eq!(b.binned_data, vec![1, 2, 0, 1, 1, 1]);
        assert_eq!(b.nbins, vec![3, 2]);
        assert!(bin_matrix(&m, 1).is_err());
    }
}
