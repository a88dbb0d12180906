//! Matching
//!
//! Nearest neighbour matching of treated and control units on a score,
//! and covariate balance summaries before and after matching.
use crate::constants::MATCHING_SEED;
use crate::data::FeatureMatrix;
use crate::errors::CausalError;
use crate::utils::{mean, std_dev, validate_length};
use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Treated rows and their matched controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched treated rows, in matching order.
    pub treated: Vec<usize>,
    /// Matched control rows, `ratio` per treated row.
    pub control: Vec<usize>,
    /// Treated rows without a control inside the caliper.
    pub n_unmatched: usize,
    /// Control rows never picked as a match.
    pub n_unmatched_control: usize,
}

impl MatchResult {
    /// Treated rows followed by their controls.
    pub fn indices(&self) -> Vec<usize> {
        self.treated.iter().chain(self.control.iter()).copied().collect()
    }
}

/// 1:`ratio` nearest neighbour matching on a one dimensional score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestNeighborMatch {
    /// Maximum distance, in standard deviations of the score.
    pub caliper: Option<f64>,
    pub replace: bool,
    pub ratio: usize,
    pub seed: u64,
}

impl Default for NearestNeighborMatch {
    fn default() -> Self {
        NearestNeighborMatch {
            caliper: None,
            replace: false,
            ratio: 1,
            seed: MATCHING_SEED,
        }
    }
}

impl NearestNeighborMatch {
    pub fn new(caliper: Option<f64>, replace: bool, ratio: usize, seed: u64) -> Self {
        NearestNeighborMatch {
            caliper,
            replace,
            ratio,
            seed,
        }
    }

    /// Match every treated unit to its nearest controls.
    ///
    /// Treated units are visited in a seeded random order. Without replacement
    /// a control is used at most once, and running out of controls is a
    /// `MatchingExhausted` error.
    pub fn match_units(&self, scores: &[f64], treatment: &[f64]) -> Result<MatchResult, CausalError> {
        validate_length("treatment", scores.len(), treatment.len())?;
        if self.ratio == 0 {
            return Err(CausalError::InvalidParameter(
                "ratio".to_string(),
                "positive integer".to_string(),
                "0".to_string(),
            ));
        }
        let max_distance = match self.caliper {
            Some(c) => {
                if c.is_nan() || c <= 0.0 {
                    return Err(CausalError::InvalidParameter(
                        "caliper".to_string(),
                        "positive real value".to_string(),
                        c.to_string(),
                    ));
                }
                c * std_dev(scores, 0)
            }
            None => f64::INFINITY,
        };

        let mut treated: Vec<usize> = (0..scores.len()).filter(|&i| treatment[i] == 1.0).collect();
        let mut controls: Vec<(f64, usize)> = (0..scores.len())
            .filter(|&i| treatment[i] == 0.0)
            .map(|i| (scores[i], i))
            .collect();
        controls.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let mut rng = StdRng::seed_from_u64(self.seed);
        treated.shuffle(&mut rng);

        let mut result = MatchResult {
            treated: Vec::new(),
            control: Vec::new(),
            n_unmatched: 0,
            n_unmatched_control: 0,
        };
        let n_control = controls.len();
        for t in treated {
            if controls.len() < self.ratio {
                return Err(CausalError::MatchingExhausted(format!(
                    "{} control units left for treated row {}, {} required",
                    controls.len(),
                    t,
                    self.ratio
                )));
            }
            let picked = nearest(&controls, scores[t], self.ratio);
            if picked.iter().any(|&k| (controls[k].0 - scores[t]).abs() > max_distance) {
                result.n_unmatched += 1;
                continue;
            }
            result.treated.push(t);
            result.control.extend(picked.iter().map(|&k| controls[k].1));
            if !self.replace {
                let mut positions = picked;
                positions.sort_unstable_by(|a, b| b.cmp(a));
                for k in positions {
                    controls.remove(k);
                }
            }
        }
        if result.n_unmatched > 0 {
            warn!(
                "{} treated units had no control within the caliper and were left unmatched.",
                result.n_unmatched
            );
        }
        let mut used = result.control.clone();
        used.sort_unstable();
        used.dedup();
        result.n_unmatched_control = n_control - used.len();
        if result.n_unmatched_control > 0 {
            warn!(
                "{} control units were not matched to any treated unit and were left out.",
                result.n_unmatched_control
            );
        }
        Ok(result)
    }
}

/// Positions of the `k` closest entries of a sorted score list.
fn nearest(sorted: &[(f64, usize)], target: f64, k: usize) -> Vec<usize> {
    let split = sorted.partition_point(|(s, _)| *s < target);
    let (mut lo, mut hi) = (split, split);
    let mut out = Vec::with_capacity(k);
    while out.len() < k {
        let left = lo.checked_sub(1).map(|i| (i, target - sorted[i].0));
        let right = (hi < sorted.len()).then(|| (hi, sorted[hi].0 - target));
        match (left, right) {
            (Some((i, dl)), Some((_, dr))) if dl <= dr => {
                out.push(i);
                lo = i;
            }
            (_, Some((j, _))) => {
                out.push(j);
                hi = j + 1;
            }
            (Some((i, _)), None) => {
                out.push(i);
                lo = i;
            }
            (None, None) => break,
        }
    }
    out
}

/// Per feature summary of one arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub feature: String,
    pub control_mean: f64,
    pub control_sd: f64,
    pub treatment_mean: f64,
    pub treatment_sd: f64,
    /// Standardized mean difference.
    pub smd: f64,
}

/// Covariate balance between the arms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceTable {
    pub n_control: usize,
    pub n_treatment: usize,
    pub rows: Vec<BalanceRow>,
}

impl BalanceTable {
    pub fn new(x: &FeatureMatrix, treatment: &[f64], features: &[String]) -> Result<Self, CausalError> {
        validate_length("treatment", x.rows, treatment.len())?;
        let mut rows = Vec::with_capacity(features.len());
        for feature in features {
            let col = x
                .names
                .iter()
                .position(|n| n == feature)
                .ok_or_else(|| CausalError::MissingColumn(feature.clone()))?;
            let values = x.get_col(col);
            let (mut v0, mut v1) = (Vec::new(), Vec::new());
            for (v, t) in values.iter().zip(treatment) {
                if *t == 1.0 {
                    v1.push(*v);
                } else {
                    v0.push(*v);
                }
            }
            let (m0, s0, m1, s1) = (mean(&v0), std_dev(&v0, 1), mean(&v1), std_dev(&v1, 1));
            let pooled = ((s0 * s0 + s1 * s1) / 2.0).sqrt();
            rows.push(BalanceRow {
                feature: feature.clone(),
                control_mean: m0,
                control_sd: s0,
                treatment_mean: m1,
                treatment_sd: s1,
                smd: if pooled > 0.0 { (m1 - m0) / pooled } else { 0.0 },
            });
        }
        Ok(BalanceTable {
            n_control: treatment.iter().filter(|t| **t != 1.0).count(),
            n_treatment: treatment.iter().filter(|t| **t == 1.0).count(),
            rows,
        })
    }
}

impl fmt::Display for BalanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|r| r.feature.len()).max().unwrap_or(0).max(8);
        writeln!(f, "{:<width$} {:>20} {:>20} {:>8}", "", "Control", "Treatment", "SMD")?;
        writeln!(f, "{:<width$} {:>20} {:>20} {:>8}", "n", self.n_control, self.n_treatment, "")?;
        for r in &self.rows {
            let c = format!("{:.2} ({:.2})", r.control_mean, r.control_sd);
            let t = format!("{:.2} ({:.2})", r.treatment_mean, r.treatment_sd);
            writeln!(f, "{:<width$} {:>20} {:>20} {:>8.4}", r.feature, c, t, r.smd)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest() {
        let sorted = vec![(0.1, 0), (0.4, 1), (0.5, 2), (0.9, 3)];
        assert_eq!(nearest(&sorted, 0.42, 1), vec![1]);
        assert_eq!(nearest(&sorted, 0.46, 2), vec![2, 1]);
        assert_eq!(nearest(&sorted, 2.0, 1), vec![3]);
        assert_eq!(nearest(&sorted, -1.0, 1), vec![0]);
    }

    #[test]
    fn test_balanced_arms_all_matched() {
        let scores = vec![0.2, 0.3, 0.4, 0.5, 0.21, 0.31, 0.41, 0.51];
        let treatment = vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let res = NearestNeighborMatch::default().match_units(&scores, &treatment).unwrap();
        assert_eq!(res.treated.len(), 4);
        assert_eq!(res.n_unmatched, 0);
        assert_eq!(res.n_unmatched_control, 0);
        let mut all = res.indices();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
        for (t, c) in res.treated.iter().zip(&res.control) {
            assert_eq!(*c, *t + 4);
        }
    }

    #[test]
    fn test_larger_treated_arm_exhausts() {
        let scores = vec![0.2, 0.3, 0.4, 0.5];
        let treatment = vec![1.0, 1.0, 1.0, 0.0];
        let res = NearestNeighborMatch::default().match_units(&scores, &treatment);
        assert!(matches!(res, Err(CausalError::MatchingExhausted(_))));
    }

    #[test]
    fn test_caliper_leaves_units_unmatched() {
        let scores = vec![0.1, 0.9, 0.11, 0.5];
        let treatment = vec![1.0, 1.0, 0.0, 0.0];
        let m = NearestNeighborMatch::new(Some(0.1), false, 1, 1);
        let res = m.match_units(&scores, &treatment).unwrap();
        assert_eq!(res.treated, vec![0]);
        assert_eq!(res.control, vec![2]);
        assert_eq!(res.n_unmatched, 1);
        assert_eq!(res.n_unmatched_control, 1);
        assert!(NearestNeighborMatch::new(Some(-1.0), false, 1, 1)
            .match_units(&scores, &treatment)
            .is_err());
    }

    #[test]
    fn test_surplus_controls_are_counted() {
        let scores = vec![0.2, 0.6, 0.21, 0.4, 0.59, 0.9, 0.1];
        let treatment = vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let res = NearestNeighborMatch::default().match_units(&scores, &treatment).unwrap();
        assert_eq!(res.indices().len(), 4);
        assert_eq!(res.n_unmatched, 0);
        assert_eq!(res.n_unmatched_control, 3);
        let mut control = res.control.clone();
        control.sort_unstable();
        assert_eq!(control, vec![2, 4]);
    }

    #[test]
    fn test_balance_table() {
        let x = FeatureMatrix::from_columns(vec![("a".to_string(), vec![1.0, 3.0, 0.0, 2.0])], 4);
        let treatment = vec![1.0, 1.0, 0.0, 0.0];
        let table = BalanceTable::new(&x, &treatment, &["a".to_string()]).unwrap();
        assert_eq!((table.n_control, table.n_treatment), (2, 2));
        let row = &table.rows[0];
        assert_eq!(row.treatment_mean, 2.0);
        assert_eq!(row.control_mean, 1.0);
        approx::assert_relative_eq!(row.smd, 1.0 / 2f64.sqrt());
        assert!(table.to_string().contains("SMD"));
        assert!(BalanceTable::new(&x, &treatment, &["b".to_string()]).is_err());
    }
}
