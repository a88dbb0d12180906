use crate::booster::core::GradientBooster;
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::objective::Objective;
use crate::utils::odds;
use rayon::prelude::*;

impl GradientBooster {
    fn check_predict_data(&self, data: &Matrix<f64>) -> Result<(), CausalError> {
        if !self.is_fitted() {
            return Err(CausalError::NotFitted("GradientBooster".to_string()));
        }
        if data.cols != self.n_features {
            return Err(CausalError::ShapeMismatch(self.n_features, data.cols));
        }
        Ok(())
    }

    /// Generate raw predictions (log odds for `LogLoss`) on data using the gradient booster.
    ///
    /// * `data` - Column major matrix with the features the booster was fitted on.
    pub fn predict_raw(&self, data: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        self.check_predict_data(data)?;
        Ok(data
            .index
            .par_iter()
            .map(|&row| self.base_score + self.trees.iter().map(|t| t.predict_row(data, row)).sum::<f64>())
            .collect())
    }

    /// Predictions on the response scale, probabilities of the positive class for `LogLoss`.
    pub fn predict(&self, data: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        let raw = self.predict_raw(data)?;
        Ok(match self.cfg.objective {
            Objective::LogLoss => raw.into_iter().map(odds).collect(),
            Objective::SquaredLoss => raw,
        })
    }

    /// Exact tree-SHAP contributions on the raw scale.
    ///
    /// Returns a row major vector with `cols + 1` values per row, the last value of
    /// each row is the expected value of the model. Every row sums to the raw prediction.
    pub fn predict_contributions(&self, data: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        self.check_predict_data(data)?;
        let width = data.cols + 1;
        let mut contribs = vec![0.0; width * data.rows];
        contribs
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, c)| {
                let values = data.get_row(row);
                for tree in self.trees.iter() {
                    tree.predict_contributions_row_shapley(&values, c);
                }
                c[width - 1] += self.base_score;
            });
        Ok(contribs)
    }
}
