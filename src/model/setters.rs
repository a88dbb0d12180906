use crate::causal::metalearners::MetalearnerType;
use crate::model::config::CausalConfig;
use crate::preprocessing::TextOptions;

impl CausalConfig {
    pub fn set_text_col(mut self, text_col: Option<&str>) -> Self {
        self.text_col = text_col.map(String::from);
        self
    }

    pub fn set_include_cols(mut self, include_cols: Vec<String>) -> Self {
        self.include_cols = include_cols;
        self
    }

    pub fn set_ignore_cols(mut self, ignore_cols: Vec<String>) -> Self {
        self.ignore_cols = ignore_cols;
        self
    }

    pub fn set_treatment_effect_col(mut self, treatment_effect_col: &str) -> Self {
        self.treatment_effect_col = treatment_effect_col.to_string();
        self
    }

    pub fn set_metalearner_type(mut self, metalearner_type: MetalearnerType) -> Self {
        self.metalearner_type = metalearner_type;
        self
    }

    /// Set the treatment value that marks the control group.
    pub fn set_control_value(mut self, control_value: f64) -> Self {
        self.control_value = control_value;
        self
    }

    pub fn set_text_options(mut self, text_options: TextOptions) -> Self {
        self.text_options = text_options;
        self
    }

    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
