//! Preprocessing
//!
//! Turns a [`DataFrame`] into the feature matrix, treatment vector and outcome
//! vector consumed by metalearners. Training mode fits the encoders and the
//! text vectorizer, inference mode only applies them.
//!
//! Feature columns are laid out as numeric covariates, then one-hot encoded
//! string covariates (`<col>_<category>`), then TF-IDF text features (`v_<term>`).
use crate::constants::TEXT_FEATURE_PREFIX;
use crate::data::FeatureMatrix;
use crate::errors::CausalError;
use crate::frame::{Column, DataFrame};
use crate::utils::mean;
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use serde::{Deserialize, Serialize};

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost", "alone", "along",
    "already", "also", "although", "always", "am", "among", "amongst", "an", "and", "another", "any", "anyhow",
    "anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside", "besides",
    "between", "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "done",
    "down", "due", "during", "each", "either", "else", "elsewhere", "enough", "etc", "even", "ever", "every",
    "everyone", "everything", "everywhere", "except", "few", "for", "former", "formerly", "from", "further", "had",
    "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers",
    "herself", "him", "himself", "his", "how", "however", "i", "ie", "if", "in", "indeed", "into", "is", "it",
    "its", "itself", "just", "last", "latter", "latterly", "least", "less", "many", "may", "me", "meanwhile",
    "might", "mine", "more", "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither",
    "never", "nevertheless", "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
    "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "re", "same", "seem", "seemed",
    "seeming", "seems", "several", "she", "should", "since", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "than", "that", "the", "their", "them", "themselves",
    "then", "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "this", "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too", "toward",
    "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what",
    "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Options of the TF-IDF text vectorizer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TextOptions {
    /// Ignore terms in fewer documents than this, a proportion when `<= 1.0`, otherwise a count.
    pub min_df: f64,
    /// Ignore terms in more documents than this, a proportion when `<= 1.0`, otherwise a count.
    pub max_df: f64,
    /// Smallest and largest n-gram size.
    pub ngram_range: (usize, usize),
    /// Remove English stop words before building n-grams.
    pub stop_words: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions {
            min_df: 0.05,
            max_df: 0.5,
            ngram_range: (1, 1),
            stop_words: true,
        }
    }
}

impl TextOptions {
    pub fn validate(&self) -> Result<(), CausalError> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || hi < lo {
            return Err(CausalError::InvalidParameter(
                "ngram_range".to_string(),
                "1 <= min_n <= max_n".to_string(),
                format!("({}, {})", lo, hi),
            ));
        }
        for (name, v) in [("min_df", self.min_df), ("max_df", self.max_df)] {
            if v.is_nan() || v < 0.0 {
                return Err(CausalError::InvalidParameter(
                    name.to_string(),
                    "non negative proportion or count".to_string(),
                    v.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Bag of n-grams weighted by smoothed inverse document frequency.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TextVectorizer {
    pub options: TextOptions,
    /// Sorted vocabulary.
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    index: HashMap<String, usize>,
}

impl TextVectorizer {
    pub fn new(options: TextOptions) -> Self {
        TextVectorizer {
            options,
            ..TextVectorizer::default()
        }
    }

    /// Lowercased alphanumeric tokens of two or more characters, joined into n-grams.
    pub fn analyze(&self, doc: &str) -> Vec<String> {
        let lowered = doc.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .filter(|t| !(self.options.stop_words && ENGLISH_STOP_WORDS.contains(t)))
            .collect();
        let (lo, hi) = self.options.ngram_range;
        let mut grams = Vec::new();
        for n in lo..=hi {
            if n > tokens.len() {
                break;
            }
            grams.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        grams
    }

    fn doc_count_limit(v: f64, n_docs: usize) -> f64 {
        if v <= 1.0 {
            v * n_docs as f64
        } else {
            v
        }
    }

    /// Learn the vocabulary and idf weights, then transform the documents.
    pub fn fit_transform(&mut self, docs: &[String]) -> Result<Vec<(String, Vec<f64>)>, CausalError> {
        self.options.validate()?;
        let n_docs = docs.len();
        let mut df: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let terms: HashSet<String> = self.analyze(doc).into_iter().collect();
            for t in terms {
                *df.entry(t).or_insert(0) += 1;
            }
        }
        let min_count = Self::doc_count_limit(self.options.min_df, n_docs);
        let max_count = Self::doc_count_limit(self.options.max_df, n_docs);
        if max_count < min_count {
            return Err(CausalError::InvalidParameter(
                "max_df".to_string(),
                "a document count not below min_df".to_string(),
                self.options.max_df.to_string(),
            ));
        }
        let mut vocabulary: Vec<String> = df
            .iter()
            .filter(|(_, c)| (**c as f64) >= min_count && (**c as f64) <= max_count)
            .map(|(t, _)| t.clone())
            .collect();
        vocabulary.sort();
        if vocabulary.is_empty() {
            warn!("No terms remain after pruning with min_df and max_df, the text column adds no features.");
        }
        self.idf = vocabulary
            .iter()
            .map(|t| ((1.0 + n_docs as f64) / (1.0 + df[t] as f64)).ln() + 1.0)
            .collect();
        self.index = vocabulary.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        self.vocabulary = vocabulary;
        Ok(self.transform(docs))
    }

    /// TF-IDF columns for the documents, rows are L2 normalized.
    pub fn transform(&self, docs: &[String]) -> Vec<(String, Vec<f64>)> {
        let mut columns: Vec<Vec<f64>> = vec![vec![0.0; docs.len()]; self.vocabulary.len()];
        for (row, doc) in docs.iter().enumerate() {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for g in self.analyze(doc) {
                if let Some(&j) = self.index.get(&g) {
                    *counts.entry(j).or_insert(0.0) += 1.0;
                }
            }
            let mut counts: Vec<(usize, f64)> = counts.into_iter().collect();
            counts.sort_unstable_by_key(|(j, _)| *j);
            let norm = counts
                .iter()
                .map(|(j, c)| (c * self.idf[*j]).powi(2))
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                for (j, c) in counts {
                    columns[j][row] = c * self.idf[j] / norm;
                }
            }
        }
        self.vocabulary
            .iter()
            .zip(columns)
            .map(|(t, c)| (format!("{}{}", TEXT_FEATURE_PREFIX, t), c))
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum FeatureEncoder {
    /// Missing values are imputed with the training mean.
    Numeric { mean: f64 },
    /// Sorted training categories.
    OneHot { categories: Vec<String> },
}

/// Output of [`DataframePreprocessor::preprocess`].
#[derive(Clone, Debug)]
pub struct Preprocessed {
    pub x: FeatureMatrix,
    /// Label encoded outcome, `None` in inference mode when the outcome column is absent.
    pub y: Option<Vec<f64>>,
    pub treatment: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataframePreprocessor {
    treatment_col: String,
    outcome_col: String,
    text_col: Option<String>,
    include_cols: Vec<String>,
    ignore_cols: Vec<String>,
    verbose: bool,
    vectorizer: TextVectorizer,
    encoders: Vec<(String, FeatureEncoder)>,
    feature_names_one_hot: Vec<String>,
    /// Outcome labels mapped to 0 and 1, for classification.
    outcome_labels: Option<[String; 2]>,
    is_classification: bool,
    fitted: bool,
}

impl DataframePreprocessor {
    pub fn new(
        treatment_col: &str,
        outcome_col: &str,
        text_col: Option<&str>,
        include_cols: &[String],
        ignore_cols: &[String],
        text_options: TextOptions,
        verbose: bool,
    ) -> Self {
        DataframePreprocessor {
            treatment_col: treatment_col.to_string(),
            outcome_col: outcome_col.to_string(),
            text_col: text_col.map(String::from),
            include_cols: include_cols.to_vec(),
            ignore_cols: ignore_cols.to_vec(),
            verbose,
            vectorizer: TextVectorizer::new(text_options),
            encoders: Vec::new(),
            feature_names_one_hot: Vec::new(),
            outcome_labels: None,
            is_classification: false,
            fitted: false,
        }
    }

    pub fn treatment_col(&self) -> &str {
        &self.treatment_col
    }

    pub fn outcome_col(&self) -> &str {
        &self.outcome_col
    }

    pub fn text_col(&self) -> Option<&str> {
        self.text_col.as_deref()
    }

    /// Raw feature columns, in frame order.
    pub fn feature_names(&self) -> Vec<String> {
        self.encoders.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Encoded covariates (numeric and one-hot), without text features.
    pub fn feature_names_one_hot(&self) -> &[String] {
        &self.feature_names_one_hot
    }

    pub fn is_classification(&self) -> bool {
        self.is_classification
    }

    /// Text vocabulary learned at training time.
    pub fn vocabulary(&self) -> &[String] {
        &self.vectorizer.vocabulary
    }

    fn select_feature_columns(&self, df: &DataFrame) -> Vec<String> {
        df.names()
            .into_iter()
            .filter(|n| *n != self.treatment_col && *n != self.outcome_col)
            .filter(|n| self.text_col.as_deref() != Some(*n))
            .filter(|n| !self.ignore_cols.iter().any(|c| c == n))
            .filter(|n| self.include_cols.is_empty() || self.include_cols.iter().any(|c| c == n))
            .map(String::from)
            .collect()
    }

    fn treatment_vector(&self, df: &DataFrame) -> Result<Vec<f64>, CausalError> {
        let t = df.float_column(&self.treatment_col)?;
        if let Some(bad) = t.iter().find(|v| **v != 0.0 && **v != 1.0) {
            return Err(CausalError::InvalidTreatment(format!(
                "column {} must only contain 0 and 1, found {}",
                self.treatment_col, bad
            )));
        }
        Ok(t.to_vec())
    }

    fn fit_outcome(&mut self, col: &Column) -> Result<Vec<f64>, CausalError> {
        match col {
            Column::Float(v) => {
                if v.iter().any(|x| !x.is_finite()) {
                    return Err(CausalError::InvalidOutcome(format!(
                        "column {} contains missing or infinite values",
                        self.outcome_col
                    )));
                }
                let mut uniq = v.clone();
                uniq.sort_by(|a, b| a.total_cmp(b));
                uniq.dedup();
                if uniq.len() == 2 {
                    self.is_classification = true;
                    self.outcome_labels = Some([uniq[0].to_string(), uniq[1].to_string()]);
                    Ok(v.iter().map(|x| if *x == uniq[0] { 0.0 } else { 1.0 }).collect())
                } else {
                    self.is_classification = false;
                    self.outcome_labels = None;
                    Ok(v.clone())
                }
            }
            Column::Str(v) => {
                let mut uniq = v.clone();
                uniq.sort();
                uniq.dedup();
                if uniq.len() != 2 {
                    return Err(CausalError::InvalidOutcome(format!(
                        "string outcome {} must have exactly two classes, found {}",
                        self.outcome_col,
                        uniq.len()
                    )));
                }
                self.is_classification = true;
                let encoded = v.iter().map(|x| if *x == uniq[0] { 0.0 } else { 1.0 }).collect();
                self.outcome_labels = Some([uniq[0].clone(), uniq[1].clone()]);
                Ok(encoded)
            }
        }
    }

    fn apply_outcome(&self, col: &Column) -> Result<Vec<f64>, CausalError> {
        match &self.outcome_labels {
            None => match col {
                Column::Float(v) => Ok(v.clone()),
                Column::Str(_) => Err(CausalError::InvalidColumnType(
                    self.outcome_col.clone(),
                    "str".to_string(),
                    "float".to_string(),
                )),
            },
            Some(labels) => (0..col.len())
                .map(|i| {
                    let s = col.cell_string(i);
                    if s == labels[0] {
                        Ok(0.0)
                    } else if s == labels[1] {
                        Ok(1.0)
                    } else {
                        Err(CausalError::InvalidOutcome(format!("unknown outcome label {}", s)))
                    }
                })
                .collect(),
        }
    }

    fn fit_encoders(&mut self, df: &DataFrame) -> Result<(), CausalError> {
        let mut encoders = Vec::new();
        for name in self.select_feature_columns(df) {
            let encoder = match df.column(&name)? {
                Column::Float(v) => {
                    let present: Vec<f64> = v.iter().copied().filter(|x| !x.is_nan()).collect();
                    let m = if present.is_empty() { 0.0 } else { mean(&present) };
                    FeatureEncoder::Numeric { mean: m }
                }
                Column::Str(v) => {
                    let mut categories: Vec<String> = v.iter().filter(|s| !s.is_empty()).cloned().collect();
                    categories.sort();
                    categories.dedup();
                    FeatureEncoder::OneHot { categories }
                }
            };
            encoders.push((name, encoder));
        }
        let mut numeric = Vec::new();
        let mut one_hot = Vec::new();
        for (name, enc) in encoders.iter() {
            match enc {
                FeatureEncoder::Numeric { .. } => numeric.push(name.clone()),
                FeatureEncoder::OneHot { categories } => {
                    one_hot.extend(categories.iter().map(|c| format!("{}_{}", name, c)))
                }
            }
        }
        numeric.extend(one_hot);
        self.feature_names_one_hot = numeric;
        self.encoders = encoders;
        Ok(())
    }

    fn encode_features(&self, df: &DataFrame) -> Result<Vec<(String, Vec<f64>)>, CausalError> {
        let mut numeric = Vec::new();
        let mut one_hot = Vec::new();
        for (name, enc) in self.encoders.iter() {
            let col = df.column(name)?;
            match (enc, col) {
                (FeatureEncoder::Numeric { mean }, Column::Float(v)) => {
                    numeric.push((name.clone(), v.iter().map(|x| if x.is_nan() { *mean } else { *x }).collect()));
                }
                (FeatureEncoder::OneHot { categories }, Column::Str(v)) => {
                    for c in categories {
                        let values = v.iter().map(|s| if s == c { 1.0 } else { 0.0 }).collect();
                        one_hot.push((format!("{}_{}", name, c), values));
                    }
                }
                (FeatureEncoder::Numeric { .. }, other) | (FeatureEncoder::OneHot { .. }, other) => {
                    let expected = match enc {
                        FeatureEncoder::Numeric { .. } => "float",
                        FeatureEncoder::OneHot { .. } => "str",
                    };
                    return Err(CausalError::InvalidColumnType(
                        name.clone(),
                        other.type_name().to_string(),
                        expected.to_string(),
                    ));
                }
            }
        }
        numeric.extend(one_hot);
        Ok(numeric)
    }

    fn text_documents(&self, df: &DataFrame) -> Result<Option<Vec<String>>, CausalError> {
        match &self.text_col {
            None => Ok(None),
            Some(name) => {
                let col = df.column(name)?;
                match col.as_str() {
                    Some(v) => Ok(Some(v.to_vec())),
                    None => Err(CausalError::InvalidColumnType(
                        name.clone(),
                        col.type_name().to_string(),
                        "str".to_string(),
                    )),
                }
            }
        }
    }

    /// Build the feature matrix, outcome and treatment vectors.
    ///
    /// * `training` - Fit encoders and vectorizer first. The outcome column is
    ///   required when training and optional otherwise.
    pub fn preprocess(&mut self, df: &DataFrame, training: bool) -> Result<Preprocessed, CausalError> {
        if training {
            self.fit_transform(df)
        } else {
            self.transform(df)
        }
    }

    fn fit_transform(&mut self, df: &DataFrame) -> Result<Preprocessed, CausalError> {
        let treatment = self.treatment_vector(df)?;
        let outcome = df.column(&self.outcome_col)?.clone();
        let y = self.fit_outcome(&outcome)?;
        self.fit_encoders(df)?;
        let mut columns = self.encode_features(df)?;
        if let Some(docs) = self.text_documents(df)? {
            columns.extend(self.vectorizer.fit_transform(&docs)?);
        }
        self.fitted = true;
        if self.verbose {
            info!(
                "outcome column: {}, treatment column: {}, task: {}",
                self.outcome_col,
                self.treatment_col,
                if self.is_classification { "classification" } else { "regression" }
            );
        }
        Ok(self.assemble(columns, df.height(), Some(y), treatment))
    }

    /// Apply the fitted encoders and vectorizer only.
    pub fn transform(&self, df: &DataFrame) -> Result<Preprocessed, CausalError> {
        self.transform_rows(df, true)
    }

    /// Like [`transform`](Self::transform), but the outcome column is never
    /// read, so rows with an unknown outcome can be scored.
    pub fn transform_features(&self, df: &DataFrame) -> Result<Preprocessed, CausalError> {
        self.transform_rows(df, false)
    }

    fn transform_rows(&self, df: &DataFrame, with_outcome: bool) -> Result<Preprocessed, CausalError> {
        if !self.fitted {
            return Err(CausalError::NotFitted("DataframePreprocessor".to_string()));
        }
        let treatment = self.treatment_vector(df)?;
        let y = if with_outcome && df.contains(&self.outcome_col) {
            Some(self.apply_outcome(df.column(&self.outcome_col)?)?)
        } else {
            None
        };
        let mut columns = self.encode_features(df)?;
        if let Some(docs) = self.text_documents(df)? {
            columns.extend(self.vectorizer.transform(&docs));
        }
        Ok(self.assemble(columns, df.height(), y, treatment))
    }

    fn assemble(
        &self,
        columns: Vec<(String, Vec<f64>)>,
        rows: usize,
        y: Option<Vec<f64>>,
        treatment: Vec<f64>,
    ) -> Preprocessed {
        let x = FeatureMatrix::from_columns(columns, rows);
        if self.verbose {
            info!(
                "{} rows, {} features ({} covariates, {} text features)",
                x.rows,
                x.cols,
                self.feature_names_one_hot.len(),
                self.vectorizer.vocabulary.len()
            );
        }
        Preprocessed { x, y, treatment }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn frame() -> DataFrame {
        DataFrame::new()
            .with_column("t", vec![0.0, 1.0, 0.0, 1.0])
            .unwrap()
            .with_column("y", vec!["no", "yes", "no", "yes"])
            .unwrap()
            .with_column("age", vec![20.0, f64::NAN, 40.0, 30.0])
            .unwrap()
            .with_column("color", vec!["red", "blue", "", "red"])
            .unwrap()
            .with_column("id", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_column(
                "text",
                vec!["great product love it", "terrible service", "love the service", "great great price"],
            )
            .unwrap()
    }

    fn preprocessor(options: TextOptions) -> DataframePreprocessor {
        DataframePreprocessor::new("t", "y", Some("text"), &[], &["id".to_string()], options, false)
    }

    #[test]
    fn test_analyze() {
        let v = TextVectorizer::new(TextOptions {
            ngram_range: (1, 2),
            ..TextOptions::default()
        });
        assert_eq!(
            v.analyze("The Quick, brown fox!"),
            vec!["quick", "brown", "fox", "quick brown", "brown fox"]
        );
        let no_stop = TextVectorizer::new(TextOptions {
            stop_words: false,
            ..TextOptions::default()
        });
        assert_eq!(no_stop.analyze("the a fox"), vec!["the", "fox"]);
    }

    #[test]
    fn test_tfidf_document_frequency_bounds() {
        let mut v = TextVectorizer::new(TextOptions {
            min_df: 2.0,
            max_df: 1.0,
            ngram_range: (1, 1),
            stop_words: true,
        });
        let cols = v
            .fit_transform(&docs(&["apple banana", "apple cherry", "banana apple", "durian"]))
            .unwrap();
        assert_eq!(v.vocabulary, vec!["apple", "banana"]);
        assert_eq!(cols[0].0, "v_apple");
        // Rows are L2 normalized, empty rows stay zero.
        let row0 = cols[0].1[0].powi(2) + cols[1].1[0].powi(2);
        assert!((row0 - 1.0).abs() < 1e-12);
        assert_eq!(cols[0].1[3], 0.0);
        // apple is in 3 documents, banana in 2, so banana has the larger weight.
        assert!(cols[1].1[0] > cols[0].1[0]);
    }

    #[test]
    fn test_tfidf_rejects_inverted_bounds() {
        let mut v = TextVectorizer::new(TextOptions {
            min_df: 3.0,
            max_df: 2.0,
            ..TextOptions::default()
        });
        assert!(v.fit_transform(&docs(&["a b", "c d"])).is_err());
    }

    #[test]
    fn test_preprocess_training() {
        let mut pp = preprocessor(TextOptions {
            min_df: 0.0,
            max_df: 1.0,
            ngram_range: (1, 1),
            stop_words: true,
        });
        let out = pp.preprocess(&frame(), true).unwrap();
        assert!(pp.is_classification());
        assert_eq!(out.y.unwrap(), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(out.treatment, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(pp.feature_names(), vec!["age", "color"]);
        assert_eq!(pp.feature_names_one_hot(), &["age", "color_blue", "color_red"]);
        assert_eq!(&out.x.names[..3], &["age", "color_blue", "color_red"]);
        assert_eq!(
            &out.x.names[3..],
            &["v_great", "v_love", "v_price", "v_product", "v_service", "v_terrible"]
        );
        // NaN imputed with the training mean.
        assert_eq!(out.x.get_col(0), &[20.0, 30.0, 40.0, 30.0]);
        // Missing category encodes as all zeros.
        assert_eq!(out.x.get_row(2)[1..3], [0.0, 0.0]);
    }

    #[test]
    fn test_preprocess_inference() {
        let mut pp = preprocessor(TextOptions {
            min_df: 0.0,
            max_df: 1.0,
            ..TextOptions::default()
        });
        let train = pp.preprocess(&frame(), true).unwrap();
        let test = DataFrame::new()
            .with_column("t", vec![1.0])
            .unwrap()
            .with_column("age", vec![f64::NAN])
            .unwrap()
            .with_column("color", vec!["green"])
            .unwrap()
            .with_column("text", vec!["love it"])
            .unwrap();
        let out = pp.preprocess(&test, false).unwrap();
        assert!(out.y.is_none());
        assert_eq!(out.x.names, train.x.names);
        assert_eq!(out.x.get_row(0)[..3], [30.0, 0.0, 0.0]);
        // Only "love" is in the vocabulary, so the row is a unit vector on it.
        let love = out.x.names.iter().position(|n| n == "v_love").unwrap();
        assert_eq!(out.x.get_row(0)[love], 1.0);
    }

    #[test]
    fn test_preprocess_errors() {
        let mut pp = preprocessor(TextOptions::default());
        assert!(matches!(pp.preprocess(&frame(), false), Err(CausalError::NotFitted(_))));

        let bad_t = frame().take(&[0, 1]).unwrap();
        let mut bad_t = bad_t;
        bad_t.set_column("t", vec![0.0, 2.0]).unwrap();
        assert!(matches!(pp.preprocess(&bad_t, true), Err(CausalError::InvalidTreatment(_))));

        let mut multi = frame();
        multi.set_column("y", vec!["a", "b", "c", "a"]).unwrap();
        assert!(matches!(pp.preprocess(&multi, true), Err(CausalError::InvalidOutcome(_))));

        let mut regression = frame();
        regression.set_column("y", vec![1.0, 2.5, 3.0, 4.0]).unwrap();
        pp.preprocess(&regression, true).unwrap();
        assert!(!pp.is_classification());
    }

    #[test]
    fn test_include_cols() {
        let mut pp = DataframePreprocessor::new(
            "t",
            "y",
            None,
            &["age".to_string()],
            &[],
            TextOptions::default(),
            false,
        );
        let out = pp.preprocess(&frame(), true).unwrap();
        assert_eq!(out.x.names, vec!["age"]);
    }
}
