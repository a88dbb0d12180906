use metacausal::{
    CausalConfig, CausalError, CausalInferenceModel, Column, DataFrame, InterpretMethod, Interpretation,
    MetalearnerType, SensitivityMethod, TaskType, TextOptions,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;

const REVIEWS_TREATED: [&str; 3] = [
    "great service and friendly staff",
    "the discount made the purchase easy",
    "friendly support answered quickly",
];
const REVIEWS_CONTROL: [&str; 3] = [
    "slow delivery and broken packaging",
    "price too high for the quality",
    "could not find the product page",
];

/// Customer table as csv text: visits, plan, review, treated and a yes/no outcome.
fn customers_csv(n: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from("visits,plan,review,treated,converted\n");
    for _ in 0..n {
        let visits: f64 = rng.gen_range(0.0..10.0);
        let plan = if rng.gen_bool(0.4) { "premium" } else { "basic" };
        let treated = rng.gen_bool(0.5);
        let review = if treated {
            REVIEWS_TREATED[rng.gen_range(0..3)]
        } else {
            REVIEWS_CONTROL[rng.gen_range(0..3)]
        };
        let p = 0.1 + 0.03 * visits + if treated { 0.3 } else { 0.0 };
        let converted = if rng.gen_bool(p) { "yes" } else { "no" };
        out.push_str(&format!(
            "{:.3},{},{},{},{}\n",
            visits,
            plan,
            review,
            if treated { 1 } else { 0 },
            converted
        ));
    }
    out
}

/// Read csv text into a frame, columns that parse as numbers become float columns.
fn read_frame(text: &str) -> Result<DataFrame, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (i, value) in record.iter().enumerate() {
            cells[i].push(value.to_string());
        }
    }
    let mut df = DataFrame::new();
    for (name, values) in headers.iter().zip(cells) {
        let parsed: Result<Vec<f64>, _> = values.iter().map(|v| v.parse::<f64>()).collect();
        let column = match parsed {
            Ok(floats) => Column::Float(floats),
            Err(_) => Column::Str(values),
        };
        df = df.with_column(name, column)?;
    }
    Ok(df)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn text_config() -> CausalConfig {
    CausalConfig::new("treated", "converted")
        .set_text_col(Some("review"))
        .set_text_options(TextOptions {
            min_df: 0.0,
            ..TextOptions::default()
        })
}

#[test]
fn test_text_classification_end_to_end() -> Result<(), Box<dyn Error>> {
    init_logger();
    let df = read_frame(&customers_csv(600, 0))?;
    let mut model = CausalInferenceModel::new(&df, text_config())?;
    assert_eq!(model.task(), TaskType::Classification);
    assert_eq!(model.get_required_columns(), vec!["treated", "visits", "plan", "review"]);
    assert!(model.x().names.iter().any(|n| n.starts_with("v_")));

    model.fit()?;
    let ate = model.estimate_ate(None)?.ate;
    assert!(ate > -1.0 && ate < 1.0);

    // Predicting the training rows reproduces the stored effects.
    let required: Vec<String> = model.get_required_columns();
    let names: Vec<&str> = required.iter().map(|s| s.as_str()).collect();
    let subset = df.select(&names)?;
    let tau = model.df().float_column("treatment_effect")?.to_vec();
    assert_eq!(model.predict(&subset)?, tau);

    let mask: Vec<bool> = (0..df.height()).map(|i| i < 10).collect();
    let first = model.estimate_ate(Some(&mask))?.ate;
    approx::assert_relative_eq!(first, tau[..10].iter().sum::<f64>() / 10.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_regression_variants() -> Result<(), Box<dyn Error>> {
    init_logger();
    let mut rng = StdRng::seed_from_u64(1);
    let n = 500;
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
    let t: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
    let y: Vec<f64> = (0..n).map(|i| 2.0 * x[i] + 1.5 * t[i] + rng.gen_range(-0.1..0.1)).collect();
    let df = DataFrame::new()
        .with_column("x", x)?
        .with_column("t", t)?
        .with_column("y", y)?;
    for tag in ["t-learner", "s-learner", "x-learner", "r-learner"] {
        let kind: MetalearnerType = tag.parse()?;
        let cfg = CausalConfig::new("t", "y").set_metalearner_type(kind).set_verbose(false);
        let mut model = CausalInferenceModel::new(&df, cfg)?;
        model.fit()?;
        let ate = model.estimate_ate(None)?.ate;
        assert!((ate - 1.5).abs() < 0.4, "{} estimated {}", tag, ate);
    }
    Ok(())
}

#[test]
fn test_robustness_report() -> Result<(), Box<dyn Error>> {
    init_logger();
    let df = read_frame(&customers_csv(400, 2))?;
    let mut model = CausalInferenceModel::new(&df, CausalConfig::new("treated", "converted").set_ignore_cols(vec!["review".to_string()]))?;
    model.fit()?;
    let ate = model.estimate_ate(None)?.ate;
    let report = model.evaluate_robustness(0.8)?;
    for (row, method) in report.rows.iter().zip(SensitivityMethod::ALL) {
        assert_eq!(row.method, method);
        assert_eq!(row.ate, ate);
        assert!(row.new_ate_lb <= row.new_ate_ub);
    }
    match model.interpret(InterpretMethod::FeatureImportance)? {
        Interpretation::Importance(ranked) => assert_eq!(ranked.len(), model.x().cols),
        _ => panic!("expected importances"),
    }
    Ok(())
}

#[test]
fn test_unknown_metalearner_is_rejected() {
    match "y-learner".parse::<MetalearnerType>() {
        Err(CausalError::InvalidConfiguration(value, _, expected)) => {
            assert_eq!(value, "y-learner");
            assert!(expected.contains("r-learner"));
        }
        _ => panic!("expected InvalidConfiguration"),
    }
}

#[test]
fn test_missing_prediction_columns() -> Result<(), Box<dyn Error>> {
    let df = read_frame(&customers_csv(200, 3))?;
    let mut model = CausalInferenceModel::new(&df, text_config().set_verbose(false))?;
    model.fit()?;
    let partial = df.select(&["treated", "visits"])?;
    assert!(matches!(model.predict(&partial), Err(CausalError::MissingColumn(_))));
    Ok(())
}

/// Numeric frame with a binary or a continuous outcome.
fn numeric_frame(n: usize, task: TaskType, seed: u64) -> Result<DataFrame, Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let t: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| match task {
            TaskType::Classification => {
                let p = 0.2 + 0.3 * x[i] + 0.3 * t[i];
                if rng.gen_bool(p) {
                    1.0
                } else {
                    0.0
                }
            }
            TaskType::Regression => x[i] + 0.5 * z[i] + t[i] + rng.gen_range(-0.1..0.1),
        })
        .collect();
    Ok(DataFrame::new()
        .with_column("x", x)?
        .with_column("z", z)?
        .with_column("t", t)?
        .with_column("y", y)?)
}

#[test]
fn test_every_variant_and_task() -> Result<(), Box<dyn Error>> {
    init_logger();
    for task in [TaskType::Classification, TaskType::Regression] {
        let df = numeric_frame(300, task, 5)?;
        for tag in ["t-learner", "s-learner", "x-learner", "r-learner"] {
            let cfg = CausalConfig::new("t", "y")
                .set_metalearner_type(tag.parse()?)
                .set_verbose(false);
            let mut model = CausalInferenceModel::new(&df, cfg)?;
            assert_eq!(model.task(), task, "{}", tag);
            model.fit()?;
            assert!(model.is_fitted());

            let before = model.estimate_ate(None)?.ate;
            assert!(before.is_finite(), "{} {:?}", tag, task);
            let pred = model.predict(&df)?;
            assert_eq!(pred.len(), df.height());
            assert!(pred.iter().all(|p| p.is_finite()));
            assert_eq!(model.estimate_ate(None)?.ate, before, "{} {:?}", tag, task);

            match model.interpret(InterpretMethod::FeatureImportance)? {
                Interpretation::Importance(ranked) => assert_eq!(ranked.len(), 2),
                _ => panic!("expected importances"),
            }
            match model.interpret(InterpretMethod::ShapValues)? {
                Interpretation::ShapValues { features, values, .. } => {
                    assert_eq!(features, vec!["x", "z"]);
                    assert_eq!(values.len(), df.height());
                    assert!(values.iter().all(|row| row.len() == 2));
                }
                _ => panic!("expected shap values"),
            }
        }
    }
    Ok(())
}
