#[cfg(test)]
mod causal_tests {
    use crate::booster::GradientBooster;
    use crate::causal::interpret::Interpretation;
    use crate::causal::metalearners::{select_metalearner, Metalearner, MetalearnerType, TaskType};
    use crate::causal::sensitivity::{Sensitivity, SensitivityMethod};
    use crate::data::{FeatureMatrix, Matrix};
    use crate::errors::CausalError;
    use crate::learner::{default_effect_learner, default_learner, Learner};
    use crate::objective::Objective;
    use crate::utils::mean;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const ALL_TYPES: [MetalearnerType; 4] = [
        MetalearnerType::TLearner,
        MetalearnerType::SLearner,
        MetalearnerType::XLearner,
        MetalearnerType::RLearner,
    ];

    /// y = x0 + 0.5 * x1 + effect * w + noise, with random assignment.
    fn synthetic_regression(n: usize, effect: f64, seed: u64) -> (FeatureMatrix, Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x0: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        let x1: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        let w: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
        let y = (0..n)
            .map(|i| x0[i] + 0.5 * x1[i] + effect * w[i] + rng.gen_range(-0.05..0.05))
            .collect();
        let x = FeatureMatrix::from_columns(vec![("x0".to_string(), x0), ("x1".to_string(), x1)], n);
        (x, w, y)
    }

    /// Binary outcome whose probability rises by 0.4 under treatment.
    fn synthetic_classification(n: usize, seed: u64) -> (FeatureMatrix, Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x0: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        let w: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
        let y = (0..n)
            .map(|i| {
                let p = 0.2 + 0.2 * x0[i] + 0.4 * w[i];
                if rng.gen_bool(p) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        (FeatureMatrix::from_columns(vec![("x0".to_string(), x0)], n), w, y)
    }

    fn build(kind: MetalearnerType, task: TaskType) -> Metalearner {
        let learner = default_learner(task);
        let effect = default_effect_learner();
        select_metalearner(kind, task).build(&learner, &effect)
    }

    // -----------------------------------------------------------------------
    // Selection and construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_metalearner_selection() {
        assert_eq!("x-learner".parse::<MetalearnerType>().unwrap(), MetalearnerType::XLearner);
        let plan = select_metalearner(MetalearnerType::RLearner, TaskType::Regression);
        assert_eq!(plan.implementation(), "BaseRRegressor");
        let plan = select_metalearner(MetalearnerType::TLearner, TaskType::Classification);
        assert_eq!(plan.implementation(), "BaseTClassifier");
        assert_eq!(plan.to_string(), "t-learner (BaseTClassifier)");
        for kind in ALL_TYPES {
            assert_eq!(kind.tag().parse::<MetalearnerType>().unwrap(), kind);
            let m = build(kind, TaskType::Regression);
            assert_eq!(m.plan().kind, kind);
            assert!(!m.is_fitted());
        }
    }

    #[test]
    fn test_unknown_metalearner_tag() {
        match "z-learner".parse::<MetalearnerType>() {
            Err(CausalError::InvalidConfiguration(value, _, expected)) => {
                assert_eq!(value, "z-learner");
                for tag in ["t-learner", "s-learner", "x-learner", "r-learner"] {
                    assert!(expected.contains(tag));
                }
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }

    #[test]
    fn test_sub_learners_are_independent() {
        let (x, w, y) = synthetic_regression(200, 1.0, 0);
        let template: Box<dyn Learner> = Box::new(default_effect_learner());
        let mut m = select_metalearner(MetalearnerType::TLearner, TaskType::Regression).build(&*template, &*template);
        m.fit(&x.view(), &w, &y).unwrap();
        // The template is untouched by fitting.
        assert!(matches!(template.predict(&x.view()), Err(CausalError::NotFitted(_))));
        if let Metalearner::T(t) = &m {
            let p0 = t.mu0.predict(&x.view()).unwrap();
            let p1 = t.mu1.predict(&x.view()).unwrap();
            assert!(mean(&p1) - mean(&p0) > 0.5);
        } else {
            panic!("expected a T-learner");
        }
    }

    // -----------------------------------------------------------------------
    // Fit and predict
    // -----------------------------------------------------------------------

    #[test]
    fn test_metalearners_recover_constant_effect() {
        let (x, w, y) = synthetic_regression(600, 2.0, 1);
        for kind in ALL_TYPES {
            let mut m = build(kind, TaskType::Regression);
            let tau = m.fit_predict(&x.view(), &w, &y).unwrap();
            assert_eq!(tau.len(), x.rows);
            assert!(tau.iter().all(|t| t.is_finite()));
            let ate = mean(&tau);
            assert!((ate - 2.0).abs() < 0.4, "{} estimated ate {}", kind, ate);
        }
    }

    #[test]
    fn test_classification_effects_are_probability_differences() {
        let (x, w, y) = synthetic_classification(800, 2);
        for kind in ALL_TYPES {
            let mut m = build(kind, TaskType::Classification);
            let tau = m.fit_predict(&x.view(), &w, &y).unwrap();
            let ate = mean(&tau);
            assert!(ate > 0.1 && ate < 0.7, "{} estimated ate {}", kind, ate);
            if kind != MetalearnerType::RLearner {
                assert!(tau.iter().all(|t| (-1.0..=1.0).contains(t)));
            }
        }
    }

    #[test]
    fn test_predict_is_repeatable() {
        let (x, w, y) = synthetic_regression(300, 1.0, 3);
        let mut m = build(MetalearnerType::XLearner, TaskType::Regression);
        let tau = m.fit_predict(&x.view(), &w, &y).unwrap();
        assert_eq!(m.predict(&x.view()).unwrap(), tau);
        let head = x.head(5);
        assert_eq!(m.predict(&head.view()).unwrap(), tau[..5].to_vec());
    }

    #[test]
    fn test_fit_errors() {
        let (x, w, y) = synthetic_regression(50, 1.0, 4);
        let mut m = build(MetalearnerType::TLearner, TaskType::Regression);
        assert!(matches!(m.predict(&x.view()), Err(CausalError::NotFitted(_))));
        assert!(matches!(
            m.fit(&x.view(), &w[..10], &y),
            Err(CausalError::LengthMismatch(..))
        ));
        assert!(matches!(
            m.fit(&x.view(), &vec![1.0; 50], &y),
            Err(CausalError::InvalidTreatment(_))
        ));
        let mut bad = w.clone();
        bad[0] = 2.0;
        assert!(matches!(m.fit(&x.view(), &bad, &y), Err(CausalError::InvalidTreatment(_))));

        let mut c = build(MetalearnerType::SLearner, TaskType::Classification);
        assert!(matches!(c.fit(&x.view(), &w, &y), Err(CausalError::InvalidOutcome(_))));
    }

    #[test]
    fn test_failed_refit_clears_fitted_state() {
        let (x, w, y) = synthetic_regression(100, 1.0, 6);
        let all_treated = vec![1.0; 100];
        for kind in ALL_TYPES {
            let mut m = build(kind, TaskType::Regression);
            m.fit(&x.view(), &w, &y).unwrap();
            assert!(m.is_fitted());
            assert!(m.fit(&x.view(), &all_treated, &y).is_err());
            assert!(!m.is_fitted(), "{}", kind);
            assert!(matches!(m.predict(&x.view()), Err(CausalError::NotFitted(_))), "{}", kind);
        }
    }

    #[test]
    fn test_shape_mismatch_propagates() {
        let (x, w, y) = synthetic_regression(100, 1.0, 5);
        for kind in ALL_TYPES {
            let mut m = build(kind, TaskType::Regression);
            m.fit(&x.view(), &w, &y).unwrap();
            let narrow = vec![0.5; 3];
            let res = m.predict(&Matrix::new(&narrow, 3, 1));
            assert!(matches!(res, Err(CausalError::ShapeMismatch(..))), "{}", kind);
        }
    }

    #[test]
    fn test_custom_learner() {
        let (x, w, y) = synthetic_regression(300, 1.5, 6);
        let learner = GradientBooster::default()
            .set_objective(Objective::SquaredLoss)
            .set_n_estimators(50)
            .set_num_leaves(8);
        let mut m = select_metalearner(MetalearnerType::SLearner, TaskType::Regression).build(&learner, &learner);
        let tau = m.fit_predict(&x.view(), &w, &y).unwrap();
        assert!((mean(&tau) - 1.5).abs() < 0.4);
    }

    // -----------------------------------------------------------------------
    // Interpretation
    // -----------------------------------------------------------------------

    #[test]
    fn test_interpretation_of_effects() {
        let (x, w, _) = synthetic_regression(400, 0.0, 7);
        // Effect driven by x1 only.
        let y: Vec<f64> = (0..x.rows).map(|i| x.get_col(0)[i] + 3.0 * x.get_col(1)[i] * w[i]).collect();
        let mut m = build(MetalearnerType::TLearner, TaskType::Regression);
        let tau = m.fit_predict(&x.view(), &w, &y).unwrap();

        match m.get_importance(&x, &tau).unwrap() {
            Interpretation::Importance(ranked) => {
                assert_eq!(ranked[0].0, "x1");
                approx::assert_relative_eq!(ranked.iter().map(|r| r.1).sum::<f64>(), 1.0, epsilon = 1e-9);
            }
            _ => panic!("expected importances"),
        }
        match m.get_shap_values(&x, &tau).unwrap() {
            Interpretation::ShapValues { features, values, .. } => {
                assert_eq!(features, vec!["x0", "x1"]);
                assert_eq!(values.len(), x.rows);
                assert!(values.iter().all(|r| r.len() == 2));
            }
            _ => panic!("expected shap values"),
        }
        assert!(m.get_importance(&x, &tau[..10]).is_err());
    }

    // -----------------------------------------------------------------------
    // Sensitivity
    // -----------------------------------------------------------------------

    #[test]
    fn test_sensitivity_distances() {
        let (x, w, y) = synthetic_regression(300, 1.0, 8);
        let learner = default_learner(TaskType::Regression);
        let effect = default_effect_learner();
        let plan = select_metalearner(MetalearnerType::TLearner, TaskType::Regression);
        let sens = Sensitivity::new(plan, &learner, &effect, &x, &w, &y, 42).unwrap();
        let ate = 1.0;
        let report = sens.sensitivity_analysis(&SensitivityMethod::ALL, ate, 0.8).unwrap();
        let names: Vec<&str> = report.rows.iter().map(|r| r.method.name()).collect();
        assert_eq!(names, vec!["Placebo Treatment", "Random Cause", "Subset Data", "Random Replace"]);
        for row in &report.rows {
            assert_eq!(row.ate, ate);
            assert!(row.new_ate_lb <= row.new_ate && row.new_ate <= row.new_ate_ub);
            match row.method {
                SensitivityMethod::PlaceboTreatment => assert_eq!(row.distance, row.new_ate - 0.0),
                _ => assert_eq!(row.distance, row.new_ate - row.ate),
            }
        }
        let placebo = report.get(SensitivityMethod::PlaceboTreatment).unwrap();
        assert!(placebo.new_ate.abs() < 0.3);
        let cause = report.get(SensitivityMethod::RandomCause).unwrap();
        assert!(cause.distance.abs() < 0.3);
        assert!(report.to_string().contains("Placebo Treatment"));
        assert!(sens.sensitivity_analysis(&SensitivityMethod::ALL, ate, 0.0).is_err());
        assert!(sens.sensitivity_analysis(&SensitivityMethod::ALL, ate, 1.5).is_err());
    }
}
