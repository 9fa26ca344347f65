use wrf_fvcom_uq::ParamValue;
use wrf_fvcom_uq::calibration::{
    BayesianOptimizationConfig, ScoreType, best_prediction, run_bayesian_optimization,
};
use wrf_fvcom_uq::perturb::{PerturbOptions, perturb_variables};
use wrf_fvcom_uq::sampler::SampleRule;
use wrf_fvcom_uq::surrogate::{Predictor, RegressorKind, SurrogateConfig, make_surrogate_model};
use wrf_fvcom_uq::transform::{ColumnLayout, TransformOptions, transform_perturbation_matrix};
use wrf_fvcom_uq::variable::{FVCOM_PRANDTL, VariableCatalog, WRF_PBL_SFCLAY};

/// Synthetic "coupled model": a field of five values per run.
fn field(row: &[f64]) -> Vec<f64> {
    let scheme = row[..3].iter().position(|&v| v == 1.0).unwrap_or(0) as f64;
    let prandtl = row[3];
    (0..5)
        .map(|p| f64::from(p) * prandtl + 0.3 * scheme * f64::from(p % 2))
        .collect()
}

fn layout() -> ColumnLayout {
    ColumnLayout::declared(VariableCatalog::builtin().as_slice(), true).unwrap()
}

#[test]
fn exact_surrogate_reaches_zero_score() {
    let observations = field(&[0.0, 0.0, 1.0, 0.5]);
    let config = BayesianOptimizationConfig::default()
        .n_initial_points(20)
        .n_calls(80)
        .n_candidates(1000);
    let result = run_bayesian_optimization(&field, &layout(), &observations, &config).unwrap();

    assert_eq!(result.history.len(), 80);
    assert_eq!(result.best.get(WRF_PBL_SFCLAY), Some(ParamValue::Int(2)));
    assert!(result.best_score < 2e-2, "best score {}", result.best_score);

    let ParamValue::Float(prandtl) = result.best.get(FVCOM_PRANDTL).unwrap() else {
        panic!("Prandtl number should be continuous");
    };
    assert!((prandtl - 5.5).abs() < 1.0, "Prandtl number {prandtl}");
}

#[test]
fn gamma2_objective_is_supported() {
    let observations = field(&[1.0, 0.0, 0.0, 0.2]);
    let config = BayesianOptimizationConfig::default()
        .n_initial_points(10)
        .n_calls(25)
        .n_candidates(200)
        .score_type("gamma2".parse::<ScoreType>().unwrap());
    let result = run_bayesian_optimization(&field, &layout(), &observations, &config).unwrap();
    assert!(result.best_score >= 0.0);
    assert!(result.history.iter().all(|e| e.score >= result.best_score));
}

#[test]
fn trained_surrogate_drives_the_search() {
    let variables = VariableCatalog::builtin().as_slice().to_vec();
    let matrix =
        perturb_variables(&variables, 30, SampleRule::Sobol, &PerturbOptions::default()).unwrap();
    let inputs = transform_perturbation_matrix(&matrix, &TransformOptions::default()).unwrap();
    let outputs: Vec<Vec<f64>> = inputs.values().iter().map(|r| field(r)).collect();
    let surrogate_config = SurrogateConfig::new(RegressorKind::DecisionTree);
    let surrogate = make_surrogate_model(&inputs, &outputs, &surrogate_config).unwrap();

    let observations = outputs[7].clone();
    let config = BayesianOptimizationConfig::default()
        .n_initial_points(10)
        .n_calls(30)
        .n_candidates(200);
    let result =
        run_bayesian_optimization(&surrogate, inputs.layout(), &observations, &config).unwrap();

    let best = best_prediction(&surrogate, inputs.layout(), &result, None).unwrap();
    let direct = surrogate
        .predict(&[inputs.layout().encode_params(&result.best.params).unwrap()])
        .unwrap();
    assert_eq!(best, direct[0]);
    assert_eq!(best.len(), observations.len());
}

#[test]
fn history_exports_to_csv() {
    let observations = field(&[0.0, 1.0, 0.0, 0.3]);
    let config = BayesianOptimizationConfig::default()
        .n_initial_points(4)
        .n_calls(6)
        .n_candidates(20);
    let result = run_bayesian_optimization(&field, &layout(), &observations, &config).unwrap();

    let file_name = format!("wrf_fvcom_uq_history_{}.csv", std::process::id());
    let path = std::env::temp_dir().join(file_name);
    result.export_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("iteration,{WRF_PBL_SFCLAY},{FVCOM_PRANDTL},score"));
    assert_eq!(lines.len(), 7);
}
