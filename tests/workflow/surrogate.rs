use wrf_fvcom_uq::Error;
use wrf_fvcom_uq::perturb::{PerturbOptions, perturb_variables};
use wrf_fvcom_uq::sampler::SampleRule;
use wrf_fvcom_uq::surrogate::{
    FitStrategy, KarhunenLoeve, ModeSelection, Predictor, RegressorKind, SurrogateConfig,
    make_surrogate_model,
};
use wrf_fvcom_uq::transform::{TransformOptions, TransformedMatrix, transform_perturbation_matrix};
use wrf_fvcom_uq::variable::Variable;

fn inputs(n: usize) -> TransformedMatrix {
    let variables = vec![
        Variable::uniform("a", 0.0, 1.0).unwrap(),
        Variable::uniform("b", 0.0, 2.0).unwrap(),
    ];
    let matrix =
        perturb_variables(&variables, n, SampleRule::Sobol, &PerturbOptions::default()).unwrap();
    transform_perturbation_matrix(&matrix, &TransformOptions::default()).unwrap()
}

fn linear(row: &[f64]) -> Vec<f64> {
    vec![1.0 + 2.0 * row[0] - 3.0 * row[1], 0.5 * row[0] + row[1]]
}

fn rmse(truth: &[Vec<f64>], predicted: &[Vec<f64>]) -> f64 {
    let (sum, count) = truth
        .iter()
        .zip(predicted)
        .flat_map(|(t, p)| t.iter().zip(p))
        .fold((0.0, 0usize), |(s, c), (t, p)| (s + (t - p).powi(2), c + 1));
    (sum / count as f64).sqrt()
}

#[test]
fn decision_tree_reproduces_training_outputs() {
    let x = inputs(32);
    let y: Vec<Vec<f64>> = x.values().iter().map(|r| linear(r)).collect();
    let config = SurrogateConfig::new(RegressorKind::DecisionTree);
    let trained = make_surrogate_model(&x, &y, &config).unwrap();
    let fitted = trained.predict(x.values()).unwrap();
    assert!(rmse(&y, &fitted) < 1e-9);
}

#[test]
fn polynomial_chaos_recovers_a_linear_map() {
    let x = inputs(40);
    let y: Vec<Vec<f64>> = x.values().iter().map(|r| linear(r)).collect();
    let config = SurrogateConfig::new(RegressorKind::PolynomialChaos);
    let trained = make_surrogate_model(&x, &y, &config).unwrap();

    let grid: Vec<Vec<f64>> = (0..10)
        .map(|i| vec![f64::from(i) / 9.0, 1.0 - f64::from(i) / 9.0])
        .collect();
    let truth: Vec<Vec<f64>> = grid.iter().map(|r| linear(r)).collect();
    let predicted = trained.predict(&grid).unwrap();
    assert!(rmse(&truth, &predicted) < 0.05, "rmse {}", rmse(&truth, &predicted));
}

#[test]
fn random_forest_grid_search_reports_scores() {
    let x = inputs(16);
    let y: Vec<Vec<f64>> = x.values().iter().map(|r| linear(r)).collect();
    let config = SurrogateConfig::new(RegressorKind::RandomForest).leave_out(2);
    let trained = make_surrogate_model(&x, &y, &config).unwrap();

    assert_eq!(trained.best_params().len(), 1);
    assert_eq!(trained.cv_scores().len(), 1);
    let scores = trained.mean_cv_scores();
    assert!(scores[0].is_finite() && scores[0] >= 0.0);
    assert_eq!(trained.predict(x.values()).unwrap()[0].len(), 2);
}

#[test]
fn gradient_boosting_fits_each_mode() {
    let x = inputs(24);
    let y: Vec<Vec<f64>> = x.values().iter().map(|r| linear(r)).collect();
    let config = SurrogateConfig::new(RegressorKind::GradientBoosting);
    let trained = make_surrogate_model(&x, &y, &config).unwrap();
    assert_eq!(trained.best_params().len(), 2);
    assert_eq!(trained.model().n_outputs(), 2);

    let joint = SurrogateConfig::new(RegressorKind::GradientBoosting).strategy(FitStrategy::Joint);
    assert!(matches!(
        make_surrogate_model(&x, &y, &joint),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn surrogate_of_kl_coordinates_maps_back_to_fields() {
    let x = inputs(20);
    // Fields over six points driven by the two inputs.
    let fields: Vec<Vec<f64>> = x
        .values()
        .iter()
        .map(|r| (0..6).map(|p| f64::from(p) * r[0] + r[1]).collect())
        .collect();
    let kl = KarhunenLoeve::fit(&fields, ModeSelection::VarianceFraction(0.999)).unwrap();
    let coords = kl.project(&fields).unwrap();

    let config = SurrogateConfig::new(RegressorKind::DecisionTree).weights(kl.eigen_ratios());
    let trained = make_surrogate_model(&x, &coords, &config).unwrap();
    let back = kl.inverse(&trained.predict(x.values()).unwrap()).unwrap();
    assert!(rmse(&fields, &back) < 1e-6);
}
