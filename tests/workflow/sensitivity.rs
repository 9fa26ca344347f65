use wrf_fvcom_uq::Error;
use wrf_fvcom_uq::sensitivity::{SobolConfig, compute_sensitivities};
use wrf_fvcom_uq::transform::ColumnLayout;
use wrf_fvcom_uq::variable::{Variable, VariableCatalog};

fn uniform_layout() -> ColumnLayout {
    let variables = vec![
        Variable::uniform("x1", 0.0, 1.0).unwrap(),
        Variable::uniform("x2", 0.0, 1.0).unwrap(),
        Variable::uniform("x3", 0.0, 1.0).unwrap(),
    ];
    ColumnLayout::declared(&variables, true).unwrap()
}

#[test]
fn monotone_surrogate_has_non_negative_indices() {
    let model = |r: &[f64]| vec![r[0] + 2.0 * r[1] * r[1] + (r[2] * 3.0).exp()];
    let config = SobolConfig::default().sample_size(4000);
    let indices = compute_sensitivities(&model, &uniform_layout(), &config).unwrap();

    for (main, total) in indices.main[0].iter().zip(&indices.total[0]) {
        assert!(*main > -0.02, "main {main}");
        assert!(*total >= 0.0, "total {total}");
    }
    // The exponential term dominates.
    assert!(indices.total[0][2] > indices.total[0][0]);
    assert!(indices.total[0][2] > indices.total[0][1]);
}

#[test]
fn additive_main_effects_sum_to_at_most_one() {
    let model = |r: &[f64]| vec![r[0] + 0.5 * r[1] + 0.25 * r[2]];
    let config = SobolConfig::default().sample_size(5000);
    let indices = compute_sensitivities(&model, &uniform_layout(), &config).unwrap();
    let sum: f64 = indices.main[0].iter().sum();
    assert!(sum <= 1.0 + 0.05, "sum of main effects {sum}");
    assert!(sum > 0.9, "sum of main effects {sum}");
    // Analytic first-order indices are 16/21, 4/21 and 1/21.
    assert!((indices.main[0][0] - 16.0 / 21.0).abs() < 0.05);
}

#[test]
fn scheme_switch_is_reported_as_one_variable() {
    let variables = VariableCatalog::builtin().as_slice().to_vec();
    let layout = ColumnLayout::declared(&variables, true).unwrap();
    // Columns: three one-hot scheme columns, then the scaled Prandtl number.
    let model = |r: &[f64]| vec![2.0 * r[1] + r[3], r[3]];
    let config = SobolConfig::default().sample_size(10_000);
    let indices = compute_sensitivities(&model, &layout, &config).unwrap();

    assert_eq!(indices.variable_names.len(), 2);
    assert_eq!(indices.main.len(), 2);
    assert_eq!(indices.joint[0].len(), 2);
    assert_eq!(indices.joint[0][0][0], 0.0);
    assert!((indices.joint[0][0][1] - indices.joint[0][1][0]).abs() < 1e-12);
    // The second mode ignores the scheme entirely.
    assert!(indices.total[1][0].abs() < 1e-9);
    assert!((indices.total[1][1] - 1.0).abs() < 0.05);
}

#[test]
fn constant_surrogate_is_degenerate() {
    let model = |_: &[f64]| vec![3.0];
    let config = SobolConfig::default().sample_size(100);
    let err = compute_sensitivities(&model, &uniform_layout(), &config).unwrap_err();
    assert!(matches!(err, Error::DegenerateVariance(_)));
}
