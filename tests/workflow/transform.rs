use wrf_fvcom_uq::Error;
use wrf_fvcom_uq::perturb::{PerturbOptions, PerturbationMatrix, perturb_variables};
use wrf_fvcom_uq::sampler::SampleRule;
use wrf_fvcom_uq::transform::{
    CategoryEncoding, ColumnKind, SearchSpace, TransformOptions, transform_perturbation_matrix,
    transform_row,
};
use wrf_fvcom_uq::variable::{Variable, VariableCatalog};

fn builtin() -> Vec<Variable> {
    VariableCatalog::builtin().as_slice().to_vec()
}

#[test]
fn column_count_is_codes_plus_continuous() {
    let matrix =
        perturb_variables(&builtin(), 30, SampleRule::Sobol, &PerturbOptions::default()).unwrap();
    let t = transform_perturbation_matrix(&matrix, &TransformOptions::default()).unwrap();
    // Three scheme codes plus the Prandtl number.
    assert_eq!(t.n_columns(), 4);
    assert_eq!(t.runs(), matrix.runs());
    for row in t.values() {
        let hot: f64 = row[..3].iter().sum();
        assert_eq!(hot, 1.0);
    }
}

#[test]
fn scaled_columns_invert_exactly() {
    let options = PerturbOptions::default();
    let matrix = perturb_variables(&builtin(), 25, SampleRule::LatinHypercube, &options).unwrap();
    let t = transform_perturbation_matrix(&matrix, &TransformOptions::default()).unwrap();
    let last = t.n_columns() - 1;
    assert_eq!(t.columns()[last].kind(), ColumnKind::Continuous { scaled: true });

    for (physical, encoded) in matrix.values().iter().zip(t.values()) {
        let u = encoded[last];
        assert!((0.0..=1.0).contains(&u));
        let back = t.inverse_scale(last, u).unwrap();
        assert!((back - physical[1]).abs() < 1e-12);
    }
}

#[test]
fn observed_encoding_drops_absent_codes() {
    let runs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let matrix = PerturbationMatrix::new(
        runs,
        builtin(),
        vec![vec![0.0, 2.0], vec![2.0, 5.0], vec![0.0, 9.0]],
    )
    .unwrap();
    let options = TransformOptions::default().encoding(CategoryEncoding::Observed);
    let t = transform_perturbation_matrix(&matrix, &options).unwrap();
    assert_eq!(t.n_columns(), 3);
    let row = &t.values()[1];
    assert_eq!(row[..2], [0.0, 1.0]);
    assert!((row[2] - 4.0 / 9.0).abs() < 1e-12);
}

#[test]
fn single_rows_use_the_declared_catalog() {
    let options = TransformOptions::default().scale(false);
    let row = transform_row(&builtin(), &[1.0, 10.0], &options).unwrap();
    assert_eq!(row, vec![0.0, 1.0, 0.0, 10.0]);
}

#[test]
fn deserialized_variables_are_checked_before_encoding() {
    let inverted: Variable = serde_json::from_str(
        r#"{"name": "s", "distribution": {"kind": "discreteuniform", "low": 2, "high": 0}}"#,
    )
    .unwrap();

    let err = SearchSpace::from_variables(std::slice::from_ref(&inverted)).unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { .. }), "{err}");
    let err = transform_row(&[inverted], &[1.0], &TransformOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { .. }), "{err}");

    let space = SearchSpace::from_variables(&builtin()).unwrap();
    assert_eq!(space.dimensions().len(), 2);
}
