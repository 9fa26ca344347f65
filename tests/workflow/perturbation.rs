use wrf_fvcom_uq::perturb::{
    PerturbOptions, PerturbationMatrix, matrix_file_name, perturb_variables,
};
use wrf_fvcom_uq::sampler::SampleRule;
use wrf_fvcom_uq::variable::{FVCOM_PRANDTL, Variable, VariableCatalog, WRF_PBL_SFCLAY};
use wrf_fvcom_uq::{Error, ParamValue};

fn builtin() -> Vec<Variable> {
    VariableCatalog::builtin().as_slice().to_vec()
}

#[test]
fn korobov_design_of_the_builtin_catalog() {
    let matrix =
        perturb_variables(&builtin(), 19, SampleRule::Korobov, &PerturbOptions::default())
            .unwrap();

    assert_eq!(matrix.n_runs(), 19);
    assert_eq!(matrix.n_variables(), 2);
    for code in matrix.column(WRF_PBL_SFCLAY).unwrap() {
        assert!([0.0, 1.0, 2.0].contains(&code), "scheme code {code}");
    }
    for value in matrix.column(FVCOM_PRANDTL).unwrap() {
        assert!((1.0..=10.0).contains(&value), "Prandtl number {value}");
    }
    assert_eq!(matrix.runs()[18], "2_variable_korobov_19");
}

#[test]
fn every_rule_respects_discrete_bounds() {
    for rule in [
        SampleRule::Random,
        SampleRule::Sobol,
        SampleRule::LatinHypercube,
        SampleRule::Korobov,
    ] {
        let matrix = perturb_variables(&builtin(), 50, rule, &PerturbOptions::default()).unwrap();
        let codes = matrix.column(WRF_PBL_SFCLAY).unwrap();
        assert!(codes.iter().all(|c| c.fract() == 0.0 && (0.0..=2.0).contains(c)), "{rule}");
    }
}

#[test]
fn seeded_rules_are_reproducible() {
    let options = PerturbOptions::default().seed(7);
    let a = perturb_variables(&builtin(), 12, SampleRule::Random, &options).unwrap();
    let b = perturb_variables(&builtin(), 12, SampleRule::Random, &options).unwrap();
    assert_eq!(a, b);
}

#[test]
fn matrix_is_written_and_read_back() {
    let dir = std::env::temp_dir().join(format!("wrf_fvcom_uq_perturb_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let options = PerturbOptions::default().output_directory(&dir);
    let matrix = perturb_variables(&builtin(), 8, SampleRule::LatinHypercube, &options).unwrap();

    let path = dir.join(matrix_file_name(2, SampleRule::LatinHypercube, 8));
    assert!(path.exists());
    let loaded = PerturbationMatrix::load(&path).unwrap();
    assert_eq!(loaded, matrix);

    let params = loaded.run_params(0).unwrap();
    assert!(matches!(params[0].1, ParamValue::Int(_)));
    assert!(matches!(params[1].1, ParamValue::Float(_)));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn loading_an_inverted_discrete_declaration_fails() {
    let dir = std::env::temp_dir().join(format!("wrf_fvcom_uq_bad_load_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("inverted.json");
    std::fs::write(
        &path,
        r#"{
            "name": "perturbation_matrix",
            "runs": ["r1"],
            "variables": [
                {"name": "s", "distribution": {"kind": "discreteuniform", "low": 2, "high": 0}}
            ],
            "values": [[1.0]]
        }"#,
    )
    .unwrap();

    let err = PerturbationMatrix::load(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidBounds { ref name, .. } if name == "s"), "{err}");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn empty_catalog_is_rejected() {
    let err = perturb_variables(&[], 4, SampleRule::Sobol, &PerturbOptions::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyVariables));
}

#[test]
fn unknown_rule_name_is_rejected() {
    let err = "monte_carlo".parse::<SampleRule>().unwrap_err();
    assert!(matches!(err, Error::UnrecognizedOption { .. }));
}
