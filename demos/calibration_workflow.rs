//! End-to-end calibration against a synthetic coupled model.
//!
//! A cheap analytic field stands in for the WRF–FVCOM runs: the ensemble is
//! perturbed, the output fields are reduced with Karhunen–Loève, a random
//! forest surrogate is trained on the mode coordinates, the parameters are
//! ranked by Sobol sensitivity and finally calibrated against a synthetic
//! observation.
//!
//! Run with: `cargo run --example calibration_workflow`

use wrf_fvcom_uq::prelude::*;

/// Water-level-like response over 12 stations.
fn simulate(scheme: f64, prandtl: f64) -> Vec<f64> {
    (0..12)
        .map(|s| {
            let x = f64::from(s) / 11.0;
            (x * 3.0).sin() / prandtl.sqrt() + 0.2 * scheme * x
        })
        .collect()
}

fn main() -> Result<()> {
    let variables = VariableCatalog::builtin().as_slice().to_vec();
    let matrix = perturb_variables(&variables, 40, SampleRule::Sobol, &PerturbOptions::default())?;
    let fields: Vec<Vec<f64>> = matrix.values().iter().map(|r| simulate(r[0], r[1])).collect();

    let kl = KarhunenLoeve::fit(&fields, ModeSelection::VarianceFraction(0.99))?;
    println!("KL modes kept: {} {:?}", kl.n_modes(), kl.eigen_ratios());
    let coordinates = kl.project(&fields)?;

    let inputs = transform_perturbation_matrix(&matrix, &TransformOptions::default())?;
    let config = SurrogateConfig::new(RegressorKind::RandomForest).weights(kl.eigen_ratios());
    let surrogate = make_surrogate_model(&inputs, &coordinates, &config)?;
    println!("best hyperparameters: {}", surrogate.best_params()[0]);
    println!("cross-validation score: {:?}", surrogate.mean_cv_scores());

    let indices = compute_sensitivities(&surrogate, inputs.layout(), &SobolConfig::default())?;
    for (k, (main, total)) in indices.main.iter().zip(&indices.total).enumerate() {
        println!("mode {k}:");
        for ((name, s), t) in indices.variable_names.iter().zip(main).zip(total) {
            println!("  {name:<16} main {s:>7.3}  total {t:>7.3}");
        }
    }

    // Calibrate against a field produced by scheme 1 and Prandtl number 4.
    let observed = kl.project(&[simulate(1.0, 4.0)])?.remove(0);
    let bo = BayesianOptimizationConfig::default();
    let result = run_bayesian_optimization(&surrogate, inputs.layout(), &observed, &bo)?;
    println!("\nbest score {:.4} after {} evaluations", result.best_score, result.history.len());
    for (name, value) in &result.best.params {
        println!("  {name} = {value}");
    }

    let field = best_prediction(&surrogate, inputs.layout(), &result, Some(&kl))?;
    println!("best predicted field: {field:.3?}");

    let path = std::env::temp_dir().join("wrf_fvcom_uq_calibration_history.csv");
    result.export_csv(&path)?;
    println!("history written to {}", path.display());
    Ok(())
}
