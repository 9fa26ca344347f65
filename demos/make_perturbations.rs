//! Draws the perturbation matrix of the built-in WRF–FVCOM catalog with
//! every sampling rule and writes each matrix to the system temp directory.
//!
//! Run with: `cargo run --example make_perturbations`

use wrf_fvcom_uq::prelude::*;

fn main() -> Result<()> {
    let variables = VariableCatalog::builtin().as_slice().to_vec();
    let out_dir = std::env::temp_dir().join("wrf_fvcom_uq_perturbations");
    std::fs::create_dir_all(&out_dir)?;
    let options = PerturbOptions::default().output_directory(&out_dir);

    for variable in &variables {
        println!("{}: {:?}", variable.name(), variable.distribution());
        for (code, label) in variable.schemes() {
            println!("  {code} = {label}");
        }
    }

    for rule in [
        SampleRule::Random,
        SampleRule::Sobol,
        SampleRule::LatinHypercube,
        SampleRule::Korobov,
    ] {
        let matrix = perturb_variables(&variables, 19, rule, &options)?;
        println!("\n{rule}: {} runs", matrix.n_runs());
        for (run, row) in matrix.runs().iter().zip(matrix.values()).take(3) {
            println!("  {run:<28} {row:?}");
        }
    }

    println!("\nmatrices written to {}", out_dir.display());
    Ok(())
}
