use std::path::{Path, PathBuf};

use agro_algo::{format_processing_time, solve_price_responsive, NlpBackend, PenaltyLbfgs};
use agro_batch::{jobs_from_spec, run_sweep, SweepRunnerConfig, TaskKind};
use agro_cli::{AgroConfig, BmpCommands};
use agro_core::{BmpParameters, Scenario, UnitScaling};
use agro_io::{load_bmp_parameters, write_allocation_table, write_price_responsive_tables};
use agro_scenarios::{load_spec_from_path, SweepSpec};
use anyhow::{anyhow, Context, Result};
use tracing::info;

fn load_params(crops: &Path, baseline: &Path) -> Result<BmpParameters> {
    let params = load_bmp_parameters(crops, baseline, UnitScaling::default())?;
    info!(
        crops = params.num_crops(),
        subdivisions = params.num_subdivisions(),
        "BMP parameters loaded"
    );
    Ok(params)
}

fn output_dir(flag: &Option<PathBuf>, config: &AgroConfig) -> PathBuf {
    flag.clone().unwrap_or_else(|| config.output.dir.clone())
}

pub fn sweep(command: &BmpCommands, config: &AgroConfig) -> Result<()> {
    let BmpCommands::Sweep {
        crops,
        baseline,
        spec,
        out,
        solver,
        threads,
        keep_allocation,
        water_available,
    } = command
    else {
        return Err(anyhow!("sweep handler called with wrong command"));
    };

    let params = load_params(crops, baseline)?;
    let spec = match spec {
        Some(path) => load_spec_from_path(path)?,
        None => SweepSpec::default(),
    };
    let jobs = jobs_from_spec(&spec, TaskKind::BmpLinear)?;

    let mut runner = SweepRunnerConfig::new(jobs, output_dir(out, config), TaskKind::BmpLinear);
    runner.lp_solver = config.lp_solver(solver.as_deref())?;
    runner.allocation = config.allocation_options();
    runner.allocation.keep_allocation = *keep_allocation;
    runner.allocation.water_available |= *water_available;
    runner.threads = *threads;

    let summary = run_sweep(&runner, &params)?;
    println!(
        "Sweep finished: {} succeeded, {} failed",
        summary.success, summary.failure
    );
    for record in summary.jobs.iter().filter(|record| !record.is_ok()) {
        println!(
            "  ✗ {} ({})",
            record.scenario_id,
            record.error_kind.as_deref().unwrap_or("error")
        );
    }
    println!("Manifest: {}", summary.manifest_path.display());
    Ok(())
}

pub fn price(command: &BmpCommands, config: &AgroConfig) -> Result<()> {
    let BmpCommands::Price {
        crops,
        baseline,
        dp,
        dn,
        gradient,
        max_iter,
        out,
        keep_allocation,
    } = command
    else {
        return Err(anyhow!("price handler called with wrong command"));
    };

    let params = load_params(crops, baseline)?;
    let scenario = Scenario::new(*dp, *dn)?;
    let backend = PenaltyLbfgs::new(config.nlp_config(gradient.as_deref(), *max_iter)?);
    info!(
        scenario = %scenario.name(),
        backend = backend.name(),
        gradient = backend.config().gradient.as_str(),
        "solving price-responsive model"
    );
    let result = solve_price_responsive(&params, &scenario, &backend, &config.price_options())
        .with_context(|| format!("solving price-responsive scenario {}", scenario.name()))?;

    let dir = output_dir(out, config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating output directory '{}'", dir.display()))?;
    let name = scenario.name();
    let (prod_path, price_path) = write_price_responsive_tables(
        &dir,
        &name,
        &result.crops,
        &result.decision.production,
        &result.decision.price,
    )?;
    if *keep_allocation {
        write_allocation_table(
            &dir.join(format!("Ha_{name}.csv")),
            params.subdivisions(),
            &result.crops,
            &result.decision.allocation,
        )?;
    }

    println!("Scenario {name}: total margin {:.6}", result.objective_value);
    for ((crop, production), price) in result
        .crops
        .iter()
        .zip(&result.decision.production)
        .zip(&result.decision.price)
    {
        println!("  {crop}: production {production:.3}, price {price:.6}");
    }
    println!("Processing time: {}", format_processing_time(result.elapsed));
    println!("Wrote {} and {}", prod_path.display(), price_path.display());
    Ok(())
}
