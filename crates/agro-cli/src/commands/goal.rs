use agro_algo::{solve_goal_program, GoalProgrammingOptions};
use agro_cli::{AgroConfig, Commands, ResultFormat};
use agro_core::GoalParameters;
use agro_io::{load_goal_parameters, load_goal_weights, write_result_record_csv, write_result_record_json};
use anyhow::{anyhow, Context, Result};
use tracing::info;

pub fn handle(command: &Commands, config: &AgroConfig) -> Result<()> {
    let Commands::Goal {
        params,
        weights,
        encoding,
        solver,
        out,
        format,
        report,
    } = command
    else {
        return Err(anyhow!("goal handler called with wrong command"));
    };

    let mut parameters = match params {
        Some(path) => load_goal_parameters(path)?,
        None => GoalParameters::ireland(),
    };
    if let Some(path) = weights {
        parameters.weights = load_goal_weights(path)?;
    }

    let backend = config.lp_solver(solver.as_deref())?;
    let options = GoalProgrammingOptions {
        encoding: config.encoding(encoding.as_deref())?,
    };
    let solution = solve_goal_program(&parameters, &backend, options)
        .context("solving goal-programming model")?;

    println!("Status: {}", solution.status.as_str());
    println!("Objective value: {:.3}", solution.objective_value);
    if *report {
        print!("{}", solution.report());
    }

    if let Some(path) = out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory '{}'", parent.display()))?;
        }
        let record = solution.record();
        match format.unwrap_or_else(|| ResultFormat::from_path(path)) {
            ResultFormat::Json => write_result_record_json(path, &record)?,
            ResultFormat::Csv => write_result_record_csv(path, &record)?,
        }
        info!(path = %path.display(), "goal record written");
    }
    Ok(())
}
