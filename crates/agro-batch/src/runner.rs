use crate::job::{SweepJob, SweepJobRecord, TaskKind};
use crate::manifest::{write_sweep_manifest, SweepManifest, MANIFEST_FILE};
use agro_algo::{
    solve_allocation, solve_price_responsive, AllocationOptions, LpSolverKind, NlpBackend,
    NlpSolverConfig, PenaltyLbfgs, PriceResponsiveOptions, PriceResponsiveResult,
};
use agro_core::{BmpParameters, ProductionRecord};
use agro_io::{
    write_allocation_table, write_price_responsive_tables, ProductionTable, PRODUCTION_TABLE_FILE,
};
use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

pub struct SweepRunnerConfig {
    pub jobs: Vec<SweepJob>,
    pub output_root: PathBuf,
    pub task: TaskKind,
    pub lp_solver: LpSolverKind,
    pub allocation: AllocationOptions,
    pub price: PriceResponsiveOptions,
    pub nlp: NlpSolverConfig,
    /// Worker threads; 0 uses every core
    pub threads: usize,
}

impl SweepRunnerConfig {
    pub fn new(jobs: Vec<SweepJob>, output_root: impl Into<PathBuf>, task: TaskKind) -> Self {
        Self {
            jobs,
            output_root: output_root.into(),
            task,
            lp_solver: LpSolverKind::default(),
            allocation: AllocationOptions::default(),
            price: PriceResponsiveOptions::default(),
            nlp: NlpSolverConfig::default(),
            threads: 0,
        }
    }

    fn backend_name(&self) -> &'static str {
        match self.task {
            TaskKind::BmpLinear => self.lp_solver.as_str(),
            TaskKind::BmpPrice => PenaltyLbfgs::new(self.nlp.clone()).name(),
        }
    }
}

pub struct SweepSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub jobs: Vec<SweepJobRecord>,
}

enum JobOutput {
    Production(ProductionRecord),
    Price(Box<PriceResponsiveResult>),
}

/// Solve every job on a rayon pool, then write the result tables and the
/// manifest. A failed scenario is recorded and skipped; it never aborts the
/// sweep.
pub fn run_sweep(config: &SweepRunnerConfig, params: &BmpParameters) -> Result<SweepSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating sweep output root '{}'",
            config.output_root.display()
        )
    })?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for sweep runs")?;

    let start = Instant::now();
    let results: Vec<(SweepJobRecord, Option<JobOutput>)> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config, params))
            .collect()
    });

    let (records, outputs): (Vec<_>, Vec<_>) = results.into_iter().unzip();
    let success = records.iter().filter(|record| record.is_ok()).count();
    let failure = records.len() - success;

    let written = write_outputs(config, params, outputs.into_iter().flatten().collect())?;

    let manifest = SweepManifest {
        created_at: Utc::now(),
        task: config.task.as_str().to_string(),
        backend: config.backend_name().to_string(),
        num_jobs: records.len(),
        success,
        failure,
        jobs: records.clone(),
        outputs: written
            .iter()
            .map(|p| relative_name(&config.output_root, p))
            .collect(),
    };
    let manifest_path = config.output_root.join(MANIFEST_FILE);
    write_sweep_manifest(&manifest_path, &manifest)?;

    info!(
        task = config.task.as_str(),
        success,
        failure,
        threads = thread_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sweep finished"
    );
    Ok(SweepSummary {
        success,
        failure,
        manifest_path,
        outputs: written,
        jobs: records,
    })
}

fn run_job(
    job: &SweepJob,
    config: &SweepRunnerConfig,
    params: &BmpParameters,
) -> (SweepJobRecord, Option<JobOutput>) {
    let start = Instant::now();
    let result = match config.task {
        TaskKind::BmpLinear => {
            solve_allocation(params, &job.scenario, &config.lp_solver, &config.allocation)
                .map(|record| (record.objective_value, JobOutput::Production(record)))
        }
        TaskKind::BmpPrice => {
            let backend = PenaltyLbfgs::new(config.nlp.clone());
            solve_price_responsive(params, &job.scenario, &backend, &config.price)
                .map(|result| (result.objective_value, JobOutput::Price(Box::new(result))))
        }
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let mut record = SweepJobRecord {
        job_id: job.job_id.clone(),
        scenario_id: job.scenario.name(),
        cap_p: job.scenario.cap_p,
        cap_n: job.scenario.cap_n,
        status: "ok".to_string(),
        error_kind: None,
        error: None,
        objective: None,
        elapsed_ms,
    };
    match result {
        Ok((objective, output)) => {
            record.objective = Some(objective);
            (record, Some(output))
        }
        Err(err) => {
            warn!(job = %job.job_id, kind = err.kind(), "sweep job failed: {err}");
            record.status = "error".to_string();
            record.error_kind = Some(err.kind().to_string());
            record.error = Some(err.to_string());
            (record, None)
        }
    }
}

/// Tables for the successful jobs, in job order.
fn write_outputs(
    config: &SweepRunnerConfig,
    params: &BmpParameters,
    outputs: Vec<JobOutput>,
) -> Result<Vec<PathBuf>> {
    let root = &config.output_root;
    let crops: Vec<String> = params.crops().iter().map(|c| c.name.clone()).collect();
    let mut written = Vec::new();

    match config.task {
        TaskKind::BmpLinear => {
            let mut table =
                ProductionTable::with_baseline(crops.clone(), params.baseline_production())?;
            for output in &outputs {
                if let JobOutput::Production(record) = output {
                    table.push_record(record)?;
                    if let Some(allocation) = &record.allocation {
                        let path = root.join(format!("Ha_{}.csv", record.scenario));
                        write_allocation_table(&path, params.subdivisions(), &crops, allocation)?;
                        written.push(path);
                    }
                }
            }
            let path = root.join(PRODUCTION_TABLE_FILE);
            table.write_csv(&path)?;
            written.insert(0, path);
        }
        TaskKind::BmpPrice => {
            for output in &outputs {
                if let JobOutput::Price(result) = output {
                    let name = result.scenario.name();
                    let (prod, price) = write_price_responsive_tables(
                        root,
                        &name,
                        &result.crops,
                        &result.decision.production,
                        &result.decision.price,
                    )?;
                    written.push(prod);
                    written.push(price);
                    if config.allocation.keep_allocation {
                        let path = root.join(format!("Ha_{name}.csv"));
                        write_allocation_table(
                            &path,
                            params.subdivisions(),
                            &crops,
                            &result.decision.allocation,
                        )?;
                        written.push(path);
                    }
                }
            }
        }
    }
    Ok(written)
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
