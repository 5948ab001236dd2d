//! BMP allocation with price as an endogenous variable.
//!
//! Price follows a constant-elasticity demand curve around the baseline:
//!
//! ```text
//! p_c = p0_c · (1 + (y_c / y0_c − 1) / ε)        ε = −0.2 by default
//! ```
//!
//! The decision vector is flat: the allocation block first (row-major by
//! subdivision), then production, then price. [`VariableLayout`] owns the
//! offsets and the pack/unpack codec.
//!
//! | block | offset | length |
//! |-------|--------|--------|
//! | allocation `x[s,c]` | 0 | S·C |
//! | production `y[c]` | S·C | C |
//! | price `p[c]` | S·C + C | C |

use crate::nlp::{ConstraintSpec, NlpBackend, NlpProblem};
use agro_core::{
    AgroError, AgroResult, AllocationMatrix, AllowedLoads, BmpParameters, CropCoefficients,
    ProductionRecord, Scenario,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Offsets of the three blocks in the flat decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    subdivisions: usize,
    crops: usize,
}

impl VariableLayout {
    pub fn new(subdivisions: usize, crops: usize) -> Self {
        Self {
            subdivisions,
            crops,
        }
    }

    pub fn for_params(params: &BmpParameters) -> Self {
        Self::new(params.num_subdivisions(), params.num_crops())
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    pub fn crops(&self) -> usize {
        self.crops
    }

    pub fn dimension(&self) -> usize {
        self.subdivisions * self.crops + 2 * self.crops
    }

    pub fn production_offset(&self) -> usize {
        self.subdivisions * self.crops
    }

    pub fn price_offset(&self) -> usize {
        self.production_offset() + self.crops
    }

    /// Flat index of `x[s,c]`.
    pub fn allocation_index(&self, subdivision: usize, crop: usize) -> usize {
        subdivision * self.crops + crop
    }

    /// Borrowed (allocation, production, price) views of a flat vector.
    pub fn split<'a>(&self, flat: &'a [f64]) -> (&'a [f64], &'a [f64], &'a [f64]) {
        let (allocation, rest) = flat.split_at(self.production_offset());
        let (production, price) = rest.split_at(self.crops);
        (allocation, production, price)
    }

    pub fn pack(&self, decision: &DecisionVector) -> AgroResult<Vec<f64>> {
        let a = &decision.allocation;
        if a.rows() != self.subdivisions
            || a.cols() != self.crops
            || decision.production.len() != self.crops
            || decision.price.len() != self.crops
        {
            return Err(AgroError::Validation(format!(
                "decision shape {}x{} / {} / {} does not match layout {}x{}",
                a.rows(),
                a.cols(),
                decision.production.len(),
                decision.price.len(),
                self.subdivisions,
                self.crops
            )));
        }
        let mut flat = Vec::with_capacity(self.dimension());
        flat.extend_from_slice(a.as_slice());
        flat.extend_from_slice(&decision.production);
        flat.extend_from_slice(&decision.price);
        Ok(flat)
    }

    pub fn unpack(&self, flat: &[f64]) -> AgroResult<DecisionVector> {
        if flat.len() != self.dimension() {
            return Err(AgroError::Validation(format!(
                "flat vector has {} entries, layout expects {}",
                flat.len(),
                self.dimension()
            )));
        }
        let (allocation, production, price) = self.split(flat);
        Ok(DecisionVector {
            allocation: AllocationMatrix::from_row_major(
                self.subdivisions,
                self.crops,
                allocation.to_vec(),
            )?,
            production: production.to_vec(),
            price: price.to_vec(),
        })
    }
}

/// Structured form of the flat decision vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionVector {
    /// [thousand-Ha]
    pub allocation: AllocationMatrix,
    /// [Ton/yr]
    pub production: Vec<f64>,
    /// [$M/Ton]
    pub price: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceResponsiveOptions {
    pub min_production_ratio: f64,
    pub max_production_ratio: f64,
    /// Price elasticity of demand, negative
    pub elasticity: f64,
}

impl Default for PriceResponsiveOptions {
    fn default() -> Self {
        Self {
            min_production_ratio: 0.5,
            max_production_ratio: 1.5,
            elasticity: -0.2,
        }
    }
}

impl PriceResponsiveOptions {
    pub fn validate(&self) -> AgroResult<()> {
        let (lo, hi) = (self.min_production_ratio, self.max_production_ratio);
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || lo > hi {
            return Err(AgroError::Validation(format!(
                "production ratios must satisfy 0 <= min <= max, got min={lo} max={hi}"
            )));
        }
        if !self.elasticity.is_finite() || self.elasticity >= 0.0 {
            return Err(AgroError::Validation(format!(
                "elasticity must be negative, got {}",
                self.elasticity
            )));
        }
        Ok(())
    }
}

const EXPORT_P: usize = 0;
const EXPORT_N: usize = 1;
const WATER: usize = 2;
const AREA: usize = 3;
const MIN_PRODUCTION: usize = 4;
const MAX_PRODUCTION: usize = 5;
const PRODUCTION: usize = 6;
const PRICE: usize = 7;

/// The price-responsive NLP for one scenario, in minimisation form
/// (objective = −margin).
pub struct PriceResponsiveProblem<'a> {
    params: &'a BmpParameters,
    layout: VariableLayout,
    options: PriceResponsiveOptions,
    allowed: AllowedLoads,
    area: Vec<f64>,
    baseline_production: Vec<f64>,
    baseline_price: Vec<f64>,
    specs: Vec<ConstraintSpec>,
}

impl<'a> PriceResponsiveProblem<'a> {
    pub fn new(
        params: &'a BmpParameters,
        scenario: &Scenario,
        options: &PriceResponsiveOptions,
    ) -> AgroResult<Self> {
        options.validate()?;
        let specs = vec![
            ConstraintSpec::inequality("export_p"),
            ConstraintSpec::inequality("export_n"),
            ConstraintSpec::inequality("water"),
            ConstraintSpec::inequality("area"),
            ConstraintSpec::inequality("min_production"),
            ConstraintSpec::inequality("max_production"),
            ConstraintSpec::equality("production"),
            ConstraintSpec::equality("price"),
        ];
        Ok(Self {
            params,
            layout: VariableLayout::for_params(params),
            options: options.clone(),
            allowed: scenario.allowed(&params.baseline_loads()),
            area: params.available_area(),
            baseline_production: params.baseline_production(),
            baseline_price: params.baseline_price(),
            specs,
        })
    }

    pub fn layout(&self) -> VariableLayout {
        self.layout
    }

    fn crop_areas(&self, allocation: &[f64]) -> Vec<f64> {
        let crops = self.layout.crops();
        let mut sums = vec![0.0; crops];
        for row in allocation.chunks_exact(crops) {
            for (sum, x) in sums.iter_mut().zip(row) {
                *sum += x;
            }
        }
        sums
    }

    fn load(&self, crop_areas: &[f64], coefficient: fn(&CropCoefficients) -> f64) -> f64 {
        crop_areas
            .iter()
            .zip(self.params.crops())
            .map(|(a, crop)| a * coefficient(crop))
            .sum()
    }

    /// Demand-curve price for the given production.
    pub fn demand_price(&self, production: &[f64]) -> Vec<f64> {
        production
            .iter()
            .zip(&self.baseline_production)
            .zip(&self.baseline_price)
            .map(|((y, y0), p0)| p0 * (1.0 + (y / y0 - 1.0) / self.options.elasticity))
            .collect()
    }

    /// Total margin Σ_c (p_c·Y_c − C_c)·Σ_s x[s,c] [$M/yr].
    pub fn margin(&self, flat: &[f64]) -> f64 {
        let (allocation, _, price) = self.layout.split(flat);
        self.crop_areas(allocation)
            .iter()
            .zip(self.params.crops())
            .zip(price)
            .map(|((area, crop), p)| area * (p * crop.yield_per_area - crop.cost))
            .sum()
    }

    /// Gradient of [`margin`](Self::margin):
    /// ∂/∂x[s,c] = p_c·Y_c − C_c, ∂/∂y_c = 0, ∂/∂p_c = Y_c·Σ_s x[s,c].
    pub fn margin_gradient(&self, flat: &[f64]) -> Vec<f64> {
        let (allocation, _, price) = self.layout.split(flat);
        let crops = self.params.crops();
        let mut grad = vec![0.0; self.layout.dimension()];
        for s in 0..self.layout.subdivisions() {
            for (c, crop) in crops.iter().enumerate() {
                grad[self.layout.allocation_index(s, c)] = price[c] * crop.yield_per_area - crop.cost;
            }
        }
        let price_offset = self.layout.price_offset();
        for (c, (area, crop)) in self.crop_areas(allocation).iter().zip(crops).enumerate() {
            grad[price_offset + c] = crop.yield_per_area * area;
        }
        grad
    }
}

impl NlpProblem for PriceResponsiveProblem<'_> {
    fn dimension(&self) -> usize {
        self.layout.dimension()
    }

    /// Baseline allocation, production and price.
    fn initial_point(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.layout.dimension());
        v.extend_from_slice(self.params.baseline().as_slice());
        v.extend_from_slice(&self.baseline_production);
        v.extend_from_slice(&self.baseline_price);
        v
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.layout.dimension();
        (vec![0.0; n], vec![f64::INFINITY; n])
    }

    fn objective(&self, x: &[f64]) -> f64 {
        -self.margin(x)
    }

    fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
        Some(self.margin_gradient(x).into_iter().map(|g| -g).collect())
    }

    fn constraints(&self) -> &[ConstraintSpec] {
        &self.specs
    }

    fn evaluate_constraint(&self, index: usize, x: &[f64]) -> Vec<f64> {
        let (allocation, production, price) = self.layout.split(x);
        let crop_areas = || self.crop_areas(allocation);
        let crops = self.params.crops();
        let opts = &self.options;
        match index {
            EXPORT_P => vec![self.allowed.phosphorus - self.load(&crop_areas(), |c| c.export_p)],
            EXPORT_N => vec![self.allowed.nitrogen - self.load(&crop_areas(), |c| c.export_n)],
            WATER => vec![self.allowed.water - self.load(&crop_areas(), |c| c.water)],
            AREA => allocation
                .chunks_exact(self.layout.crops())
                .zip(&self.area)
                .map(|(row, available)| available - row.iter().sum::<f64>())
                .collect(),
            MIN_PRODUCTION => production
                .iter()
                .zip(&self.baseline_production)
                .map(|(y, y0)| y - opts.min_production_ratio * y0)
                .collect(),
            MAX_PRODUCTION => production
                .iter()
                .zip(&self.baseline_production)
                .map(|(y, y0)| opts.max_production_ratio * y0 - y)
                .collect(),
            PRODUCTION => production
                .iter()
                .zip(crop_areas())
                .zip(crops)
                .map(|((y, area), crop)| y - area * crop.yield_per_area)
                .collect(),
            PRICE => price
                .iter()
                .zip(self.demand_price(production))
                .map(|(p, demand)| p - demand)
                .collect(),
            _ => unreachable!(
                "constraint block {index} out of range, the model has {}",
                self.specs.len()
            ),
        }
    }
}

/// Converged solution of one price-responsive scenario.
#[derive(Debug, Clone)]
pub struct PriceResponsiveResult {
    pub scenario: Scenario,
    pub crops: Vec<String>,
    pub decision: DecisionVector,
    /// Total margin [$M/yr]
    pub objective_value: f64,
    pub iterations: usize,
    pub max_violation: f64,
    pub elapsed: Duration,
}

impl PriceResponsiveResult {
    pub fn production_record(&self) -> ProductionRecord {
        ProductionRecord {
            scenario: self.scenario.name(),
            crops: self.crops.clone(),
            production: self.decision.production.clone(),
            objective_value: self.objective_value,
            water_slack: 0.0,
            allocation: Some(self.decision.allocation.clone()),
        }
    }
}

/// `H hour(s), M minute(s), and S seconds`.
pub fn format_processing_time(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total - 3600 * hours) / 60;
    let seconds = total % 60;
    format!("{hours} hour(s), {minutes} minute(s), and {seconds} seconds")
}

/// Solve one (dp, dn) scenario. An unconverged solve is an error, never a
/// result.
pub fn solve_price_responsive(
    params: &BmpParameters,
    scenario: &Scenario,
    backend: &dyn NlpBackend,
    options: &PriceResponsiveOptions,
) -> AgroResult<PriceResponsiveResult> {
    let start = Instant::now();
    let problem = PriceResponsiveProblem::new(params, scenario, options)?;
    let outcome = backend.solve(&problem)?;
    let elapsed = start.elapsed();
    info!(
        scenario = %scenario.name(),
        backend = backend.name(),
        iterations = outcome.iterations,
        "Processing time: {}",
        format_processing_time(elapsed)
    );

    if !outcome.converged() {
        warn!(
            scenario = %scenario.name(),
            max_violation = outcome.max_violation,
            "price-responsive solve did not converge"
        );
        return Err(AgroError::NotConverged {
            iterations: outcome.iterations,
            max_violation: outcome.max_violation,
        });
    }

    let decision = problem.layout().unpack(&outcome.x)?;
    let objective_value = -outcome.objective_value;
    info!(scenario = %scenario.name(), objective = objective_value, "Objective function");
    Ok(PriceResponsiveResult {
        scenario: *scenario,
        crops: params.crops().iter().map(|c| c.name.clone()).collect(),
        decision,
        objective_value,
        iterations: outcome.iterations,
        max_violation: outcome.max_violation,
        elapsed,
    })
}
