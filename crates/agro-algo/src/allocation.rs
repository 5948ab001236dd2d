//! Linear BMP allocation model.
//!
//! Land is reallocated across subdivisions and crops to maximise margin under
//! phosphorus and nitrogen export caps, a water budget and per-crop production
//! bounds:
//!
//! ```text
//! max  Σ_s Σ_c (p_c·Y_c − C_c)·x[s,c] + k_w·w
//! s.t. Σ Pexp_c·x[s,c]  <= (1 − capP)·P0
//!      Σ Nexp_c·x[s,c]  <= (1 − capN)·N0
//!      Σ W_c·x[s,c]     <= W0 + w
//!      Σ_c x[s,c]       <= A_s                        ∀ s
//!      Σ_s Y_c·x[s,c]    = y[c]                       ∀ c
//!      lo·y0_c <= y[c] <= hi·y0_c                     ∀ c
//! ```
//!
//! The water slack `w` is always declared; without water available its upper
//! bound is pinned to zero.

use crate::lp::{
    Comparison, EqualityEncoding, LinearExpr, LpBackend, LpModel, LpStatus, Sense, VarId,
};
use agro_core::{
    AgroError, AgroResult, AllocationMatrix, BmpParameters, CropCoefficients, ProductionRecord,
    Scenario,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationOptions {
    /// Lower production bound as a fraction of baseline
    pub min_production_ratio: f64,
    /// Upper production bound as a fraction of baseline
    pub max_production_ratio: f64,
    /// Allow drawing water beyond the baseline use
    pub water_available: bool,
    /// Objective coefficient of the water slack [$M/thousand-m³], added to
    /// the maximized margin as is: a price paid for extra water is negative.
    /// Positive values are rejected when water is available, the slack would
    /// be unbounded.
    pub water_cost: f64,
    pub encoding: EqualityEncoding,
    /// Return the full subdivision × crop allocation with each record
    pub keep_allocation: bool,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        Self {
            min_production_ratio: 0.5,
            max_production_ratio: 1.5,
            water_available: false,
            water_cost: 0.0,
            encoding: EqualityEncoding::OpposedInequalities,
            keep_allocation: false,
        }
    }
}

impl AllocationOptions {
    pub fn validate(&self) -> AgroResult<()> {
        let (lo, hi) = (self.min_production_ratio, self.max_production_ratio);
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || lo > hi {
            return Err(AgroError::Validation(format!(
                "production ratios must satisfy 0 <= min <= max, got min={lo} max={hi}"
            )));
        }
        if !self.water_cost.is_finite() {
            return Err(AgroError::Validation("water cost must be finite".into()));
        }
        if self.water_available && self.water_cost > 0.0 {
            return Err(AgroError::Validation(format!(
                "water cost {} would reward unlimited water use; use a negative value to charge for it",
                self.water_cost
            )));
        }
        Ok(())
    }
}

/// One scenario's LP with handles to its variable blocks.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    lp: LpModel,
    scenario: Scenario,
    /// Row-major by subdivision.
    allocation: Vec<VarId>,
    production: Vec<VarId>,
    water: VarId,
    shape: (usize, usize),
}

impl AllocationModel {
    pub fn build(
        params: &BmpParameters,
        scenario: &Scenario,
        options: &AllocationOptions,
    ) -> AgroResult<Self> {
        options.validate()?;
        let crops = params.crops();
        let subdivisions = params.subdivisions();
        let (rows, cols) = (subdivisions.len(), crops.len());
        let mut lp = LpModel::new(format!("bmp-allocation-{}", scenario.name()));

        let mut allocation = Vec::with_capacity(rows * cols);
        for sub in subdivisions {
            for crop in crops {
                allocation.push(lp.add_variable(
                    format!("x[{},{}]", sub, crop.name),
                    0.0,
                    f64::INFINITY,
                ));
            }
        }
        let production: Vec<VarId> = crops
            .iter()
            .map(|crop| lp.add_variable(format!("y[{}]", crop.name), 0.0, f64::INFINITY))
            .collect();
        let water_upper = if options.water_available {
            f64::INFINITY
        } else {
            0.0
        };
        let water = lp.add_variable("w", 0.0, water_upper);

        let x = |s: usize, c: usize| allocation[s * cols + c];
        let per_area = |coefficient: fn(&CropCoefficients) -> f64| {
            let mut expr = LinearExpr::new();
            for s in 0..rows {
                for (c, crop) in crops.iter().enumerate() {
                    expr.add_term(x(s, c), coefficient(crop));
                }
            }
            expr
        };

        let mut objective = per_area(|crop| crop.price * crop.yield_per_area - crop.cost);
        objective.add_term(water, options.water_cost);
        lp.set_objective(Sense::Maximize, objective);

        let allowed = scenario.allowed(&params.baseline_loads());
        lp.add_constraint(
            "export_p",
            per_area(|crop| crop.export_p),
            Comparison::Le,
            allowed.phosphorus,
        );
        lp.add_constraint(
            "export_n",
            per_area(|crop| crop.export_n),
            Comparison::Le,
            allowed.nitrogen,
        );
        lp.add_constraint(
            "water",
            per_area(|crop| crop.water).term(water, -1.0),
            Comparison::Le,
            allowed.water,
        );

        for (s, (sub, available)) in subdivisions
            .iter()
            .zip(params.available_area())
            .enumerate()
        {
            let mut expr = LinearExpr::new();
            for c in 0..cols {
                expr.add_term(x(s, c), 1.0);
            }
            lp.add_constraint(format!("area[{sub}]"), expr, Comparison::Le, available);
        }

        let baseline_production = params.baseline_production();
        for (c, crop) in crops.iter().enumerate() {
            let mut expr = LinearExpr::new();
            for s in 0..rows {
                expr.add_term(x(s, c), crop.yield_per_area);
            }
            expr.add_term(production[c], -1.0);
            lp.add_balance(
                &format!("production[{}]", crop.name),
                expr,
                0.0,
                options.encoding,
            );

            let y = LinearExpr::new().term(production[c], 1.0);
            lp.add_constraint(
                format!("min_production[{}]", crop.name),
                y.clone(),
                Comparison::Ge,
                options.min_production_ratio * baseline_production[c],
            );
            lp.add_constraint(
                format!("max_production[{}]", crop.name),
                y,
                Comparison::Le,
                options.max_production_ratio * baseline_production[c],
            );
        }

        Ok(Self {
            lp,
            scenario: *scenario,
            allocation,
            production,
            water,
            shape: (rows, cols),
        })
    }

    pub fn lp(&self) -> &LpModel {
        &self.lp
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn solve(&self, backend: &dyn LpBackend) -> AgroResult<AllocationSolution> {
        let solution = backend.solve(&self.lp)?;
        let (rows, cols) = self.shape;
        let allocation = AllocationMatrix::from_row_major(
            rows,
            cols,
            self.allocation.iter().map(|v| solution.value(*v)).collect(),
        )?;
        Ok(AllocationSolution {
            status: solution.status,
            allocation,
            production: self.production.iter().map(|v| solution.value(*v)).collect(),
            water_slack: solution.value(self.water),
            objective_value: solution.objective_value,
        })
    }
}

/// Raw solved values of one allocation LP.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSolution {
    pub status: LpStatus,
    /// [thousand-Ha], subdivision × crop
    pub allocation: AllocationMatrix,
    /// [Ton/yr] per crop
    pub production: Vec<f64>,
    /// Additional water [thousand-m³/yr]
    pub water_slack: f64,
    /// [$M/yr]
    pub objective_value: f64,
}

impl AllocationSolution {
    pub fn into_record(
        self,
        scenario: &Scenario,
        params: &BmpParameters,
        keep_allocation: bool,
    ) -> ProductionRecord {
        ProductionRecord {
            scenario: scenario.name(),
            crops: params.crops().iter().map(|c| c.name.clone()).collect(),
            production: self.production,
            objective_value: self.objective_value,
            water_slack: self.water_slack,
            allocation: keep_allocation.then_some(self.allocation),
        }
    }
}

/// Build, solve and extract one scenario.
pub fn solve_allocation(
    params: &BmpParameters,
    scenario: &Scenario,
    backend: &dyn LpBackend,
    options: &AllocationOptions,
) -> AgroResult<ProductionRecord> {
    let start = Instant::now();
    let model = AllocationModel::build(params, scenario, options)?;
    let solution = model.solve(backend)?;
    info!(
        scenario = %scenario.name(),
        status = solution.status.as_str(),
        additional_water = %format!("{:.3}", solution.water_slack),
        utility = %format!("{:.3}", solution.objective_value),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "solution found for reduction {:.0}P%, {:.0}N%",
        scenario.cap_p * 100.0,
        scenario.cap_n * 100.0
    );
    Ok(solution.into_record(scenario, params, options.keep_allocation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::LpSolverKind;

    /// Two subdivisions, a profitable high-P crop and a marginal low-P crop.
    fn params() -> BmpParameters {
        let crops = vec![
            CropCoefficients {
                name: "corn".into(),
                export_p: 2.0,
                export_n: 1.0,
                water: 1.0,
                yield_per_area: 10.0,
                cost: 1.0,
                price: 0.5,
            },
            CropCoefficients {
                name: "hay".into(),
                export_p: 0.5,
                export_n: 1.0,
                water: 1.0,
                yield_per_area: 5.0,
                cost: 0.5,
                price: 0.2,
            },
        ];
        let baseline = AllocationMatrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 1.0]]).unwrap();
        BmpParameters::new(crops, vec!["north".into(), "south".into()], baseline).unwrap()
    }

    #[test]
    fn model_layout_follows_subdivision_major_order() {
        let model = AllocationModel::build(
            &params(),
            &Scenario::baseline(),
            &AllocationOptions::default(),
        )
        .unwrap();
        let names: Vec<&str> = model.lp().variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "x[north,corn]",
                "x[north,hay]",
                "x[south,corn]",
                "x[south,hay]",
                "y[corn]",
                "y[hay]",
                "w"
            ]
        );
        assert_eq!(model.lp().variable(model.water).upper, 0.0);
    }

    #[test]
    fn water_slack_is_free_when_water_available() {
        let options = AllocationOptions {
            water_available: true,
            ..AllocationOptions::default()
        };
        let model = AllocationModel::build(&params(), &Scenario::baseline(), &options).unwrap();
        assert!(model.lp().variable(model.water).upper.is_infinite());
    }

    #[test]
    fn phosphorus_cap_binds_and_shifts_land() {
        let p = params();
        let backend = LpSolverKind::Microlp;
        let options = AllocationOptions::default();
        let base = solve_allocation(&p, &Scenario::baseline(), &backend, &options).unwrap();
        let capped =
            solve_allocation(&p, &Scenario::new(0.2, 0.0).unwrap(), &backend, &options).unwrap();

        assert!(capped.objective_value <= base.objective_value + 1e-9);
        // P export of the capped plan stays under 80% of baseline
        let p_export: f64 = capped
            .production
            .iter()
            .zip(p.crops())
            .map(|(y, crop)| y / crop.yield_per_area * crop.export_p)
            .sum();
        assert!(p_export <= 0.8 * p.baseline_loads().phosphorus + 1e-6);
        assert_eq!(capped.scenario, "P20N00");
        assert!(capped.allocation.is_none());
    }

    #[test]
    fn allocation_table_is_kept_on_request() {
        let options = AllocationOptions {
            keep_allocation: true,
            ..AllocationOptions::default()
        };
        let record = solve_allocation(
            &params(),
            &Scenario::baseline(),
            &LpSolverKind::Microlp,
            &options,
        )
        .unwrap();
        let allocation = record.allocation.unwrap();
        assert_eq!((allocation.rows(), allocation.cols()), (2, 2));
        for (sum, available) in allocation.row_sums().iter().zip(params().available_area()) {
            assert!(*sum <= available + 1e-9);
        }
    }

    #[test]
    fn inverted_production_ratios_are_rejected() {
        let options = AllocationOptions {
            min_production_ratio: 1.2,
            max_production_ratio: 0.8,
            ..AllocationOptions::default()
        };
        let err = AllocationModel::build(&params(), &Scenario::baseline(), &options).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn positive_water_cost_with_available_water_is_rejected() {
        let options = AllocationOptions {
            water_available: true,
            water_cost: 0.3,
            ..AllocationOptions::default()
        };
        let err = AllocationModel::build(&params(), &Scenario::baseline(), &options).unwrap_err();
        assert_eq!(err.kind(), "validation");

        // without the slack the coefficient multiplies a variable pinned at 0
        let pinned = AllocationOptions {
            water_available: false,
            ..options.clone()
        };
        assert!(pinned.validate().is_ok());
        let charged = AllocationOptions {
            water_cost: -0.3,
            ..options
        };
        assert!(charged.validate().is_ok());
    }
}
