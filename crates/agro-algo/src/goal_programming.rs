//! Goal-programming model for a single farm (grass, wheat, cattle).
//!
//! Every target except land is soft. Its gap is carried by nonnegative
//! deviation variables and the objective minimises their weighted sum:
//!
//! ```text
//! min  Σ w_k · d_k
//! s.t. s_a·x_a + d⁻_sales,a            >= T_sales,a       a ∈ {grass, wheat, cow}
//!      Σ c_a·x_a − d⁺_cost             <= budget
//!      grass + wheat + h·cow           <= area            (hard)
//!      Σ eP_a·x_a − d⁺_P               <= maxP
//!      Σ eC_a·x_a − d⁺_C               <= maxC
//!      of_g·grass + of_w·wheat − of_c·cow + d⁻_OF − d⁺_OF = T_OF
//!      Σ cf_a·x_a − d⁺_CF              <= maxCF
//!      y_a·x_a + d⁻_prod,a − d⁺_prod,a   = T_prod,a
//! ```
//!
//! Balance rows go through [`LpModel::add_balance`] so they can be emitted as
//! a pair of opposed inequalities or as one equality row.

use crate::lp::{
    Comparison, EqualityEncoding, LinearExpr, LpBackend, LpModel, LpStatus, Sense, VarId,
};
use agro_core::{
    ActivityCoefficients, AgroError, AgroResult, GoalParameters, GoalWeights, ResultEntry,
    ResultRecord,
};
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Farm activities, in declaration order.
pub const ACTIVITIES: [&str; 3] = ["grass", "wheat", "cow"];

/// One deviation variable of the farm model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deviation {
    SalesGrassMinus,
    SalesWheatMinus,
    SalesCowMinus,
    CostPlus,
    EmissionPPlus,
    EmissionCPlus,
    OrganicMinus,
    OrganicPlus,
    ChemicalPlus,
    GrassMinus,
    GrassPlus,
    WheatMinus,
    WheatPlus,
    CowMinus,
    CowPlus,
}

impl Deviation {
    /// Same order as [`GoalWeights::as_array`].
    pub const ALL: [Deviation; 15] = [
        Deviation::SalesGrassMinus,
        Deviation::SalesWheatMinus,
        Deviation::SalesCowMinus,
        Deviation::CostPlus,
        Deviation::EmissionPPlus,
        Deviation::EmissionCPlus,
        Deviation::OrganicMinus,
        Deviation::OrganicPlus,
        Deviation::ChemicalPlus,
        Deviation::GrassMinus,
        Deviation::GrassPlus,
        Deviation::WheatMinus,
        Deviation::WheatPlus,
        Deviation::CowMinus,
        Deviation::CowPlus,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Variable name in the LP and in result records.
    pub fn name(self) -> &'static str {
        match self {
            Deviation::SalesGrassMinus => "d_sales_grass_minus",
            Deviation::SalesWheatMinus => "d_sales_wheat_minus",
            Deviation::SalesCowMinus => "d_sales_cow_minus",
            Deviation::CostPlus => "d_cost_plus",
            Deviation::EmissionPPlus => "d_emission_p_plus",
            Deviation::EmissionCPlus => "d_emission_c_plus",
            Deviation::OrganicMinus => "d_of_minus",
            Deviation::OrganicPlus => "d_of_plus",
            Deviation::ChemicalPlus => "d_cf_plus",
            Deviation::GrassMinus => "d_grass_minus",
            Deviation::GrassPlus => "d_grass_plus",
            Deviation::WheatMinus => "d_wheat_minus",
            Deviation::WheatPlus => "d_wheat_plus",
            Deviation::CowMinus => "d_cow_minus",
            Deviation::CowPlus => "d_cow_plus",
        }
    }

    pub fn weight(self, weights: &GoalWeights) -> f64 {
        weights.as_array()[self.index()]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoalProgrammingOptions {
    pub encoding: EqualityEncoding,
}

/// The farm LP plus handles to its variables.
#[derive(Debug, Clone)]
pub struct GoalModel {
    lp: LpModel,
    activities: [VarId; 3],
    deviations: [VarId; 15],
}

impl GoalModel {
    pub fn build(params: &GoalParameters, options: GoalProgrammingOptions) -> AgroResult<Self> {
        validate(params)?;
        let coef = &params.coefficients;
        let targets = &params.targets;
        let mut lp = LpModel::new("goal-programming");

        let activities = ACTIVITIES.map(|name| lp.add_variable(name, 0.0, f64::INFINITY));
        let deviations =
            Deviation::ALL.map(|d| lp.add_variable(d.name(), 0.0, f64::INFINITY));
        let [grass, wheat, cow] = activities;
        let dev = |d: Deviation| deviations[d.index()];
        let activity_expr = |c: &ActivityCoefficients| {
            LinearExpr::new()
                .term(grass, c.grass)
                .term(wheat, c.wheat)
                .term(cow, c.cow)
        };

        // sales: each activity against its typical earnings
        let sales_rows = [
            ("sales_grass", Deviation::SalesGrassMinus),
            ("sales_wheat", Deviation::SalesWheatMinus),
            ("sales_cow", Deviation::SalesCowMinus),
        ];
        let sales = coef.sales.as_array();
        let sales_targets = targets.typical_sales.as_array();
        for (a, (name, minus)) in sales_rows.into_iter().enumerate() {
            add_soft_row(
                &mut lp,
                name,
                LinearExpr::new()
                    .term(activities[a], sales[a])
                    .term(dev(minus), 1.0),
                Comparison::Ge,
                sales_targets[a],
            );
        }

        add_soft_row(
            &mut lp,
            "cost",
            activity_expr(&coef.cost).term(dev(Deviation::CostPlus), -1.0),
            Comparison::Le,
            targets.budget,
        );

        add_soft_row(
            &mut lp,
            "area",
            LinearExpr::new()
                .term(grass, 1.0)
                .term(wheat, 1.0)
                .term(cow, coef.area_per_head),
            Comparison::Le,
            targets.available_area,
        );

        add_soft_row(
            &mut lp,
            "emission_p",
            activity_expr(&coef.emission_p).term(dev(Deviation::EmissionPPlus), -1.0),
            Comparison::Le,
            targets.max_emission_p,
        );
        add_soft_row(
            &mut lp,
            "emission_c",
            activity_expr(&coef.emission_c).term(dev(Deviation::EmissionCPlus), -1.0),
            Comparison::Le,
            targets.max_emission_c,
        );

        // manure from cattle offsets the crops' organic fertilizer demand
        let of = &coef.organic_fertilizer;
        lp.add_balance(
            "organic_fertilizer",
            LinearExpr::new()
                .term(grass, of.grass)
                .term(wheat, of.wheat)
                .term(cow, -of.cow)
                .term(dev(Deviation::OrganicMinus), 1.0)
                .term(dev(Deviation::OrganicPlus), -1.0),
            targets.organic_fertilizer,
            options.encoding,
        );

        add_soft_row(
            &mut lp,
            "chemical_fertilizer",
            activity_expr(&coef.chemical_fertilizer).term(dev(Deviation::ChemicalPlus), -1.0),
            Comparison::Le,
            targets.max_chemical,
        );

        let production_rows = [
            ("production_grass", Deviation::GrassMinus, Deviation::GrassPlus),
            ("production_wheat", Deviation::WheatMinus, Deviation::WheatPlus),
            ("production_cow", Deviation::CowMinus, Deviation::CowPlus),
        ];
        let yields = coef.yield_rate.as_array();
        let production_targets = targets.production.as_array();
        for (a, (name, minus, plus)) in production_rows.into_iter().enumerate() {
            lp.add_balance(
                name,
                LinearExpr::new()
                    .term(activities[a], yields[a])
                    .term(dev(minus), 1.0)
                    .term(dev(plus), -1.0),
                production_targets[a],
                options.encoding,
            );
        }

        let mut objective = LinearExpr::new();
        for d in Deviation::ALL {
            objective.add_term(dev(d), d.weight(&params.weights));
        }
        lp.set_objective(Sense::Minimize, objective);

        Ok(Self {
            lp,
            activities,
            deviations,
        })
    }

    pub fn lp(&self) -> &LpModel {
        &self.lp
    }

    pub fn solve(&self, backend: &dyn LpBackend) -> AgroResult<GoalSolution> {
        let solution = backend.solve(&self.lp)?;
        Ok(GoalSolution {
            status: solution.status,
            activities: self.activities.map(|v| solution.value(v)),
            deviations: self.deviations.map(|v| solution.value(v)),
            objective_value: solution.objective_value,
        })
    }
}

/// Rows with an infinite right-hand side can never bind and are left out.
fn add_soft_row(lp: &mut LpModel, name: &str, expr: LinearExpr, cmp: Comparison, rhs: f64) {
    let always_true = match cmp {
        Comparison::Le => rhs == f64::INFINITY,
        Comparison::Ge => rhs == f64::NEG_INFINITY,
        Comparison::Eq => false,
    };
    if !always_true {
        lp.add_constraint(name, expr, cmp, rhs);
    }
}

fn validate(params: &GoalParameters) -> AgroResult<()> {
    if !params.weights.is_valid() {
        return Err(AgroError::Validation(
            "goal weights must be finite and nonnegative".into(),
        ));
    }
    let c = &params.coefficients;
    let coefficient_tables = [
        ("sales", &c.sales),
        ("cost", &c.cost),
        ("emission_p", &c.emission_p),
        ("emission_c", &c.emission_c),
        ("organic_fertilizer", &c.organic_fertilizer),
        ("chemical_fertilizer", &c.chemical_fertilizer),
        ("yield", &c.yield_rate),
    ];
    for (name, table) in coefficient_tables {
        if [table.grass, table.wheat, table.cow]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(AgroError::Validation(format!(
                "coefficient table '{name}' has a non-finite entry"
            )));
        }
    }
    if !c.area_per_head.is_finite() {
        return Err(AgroError::Validation("area_per_head must be finite".into()));
    }
    let t = &params.targets;
    let balances = [
        t.organic_fertilizer,
        t.production.grass,
        t.production.wheat,
        t.production.cow,
    ];
    if balances.iter().any(|v| !v.is_finite()) {
        return Err(AgroError::Validation(
            "balance targets (organic fertilizer, production) must be finite".into(),
        ));
    }
    let others = [
        t.typical_sales.grass,
        t.typical_sales.wheat,
        t.typical_sales.cow,
        t.available_area,
        t.budget,
        t.max_emission_p,
        t.max_emission_c,
        t.max_chemical,
    ];
    if others.iter().any(|v| v.is_nan()) {
        return Err(AgroError::Validation("targets must not be NaN".into()));
    }
    Ok(())
}

/// Solved farm plan.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSolution {
    pub status: LpStatus,
    /// grass [Ha], wheat [Ha], cow [heads]
    pub activities: [f64; 3],
    pub deviations: [f64; 15],
    pub objective_value: f64,
}

impl GoalSolution {
    pub fn deviation(&self, d: Deviation) -> f64 {
        self.deviations[d.index()]
    }

    pub fn activity(&self, name: &str) -> Option<f64> {
        ACTIVITIES
            .iter()
            .position(|a| *a == name)
            .map(|i| self.activities[i])
    }

    pub fn record(&self) -> ResultRecord {
        let activities = ACTIVITIES
            .iter()
            .zip(self.activities)
            .map(|(name, value)| ResultEntry {
                name: (*name).to_string(),
                value,
            });
        let deviations = Deviation::ALL.iter().map(|d| ResultEntry {
            name: d.name().to_string(),
            value: self.deviation(*d),
        });
        ResultRecord::new(activities.chain(deviations).collect(), self.objective_value)
    }

    /// Plain-text summary of the plan and every deviation.
    pub fn report(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_report(&mut out);
        out
    }

    /// Write the summary returned by [`report`](Self::report) into any writer.
    pub fn write_report(&self, out: &mut impl fmt::Write) -> fmt::Result {
        const RULE: &str = "-----------------------------";
        let d = |dev: Deviation| self.deviation(dev);
        let [grass, wheat, cow] = self.activities;

        writeln!(out, "Status: {}", self.status.as_str())?;
        writeln!(out, "Objective value (€/year): {:.3}", self.objective_value)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Grass (Ha) = \t {grass:.3}")?;
        writeln!(out, "Wheat (Ha) = \t {wheat:.3}")?;
        writeln!(out, "Cow (Heads) = \t {cow:.3}")?;

        let sections: [&[(&str, Deviation)]; 3] = [
            &[
                ("Loss in grass sales (€/year)", Deviation::SalesGrassMinus),
                ("Loss in wheat sales (€/year)", Deviation::SalesWheatMinus),
                ("Loss in cow sales (€/year)", Deviation::SalesCowMinus),
                ("Exceedance of costs (€/year)", Deviation::CostPlus),
            ],
            &[
                ("Exceedance in emissions of P (kg/year)", Deviation::EmissionPPlus),
                ("Exceedance in emissions of C (kg/year)", Deviation::EmissionCPlus),
            ],
            &[
                ("Exceedance of Organic Fertilizer (kg/year)", Deviation::OrganicPlus),
                ("Deficit of Organic Fertilizer (kg/year)", Deviation::OrganicMinus),
                ("Exceedance of Chemical Fertilizer (kg/year)", Deviation::ChemicalPlus),
            ],
        ];
        for section in sections {
            writeln!(out, "{RULE}")?;
            for (label, dev) in section {
                writeln!(out, "{label}: {:.3}", d(*dev))?;
            }
        }

        writeln!(out, "{RULE}")?;
        for (crop, plus, minus) in [
            ("grass", Deviation::GrassPlus, Deviation::GrassMinus),
            ("wheat", Deviation::WheatPlus, Deviation::WheatMinus),
            ("cow", Deviation::CowPlus, Deviation::CowMinus),
        ] {
            writeln!(out, "Exceedance in supply ({crop}): {:.3}", d(plus))?;
            writeln!(out, "Deficit in supply ({crop}): {:.3}", d(minus))?;
        }
        Ok(())
    }
}

/// Build and solve the farm model in one call.
pub fn solve_goal_program(
    params: &GoalParameters,
    backend: &dyn LpBackend,
    options: GoalProgrammingOptions,
) -> AgroResult<GoalSolution> {
    let start = Instant::now();
    let model = GoalModel::build(params, options)?;
    let solution = model.solve(backend)?;
    info!(
        backend = backend.name(),
        status = solution.status.as_str(),
        objective = solution.objective_value,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "goal program solved"
    );
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::LpSolverKind;

    #[test]
    fn deviation_order_matches_weight_order() {
        let weights = GoalWeights {
            exceed_cf: 7.0,
            deficit_prod_cow: 3.0,
            ..GoalWeights::uniform(0.0)
        };
        assert_eq!(Deviation::ChemicalPlus.weight(&weights), 7.0);
        assert_eq!(Deviation::CowMinus.weight(&weights), 3.0);
        assert_eq!(Deviation::CowPlus.weight(&weights), 0.0);
        for (i, d) in Deviation::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn model_has_fifteen_deviations_and_opposed_balances() {
        let model =
            GoalModel::build(&GoalParameters::ireland(), GoalProgrammingOptions::default())
                .unwrap();
        assert_eq!(model.lp().num_variables(), 18);
        // 3 sales + cost + area + P + C + 2 OF + CF + 6 production
        assert_eq!(model.lp().constraints().len(), 16);
        assert!(model.lp().constraint("organic_fertilizer_ge").is_some());
        assert!(model.lp().constraint("production_cow_le").is_some());
    }

    #[test]
    fn native_encoding_emits_single_rows() {
        let model = GoalModel::build(
            &GoalParameters::ireland(),
            GoalProgrammingOptions {
                encoding: EqualityEncoding::Native,
            },
        )
        .unwrap();
        assert_eq!(model.lp().constraints().len(), 12);
        assert_eq!(
            model.lp().constraint("production_grass").unwrap().cmp,
            Comparison::Eq
        );
    }

    #[test]
    fn negative_weight_fails_fast() {
        let params = GoalParameters::ireland().with_weights(GoalWeights {
            exceed_p: -0.1,
            ..GoalWeights::reference()
        });
        let err = GoalModel::build(&params, GoalProgrammingOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn negative_area_is_infeasible() {
        let mut params = GoalParameters::ireland();
        params.targets.available_area = -10.0;
        let err = solve_goal_program(
            &params,
            &LpSolverKind::Microlp,
            GoalProgrammingOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "infeasible");
    }

    #[test]
    fn record_lists_activities_then_deviations() {
        let solution = solve_goal_program(
            &GoalParameters::ireland(),
            &LpSolverKind::Microlp,
            GoalProgrammingOptions::default(),
        )
        .unwrap();
        let record = solution.record();
        assert_eq!(record.entries().len(), 18);
        assert_eq!(record.entries()[0].name, "grass");
        assert_eq!(record.entries()[3].name, "d_sales_grass_minus");
        assert_eq!(record.objective_value(), solution.objective_value);
        assert!(solution.report().contains("Deficit in supply (cow)"));
    }

    #[test]
    fn write_report_matches_report_text() {
        let solution = solve_goal_program(
            &GoalParameters::ireland(),
            &LpSolverKind::Microlp,
            GoalProgrammingOptions::default(),
        )
        .unwrap();
        let mut out = String::new();
        solution.write_report(&mut out).unwrap();
        assert_eq!(out, solution.report());
        let sales = out.find("Loss in grass sales").unwrap();
        let supply = out.find("Deficit in supply (grass)").unwrap();
        assert!(sales < supply);
    }
}
