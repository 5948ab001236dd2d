//! Goal-programming model against the farm case and limit cases.

use agro_algo::lp::{LpModel, LpSolution};
use agro_algo::{
    solve_goal_program, Deviation, EqualityEncoding, GoalModel, GoalProgrammingOptions,
    LpBackend, LpSolverKind, LpStatus,
};
use agro_core::{ActivityCoefficients, AgroResult, GoalParameters, GoalWeights};

fn opposed() -> GoalProgrammingOptions {
    GoalProgrammingOptions::default()
}

fn native() -> GoalProgrammingOptions {
    GoalProgrammingOptions {
        encoding: EqualityEncoding::Native,
    }
}

fn zero_weights() -> GoalWeights {
    GoalWeights::uniform(0.0)
}

#[test]
fn ireland_case_is_optimal() {
    let solution =
        solve_goal_program(&GoalParameters::ireland(), &LpSolverKind::Microlp, opposed()).unwrap();

    assert_eq!(solution.status, LpStatus::Optimal);
    assert!(solution.objective_value.is_finite());
    assert!(solution.activities.iter().all(|v| *v >= -1e-9));
    assert!(solution.deviations.iter().all(|v| *v >= -1e-9));

    let record = solution.record();
    assert_eq!(record.entries().len(), 18);
    assert!(record.get("grass").is_some());
    assert!(record.get("d_cow_plus").is_some());
}

#[test]
fn ireland_plan_respects_land() {
    let params = GoalParameters::ireland();
    let solution = solve_goal_program(&params, &LpSolverKind::Microlp, opposed()).unwrap();
    let [grass, wheat, cow] = solution.activities;
    let used = grass + wheat + params.coefficients.area_per_head * cow;
    assert!(used <= params.targets.available_area + 1e-6);
}

#[test]
fn equality_encodings_reach_the_same_optimum() {
    let params = GoalParameters::ireland();
    let a = solve_goal_program(&params, &LpSolverKind::Microlp, opposed()).unwrap();
    let b = solve_goal_program(&params, &LpSolverKind::Microlp, native()).unwrap();
    let scale = a.objective_value.abs().max(1.0);
    assert!((a.objective_value - b.objective_value).abs() < 1e-6 * scale);
}

#[test]
fn single_weighted_deviation_absorbs_unreachable_target() {
    let mut params = GoalParameters::ireland().with_weights(GoalWeights {
        deficit_grass_sales: 1.0,
        ..zero_weights()
    });
    params.targets.typical_sales.grass = 1e9;

    let solution = solve_goal_program(&params, &LpSolverKind::Microlp, opposed()).unwrap();
    let grass = solution.activity("grass").unwrap();
    let shortfall = solution.deviation(Deviation::SalesGrassMinus);

    // all land goes to grass; the remaining gap sits in the one weighted slack
    assert!((grass - params.targets.available_area).abs() < 1e-4);
    let gap = 1e9 - params.coefficients.sales.grass * grass;
    assert!((shortfall - gap).abs() < 1e-6 * gap);
    assert!((solution.objective_value - shortfall).abs() < 1e-6 * gap);
}

#[test]
fn zero_targets_with_open_caps_give_empty_plan() {
    let mut params = GoalParameters::ireland();
    params.targets.typical_sales = ActivityCoefficients::new(0.0, 0.0, 0.0);
    params.targets.production = ActivityCoefficients::new(0.0, 0.0, 0.0);
    params.targets.organic_fertilizer = 0.0;
    params.targets.budget = f64::INFINITY;
    params.targets.available_area = f64::INFINITY;
    params.targets.max_emission_p = f64::INFINITY;
    params.targets.max_emission_c = f64::INFINITY;
    params.targets.max_chemical = f64::INFINITY;

    for options in [opposed(), native()] {
        let solution = solve_goal_program(&params, &LpSolverKind::Microlp, options).unwrap();
        assert_eq!(solution.status, LpStatus::Optimal);
        assert!(solution.objective_value.abs() < 1e-9);
        assert!(solution.activities.iter().all(|v| v.abs() < 1e-9));
        assert!(solution.deviations.iter().all(|v| v.abs() < 1e-9));
    }
}

#[test]
fn open_caps_drop_their_rows() {
    let mut params = GoalParameters::ireland();
    params.targets.budget = f64::INFINITY;
    let model = GoalModel::build(&params, opposed()).unwrap();
    assert!(model.lp().constraint("cost").is_none());
    assert!(model.lp().constraint("area").is_some());
}

/// Solves with microlp but reports the point without an optimality proof.
struct UncertifiedBackend;

impl LpBackend for UncertifiedBackend {
    fn name(&self) -> &'static str {
        "uncertified"
    }

    fn solve(&self, model: &LpModel) -> AgroResult<LpSolution> {
        let solution = LpSolverKind::Microlp.solve(model)?;
        Ok(LpSolution {
            status: LpStatus::Feasible,
            ..solution
        })
    }
}

#[test]
fn feasible_status_is_reported_as_such() {
    let solution =
        solve_goal_program(&GoalParameters::ireland(), &UncertifiedBackend, opposed()).unwrap();
    assert_eq!(solution.status, LpStatus::Feasible);
    assert_eq!(solution.status.as_str(), "FEASIBLE");
}

#[test]
fn inconsistent_land_is_infeasible_not_a_record() {
    let mut params = GoalParameters::ireland();
    params.targets.available_area = -10.0;
    let err = solve_goal_program(&params, &LpSolverKind::Microlp, opposed()).unwrap_err();
    assert_eq!(err.kind(), "infeasible");
}
