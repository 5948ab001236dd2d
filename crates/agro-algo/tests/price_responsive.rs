//! Price-responsive BMP model: codec, solver contract and end-to-end solve.

use agro_algo::nlp::{NlpStatus, PenaltyLbfgs};
use agro_algo::{
    solve_price_responsive, DecisionVector, GradientMode, NlpBackend, NlpOutcome, NlpProblem,
    NlpSolverConfig, PriceResponsiveOptions, PriceResponsiveProblem, VariableLayout,
};
use agro_core::{AgroResult, AllocationMatrix, BmpParameters, CropCoefficients, Scenario};
use std::time::Duration;

fn watershed() -> BmpParameters {
    let crop = |name: &str, p: f64, n: f64, y: f64, cost: f64, price: f64| CropCoefficients {
        name: name.into(),
        export_p: p,
        export_n: n,
        water: 1.0,
        yield_per_area: y,
        cost,
        price,
    };
    BmpParameters::new(
        vec![
            crop("corn", 2.0, 10.0, 10.0, 1.0, 0.3),
            crop("soy", 0.8, 2.0, 4.0, 0.5, 0.4),
        ],
        vec!["upper".into(), "lower".into()],
        AllocationMatrix::from_rows(&[vec![3.0, 1.0], vec![2.0, 2.0]]).unwrap(),
    )
    .unwrap()
}

#[test]
fn pack_unpack_is_exact_for_odd_shapes() {
    for (subdivisions, crops) in [(1, 1), (3, 2), (5, 7), (0, 4)] {
        let layout = VariableLayout::new(subdivisions, crops);
        let values: Vec<f64> = (0..subdivisions * crops)
            .map(|i| (i as f64 + 0.1).sqrt() * std::f64::consts::PI)
            .collect();
        let decision = DecisionVector {
            allocation: AllocationMatrix::from_row_major(subdivisions, crops, values).unwrap(),
            production: (0..crops).map(|c| 1.0 / (c as f64 + 3.0)).collect(),
            price: (0..crops).map(|c| 1e-300 * (c as f64 + 1.0)).collect(),
        };
        let flat = layout.pack(&decision).unwrap();
        assert_eq!(flat.len(), layout.dimension());
        let back = layout.unpack(&flat).unwrap();
        assert_eq!(back, decision);
    }
}

#[test]
fn pack_rejects_mismatched_blocks() {
    let layout = VariableLayout::new(2, 2);
    let decision = DecisionVector {
        allocation: AllocationMatrix::zeros(2, 2),
        production: vec![0.0; 3],
        price: vec![0.0; 2],
    };
    assert!(layout.pack(&decision).is_err());
}

/// Reports a fixed outcome without iterating.
struct Scripted {
    status: NlpStatus,
    x: Option<Vec<f64>>,
}

impl NlpBackend for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn solve(&self, problem: &dyn NlpProblem) -> AgroResult<NlpOutcome> {
        let x = self.x.clone().unwrap_or_else(|| problem.initial_point());
        Ok(NlpOutcome {
            status: self.status,
            objective_value: problem.objective(&x),
            max_violation: problem.max_violation(&x),
            x,
            iterations: 3,
            elapsed: Duration::ZERO,
        })
    }
}

#[test]
fn non_convergence_is_an_error_not_a_result() {
    let params = watershed();
    let backend = Scripted {
        status: NlpStatus::NotConverged,
        x: None,
    };
    let err = solve_price_responsive(
        &params,
        &Scenario::baseline(),
        &backend,
        &PriceResponsiveOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "not-converged");
}

#[test]
fn converged_point_is_unpacked_per_crop() {
    let params = watershed();
    let backend = Scripted {
        status: NlpStatus::Converged,
        x: None,
    };
    let result = solve_price_responsive(
        &params,
        &Scenario::baseline(),
        &backend,
        &PriceResponsiveOptions::default(),
    )
    .unwrap();

    assert_eq!(result.crops, vec!["corn", "soy"]);
    assert_eq!(result.decision.production, params.baseline_production());
    assert_eq!(result.decision.price, params.baseline_price());
    assert_eq!(&result.decision.allocation, params.baseline());
    // margin at baseline: corn 5·(0.3·10 − 1) + soy 3·(0.4·4 − 0.5)
    assert!((result.objective_value - 13.3).abs() < 1e-12);

    let record = result.production_record();
    assert_eq!(record.scenario, "P00N00");
    assert_eq!(record.production_of("soy"), Some(12.0));
}

fn assert_solved(params: &BmpParameters, scenario: &Scenario, gradient: GradientMode) {
    let config = NlpSolverConfig {
        gradient,
        ..Default::default()
    };
    let backend = PenaltyLbfgs::new(config.clone());
    let options = PriceResponsiveOptions::default();
    let result = solve_price_responsive(params, scenario, &backend, &options)
        .unwrap_or_else(|err| panic!("{} ({}): {err}", scenario.name(), gradient.as_str()));

    let problem = PriceResponsiveProblem::new(params, scenario, &options).unwrap();
    let flat = problem.layout().pack(&result.decision).unwrap();
    assert!(problem.max_violation(&flat) < config.tolerance * 10.0);
    assert!((problem.margin(&flat) - result.objective_value).abs() < 1e-9);

    // price sits on the demand curve at the returned production
    let demand = problem.demand_price(&result.decision.production);
    for (price, expected) in result.decision.price.iter().zip(&demand) {
        assert!((price - expected).abs() < 1e-4, "price {price} vs demand {expected}");
    }

    // with no caps the baseline is feasible, so the optimum cannot be worse
    if scenario.cap_p == 0.0 && scenario.cap_n == 0.0 {
        let baseline_margin = problem.margin(&problem.initial_point());
        assert!(
            result.objective_value >= baseline_margin - 1e-6,
            "{} < baseline {}",
            result.objective_value,
            baseline_margin
        );
    }
}

#[test]
fn penalty_solver_converges_on_capped_scenarios() {
    let params = watershed();
    for scenario in [
        Scenario::baseline(),
        Scenario::new(0.1, 0.0).unwrap(),
        Scenario::new(0.2, 0.2).unwrap(),
    ] {
        assert_solved(&params, &scenario, GradientMode::Numerical);
        assert_solved(&params, &scenario, GradientMode::Analytic);
    }
}

#[test]
fn tiny_iteration_budget_is_reported_as_not_converged() {
    let backend = PenaltyLbfgs::new(NlpSolverConfig {
        max_iterations: 5,
        ..Default::default()
    });
    let err = solve_price_responsive(
        &watershed(),
        &Scenario::new(0.1, 0.0).unwrap(),
        &backend,
        &PriceResponsiveOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "not-converged", "{err}");
}
