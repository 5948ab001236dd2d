//! Linear BMP allocation across the capP × capN grid.

use agro_algo::{solve_allocation, AllocationOptions, EqualityEncoding, LpSolverKind};
use agro_core::{AllocationMatrix, BmpParameters, CropCoefficients, Scenario};

/// Three subdivisions, three crops with distinct P/N intensity.
fn watershed() -> BmpParameters {
    let crop = |name: &str, p: f64, n: f64, water: f64, y: f64, cost: f64, price: f64| {
        CropCoefficients {
            name: name.into(),
            export_p: p,
            export_n: n,
            water,
            yield_per_area: y,
            cost,
            price,
        }
    };
    let crops = vec![
        crop("corn", 2.0, 10.0, 3.0, 10.0, 1.0, 0.3),
        crop("soy", 0.8, 2.0, 1.5, 4.0, 0.5, 0.4),
        crop("hay", 0.5, 4.0, 1.0, 6.0, 0.4, 0.12),
    ];
    let baseline = AllocationMatrix::from_rows(&[
        vec![10.0, 5.0, 5.0],
        vec![4.0, 8.0, 8.0],
        vec![6.0, 6.0, 2.0],
    ])
    .unwrap();
    BmpParameters::new(
        crops,
        vec!["north".into(), "centre".into(), "south".into()],
        baseline,
    )
    .unwrap()
}

/// 0.00, 0.02, …, 0.50
fn grid() -> Vec<f64> {
    (0..=25).map(|i| i as f64 * 0.02).collect()
}

#[test]
fn baseline_scenario_keeps_production_band_and_land() {
    let params = watershed();
    let options = AllocationOptions {
        keep_allocation: true,
        ..Default::default()
    };
    let record =
        solve_allocation(&params, &Scenario::baseline(), &LpSolverKind::Microlp, &options).unwrap();

    assert_eq!(record.scenario, "P00N00");
    assert_eq!(record.water_slack, 0.0);
    for (y, y0) in record.production.iter().zip(params.baseline_production()) {
        assert!(*y >= 0.5 * y0 - 1e-6, "{y} below half of {y0}");
        assert!(*y <= 1.5 * y0 + 1e-6, "{y} above 1.5x {y0}");
    }

    let allocation = record.allocation.as_ref().unwrap();
    for (used, available) in allocation.row_sums().iter().zip(params.available_area()) {
        assert!(*used <= available + 1e-6);
    }
    assert!(record.objective_value.is_finite());
}

#[test]
fn tightening_a_cap_never_improves_the_margin() {
    let params = watershed();
    // a 0.4 production floor keeps every grid point strictly feasible
    let options = AllocationOptions {
        min_production_ratio: 0.4,
        ..Default::default()
    };
    let caps = grid();
    let mut objective = vec![vec![0.0; caps.len()]; caps.len()];
    for (j, &cap_n) in caps.iter().enumerate() {
        for (i, &cap_p) in caps.iter().enumerate() {
            let scenario = Scenario::new(cap_p, cap_n).unwrap();
            let record =
                solve_allocation(&params, &scenario, &LpSolverKind::Microlp, &options).unwrap();
            objective[i][j] = record.objective_value;
        }
    }

    let tol = |v: f64| 1e-6 * v.abs().max(1.0);
    for i in 0..caps.len() {
        for j in 0..caps.len() {
            let here = objective[i][j];
            if i + 1 < caps.len() {
                assert!(
                    objective[i + 1][j] <= here + tol(here),
                    "capP {} -> {} at capN {} raised the margin",
                    caps[i],
                    caps[i + 1],
                    caps[j]
                );
            }
            if j + 1 < caps.len() {
                assert!(
                    objective[i][j + 1] <= here + tol(here),
                    "capN {} -> {} at capP {} raised the margin",
                    caps[j],
                    caps[j + 1],
                    caps[i]
                );
            }
        }
    }
}

#[test]
fn default_floor_keeps_monotonicity_where_feasible() {
    let params = watershed();
    let options = AllocationOptions::default();
    let caps = grid();
    // capN = 0.5 pins every crop to its floor; the row is degenerate
    for &cap_n in &caps[..caps.len() - 1] {
        let mut previous = f64::INFINITY;
        for &cap_p in &caps {
            let scenario = Scenario::new(cap_p, cap_n).unwrap();
            let value = match solve_allocation(&params, &scenario, &LpSolverKind::Microlp, &options)
            {
                Ok(record) => record.objective_value,
                Err(err) => {
                    assert_eq!(err.kind(), "infeasible", "{}: {err}", scenario.name());
                    f64::NEG_INFINITY
                }
            };
            if previous.is_finite() {
                assert!(value <= previous + 1e-6 * previous.abs().max(1.0));
            } else if previous == f64::NEG_INFINITY {
                // once infeasible, every tighter cap stays infeasible
                assert_eq!(value, f64::NEG_INFINITY, "{} became feasible", scenario.name());
            }
            previous = value;
        }
    }
}

#[test]
fn encodings_agree_on_a_capped_scenario() {
    let params = watershed();
    let scenario = Scenario::new(0.2, 0.1).unwrap();
    let opposed = AllocationOptions::default();
    let native = AllocationOptions {
        encoding: EqualityEncoding::Native,
        ..Default::default()
    };
    let a = solve_allocation(&params, &scenario, &LpSolverKind::Microlp, &opposed).unwrap();
    let b = solve_allocation(&params, &scenario, &LpSolverKind::Microlp, &native).unwrap();
    let scale = a.objective_value.abs().max(1.0);
    assert!((a.objective_value - b.objective_value).abs() < 1e-6 * scale);
}

#[test]
fn costly_water_is_not_drawn() {
    let params = watershed();
    let options = AllocationOptions {
        water_available: true,
        water_cost: -5.0,
        ..Default::default()
    };
    let record =
        solve_allocation(&params, &Scenario::baseline(), &LpSolverKind::Microlp, &options).unwrap();
    assert!(record.water_slack.abs() < 1e-9);
}
