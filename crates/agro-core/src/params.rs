//! Parameter store for the BMP allocation models.
//!
//! [`BmpParameters`] is built once from the crop coefficient table and the
//! baseline allocation, validated, and then shared read-only by every scenario
//! build. Nothing in the model builders mutates it.

use crate::matrix::AllocationMatrix;
use crate::{AgroError, AgroResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-crop coefficients in model units.
///
/// | field | unit |
/// |-------|------|
/// | `export_p`, `export_n` | Ton / thousand-Ha |
/// | `water` | thousand-m³ / thousand-Ha |
/// | `yield_per_area` | Ton / thousand-Ha |
/// | `cost` | $M / thousand-Ha |
/// | `price` | $M / Ton |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropCoefficients {
    pub name: String,
    pub export_p: f64,
    pub export_n: f64,
    pub water: f64,
    pub yield_per_area: f64,
    pub cost: f64,
    pub price: f64,
}

/// Conversion factors applied to raw spreadsheet units on load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScaling {
    /// Ha → thousand-Ha
    pub area: f64,
    /// $/Ha → $M/thousand-Ha
    pub cost: f64,
    /// $/Ton → $M/Ton
    pub price: f64,
}

impl Default for UnitScaling {
    fn default() -> Self {
        Self {
            area: 1e-3,
            cost: 1e-3,
            price: 1e-3,
        }
    }
}

/// Baseline areas as read from the input table: one row per subdivision, one
/// column per crop, columns in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineTable {
    pub crop_columns: Vec<String>,
    pub subdivisions: Vec<String>,
    pub areas: Vec<Vec<f64>>,
}

/// Immutable parameter set shared by every allocation scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct BmpParameters {
    crops: Vec<CropCoefficients>,
    subdivisions: Vec<String>,
    baseline: AllocationMatrix,
}

impl BmpParameters {
    /// Build from coefficients already in model units.
    ///
    /// `baseline` must have one row per subdivision and one column per crop,
    /// in the order of `crops`.
    pub fn new(
        crops: Vec<CropCoefficients>,
        subdivisions: Vec<String>,
        baseline: AllocationMatrix,
    ) -> AgroResult<Self> {
        if crops.is_empty() {
            return Err(AgroError::Validation("crop table is empty".into()));
        }
        if subdivisions.is_empty() {
            return Err(AgroError::Validation("no subdivisions in baseline".into()));
        }
        let mut seen = HashSet::new();
        for crop in &crops {
            if !seen.insert(crop.name.as_str()) {
                return Err(AgroError::Validation(format!(
                    "duplicate crop '{}' in coefficient table",
                    crop.name
                )));
            }
            if crop.yield_per_area <= 0.0 {
                return Err(AgroError::Validation(format!(
                    "crop '{}' must have a positive yield",
                    crop.name
                )));
            }
            let coefficients = [
                crop.export_p,
                crop.export_n,
                crop.water,
                crop.cost,
                crop.price,
            ];
            if coefficients.iter().any(|c| !c.is_finite() || *c < 0.0) {
                return Err(AgroError::Validation(format!(
                    "crop '{}' has a negative or non-finite coefficient",
                    crop.name
                )));
            }
        }
        let mut seen = HashSet::new();
        for sub in &subdivisions {
            if !seen.insert(sub.as_str()) {
                return Err(AgroError::Validation(format!(
                    "duplicate subdivision '{}' in baseline",
                    sub
                )));
            }
        }
        if baseline.rows() != subdivisions.len() || baseline.cols() != crops.len() {
            return Err(AgroError::Validation(format!(
                "baseline is {}x{}, expected {} subdivisions x {} crops",
                baseline.rows(),
                baseline.cols(),
                subdivisions.len(),
                crops.len()
            )));
        }
        if baseline.as_slice().iter().any(|a| !a.is_finite()) {
            return Err(AgroError::Validation(
                "baseline contains non-finite areas".into(),
            ));
        }
        let production = baseline.col_sums();
        for (crop, prod) in crops.iter().zip(&production) {
            if *prod <= 0.0 {
                return Err(AgroError::Validation(format!(
                    "crop '{}' has no baseline area; its production bounds are degenerate",
                    crop.name
                )));
            }
        }
        Ok(Self {
            crops,
            subdivisions,
            baseline,
        })
    }

    /// Build from raw spreadsheet units, reordering baseline columns to match
    /// the crop table. The crop key sets must be identical.
    pub fn from_tables(
        raw_crops: Vec<CropCoefficients>,
        baseline: BaselineTable,
        scaling: UnitScaling,
    ) -> AgroResult<Self> {
        let crop_names: HashSet<&str> = raw_crops.iter().map(|c| c.name.as_str()).collect();
        let column_names: HashSet<&str> =
            baseline.crop_columns.iter().map(|c| c.as_str()).collect();
        if crop_names != column_names || raw_crops.len() != baseline.crop_columns.len() {
            let mut missing: Vec<&str> = crop_names.difference(&column_names).copied().collect();
            let mut extra: Vec<&str> = column_names.difference(&crop_names).copied().collect();
            missing.sort_unstable();
            extra.sort_unstable();
            return Err(AgroError::Validation(format!(
                "crop table and baseline columns disagree (missing in baseline: [{}], unknown in baseline: [{}])",
                missing.join(", "),
                extra.join(", ")
            )));
        }
        if baseline.areas.len() != baseline.subdivisions.len() {
            return Err(AgroError::Validation(format!(
                "baseline has {} rows but {} subdivision names",
                baseline.areas.len(),
                baseline.subdivisions.len()
            )));
        }

        let column_of: Vec<usize> = raw_crops
            .iter()
            .map(|crop| {
                baseline
                    .crop_columns
                    .iter()
                    .position(|c| c == &crop.name)
                    .ok_or_else(|| {
                        AgroError::Validation(format!("crop '{}' missing in baseline", crop.name))
                    })
            })
            .collect::<AgroResult<_>>()?;

        let mut matrix = AllocationMatrix::zeros(baseline.subdivisions.len(), raw_crops.len());
        for (s, row) in baseline.areas.iter().enumerate() {
            if row.len() != baseline.crop_columns.len() {
                return Err(AgroError::Validation(format!(
                    "baseline row '{}' has {} values, expected {}",
                    baseline.subdivisions[s],
                    row.len(),
                    baseline.crop_columns.len()
                )));
            }
            for (c, &col) in column_of.iter().enumerate() {
                matrix.set(s, c, row[col] * scaling.area);
            }
        }

        let crops = raw_crops
            .into_iter()
            .map(|crop| CropCoefficients {
                cost: crop.cost * scaling.cost,
                price: crop.price * scaling.price,
                ..crop
            })
            .collect();

        Self::new(crops, baseline.subdivisions, matrix)
    }

    pub fn crops(&self) -> &[CropCoefficients] {
        &self.crops
    }

    pub fn crop_names(&self) -> Vec<&str> {
        self.crops.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn subdivisions(&self) -> &[String] {
        &self.subdivisions
    }

    pub fn num_crops(&self) -> usize {
        self.crops.len()
    }

    pub fn num_subdivisions(&self) -> usize {
        self.subdivisions.len()
    }

    /// Baseline allocation x0 [thousand-Ha].
    pub fn baseline(&self) -> &AllocationMatrix {
        &self.baseline
    }

    /// Baseline production y0 per crop [Ton].
    pub fn baseline_production(&self) -> Vec<f64> {
        self.baseline
            .col_sums()
            .iter()
            .zip(&self.crops)
            .map(|(area, crop)| area * crop.yield_per_area)
            .collect()
    }

    /// Baseline price p0 per crop [$M/Ton].
    pub fn baseline_price(&self) -> Vec<f64> {
        self.crops.iter().map(|c| c.price).collect()
    }

    /// Available area per subdivision: the subdivision's baseline total.
    pub fn available_area(&self) -> Vec<f64> {
        self.baseline.row_sums()
    }

    /// Baseline P export, N export and water use of the current allocation.
    pub fn baseline_loads(&self) -> BaselineLoads {
        let areas = self.baseline.col_sums();
        let dot = |f: fn(&CropCoefficients) -> f64| -> f64 {
            areas
                .iter()
                .zip(&self.crops)
                .map(|(a, crop)| a * f(crop))
                .sum()
        };
        BaselineLoads {
            phosphorus: dot(|c| c.export_p),
            nitrogen: dot(|c| c.export_n),
            water: dot(|c| c.water),
        }
    }
}

/// Aggregate loads of the baseline allocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineLoads {
    /// [Ton/yr]
    pub phosphorus: f64,
    /// [Ton/yr]
    pub nitrogen: f64,
    /// [thousand-m³/yr]
    pub water: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(name: &str, yield_per_area: f64) -> CropCoefficients {
        CropCoefficients {
            name: name.into(),
            export_p: 1.0,
            export_n: 2.0,
            water: 3.0,
            yield_per_area,
            cost: 100.0,
            price: 200.0,
        }
    }

    fn table() -> BaselineTable {
        BaselineTable {
            crop_columns: vec!["wheat".into(), "corn".into()],
            subdivisions: vec!["A".into(), "B".into()],
            areas: vec![vec![1000.0, 2000.0], vec![3000.0, 4000.0]],
        }
    }

    #[test]
    fn from_tables_reorders_columns_and_scales_units() {
        let params = BmpParameters::from_tables(
            vec![crop("corn", 10.0), crop("wheat", 5.0)],
            table(),
            UnitScaling::default(),
        )
        .unwrap();

        assert_eq!(params.crop_names(), vec!["corn", "wheat"]);
        assert_eq!(params.baseline().row(0), &[2.0, 1.0]);
        assert_eq!(params.baseline().row(1), &[4.0, 3.0]);
        assert!((params.crops()[0].cost - 0.1).abs() < 1e-12);
        assert!((params.crops()[0].price - 0.2).abs() < 1e-12);
        assert_eq!(params.available_area(), vec![3.0, 7.0]);
        assert_eq!(params.baseline_production(), vec![60.0, 20.0]);
    }

    #[test]
    fn baseline_loads_are_area_weighted() {
        let params = BmpParameters::from_tables(
            vec![crop("corn", 10.0), crop("wheat", 5.0)],
            table(),
            UnitScaling::default(),
        )
        .unwrap();
        let loads = params.baseline_loads();
        assert!((loads.phosphorus - 10.0).abs() < 1e-12);
        assert!((loads.nitrogen - 20.0).abs() < 1e-12);
        assert!((loads.water - 30.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_crop_keys_fail_fast() {
        let err = BmpParameters::from_tables(
            vec![crop("corn", 10.0), crop("soy", 5.0)],
            table(),
            UnitScaling::default(),
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("soy"), "{text}");
        assert!(text.contains("wheat"), "{text}");
    }

    #[test]
    fn baseline_shape_must_match_crop_list() {
        let baseline = AllocationMatrix::zeros(2, 3);
        let err = BmpParameters::new(
            vec![crop("corn", 10.0), crop("wheat", 5.0)],
            vec!["A".into(), "B".into()],
            baseline,
        )
        .unwrap_err();
        assert!(matches!(err, AgroError::Validation(_)));
    }

    #[test]
    fn duplicate_crops_are_rejected() {
        let baseline = AllocationMatrix::from_rows(&[vec![1.0, 1.0]]).unwrap();
        let err = BmpParameters::new(
            vec![crop("corn", 10.0), crop("corn", 5.0)],
            vec!["A".into()],
            baseline,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate crop"));
    }

    #[test]
    fn crop_without_baseline_area_is_rejected() {
        let baseline = AllocationMatrix::from_rows(&[vec![1.0, 0.0]]).unwrap();
        let err = BmpParameters::new(
            vec![crop("corn", 10.0), crop("wheat", 5.0)],
            vec!["A".into()],
            baseline,
        )
        .unwrap_err();
        assert!(err.to_string().contains("wheat"));
    }
}
