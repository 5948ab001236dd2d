//! Readers for the BMP input tables.
//!
//! Crop coefficients, one row per crop:
//!
//! ```csv
//! Names,Pexp,Nexp,Water,Yield,Cost,Price
//! Corn,2.1,11.0,3.2,9800,1250,190
//! ```
//!
//! Baseline areas [Ha], one row per subdivision, one column per crop:
//!
//! ```csv
//! Geography,Corn,Soybean
//! Essex,10500,23000
//! ```
//!
//! Extra columns are ignored in both tables.

use agro_core::{BaselineTable, BmpParameters, CropCoefficients, UnitScaling};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Column holding the subdivision name in the baseline table.
pub const GEOGRAPHY_COLUMN: &str = "Geography";

#[derive(Debug, Deserialize)]
struct CropRow {
    #[serde(rename = "Names")]
    name: String,
    #[serde(rename = "Pexp")]
    export_p: f64,
    #[serde(rename = "Nexp")]
    export_n: f64,
    #[serde(rename = "Water")]
    water: f64,
    #[serde(rename = "Yield")]
    yield_per_area: f64,
    #[serde(rename = "Cost")]
    cost: f64,
    #[serde(rename = "Price")]
    price: f64,
}

impl From<CropRow> for CropCoefficients {
    fn from(row: CropRow) -> Self {
        CropCoefficients {
            name: row.name,
            export_p: row.export_p,
            export_n: row.export_n,
            water: row.water,
            yield_per_area: row.yield_per_area,
            cost: row.cost,
            price: row.price,
        }
    }
}

/// Read the crop coefficient table in raw spreadsheet units.
pub fn read_crop_table(path: &Path) -> Result<Vec<CropCoefficients>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening crop table: {}", path.display()))?;

    let mut crops = Vec::new();
    for (line, result) in reader.deserialize::<CropRow>().enumerate() {
        let row = result
            .with_context(|| format!("parsing crop table row {} in {}", line + 1, path.display()))?;
        crops.push(CropCoefficients::from(row));
    }
    if crops.is_empty() {
        return Err(anyhow!("crop table {} has no rows", path.display()));
    }
    Ok(crops)
}

/// Read the baseline area table, keeping only the `crops` columns (in that
/// order). Every requested crop must be present. Blank cells are zero area.
pub fn read_baseline_table(path: &Path, crops: &[String]) -> Result<BaselineTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening baseline table: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("reading baseline header in {}", path.display()))?
        .clone();
    let geography = headers
        .iter()
        .position(|h| h == GEOGRAPHY_COLUMN)
        .ok_or_else(|| anyhow!("baseline table {} has no '{}' column", path.display(), GEOGRAPHY_COLUMN))?;
    let columns = crops
        .iter()
        .map(|crop| {
            headers
                .iter()
                .position(|h| h == crop)
                .ok_or_else(|| anyhow!("crop '{}' missing from baseline table {}", crop, path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut subdivisions = Vec::new();
    let mut areas = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("reading baseline row {} in {}", line + 1, path.display()))?;
        let name = record
            .get(geography)
            .ok_or_else(|| anyhow!("baseline row {} has no subdivision name", line + 1))?
            .to_string();
        let row = columns
            .iter()
            .zip(crops)
            .map(|(&col, crop)| {
                let cell = record.get(col).unwrap_or("");
                if cell.is_empty() {
                    return Ok(0.0);
                }
                cell.parse::<f64>()
                    .with_context(|| format!("parsing '{}' area for {}", crop, name))
            })
            .collect::<Result<Vec<f64>>>()?;
        subdivisions.push(name);
        areas.push(row);
    }

    Ok(BaselineTable {
        crop_columns: crops.to_vec(),
        subdivisions,
        areas,
    })
}

/// Read both tables and build the validated parameter set.
pub fn load_bmp_parameters(
    crop_table: &Path,
    baseline_table: &Path,
    scaling: UnitScaling,
) -> Result<BmpParameters> {
    let crops = read_crop_table(crop_table)?;
    let names: Vec<String> = crops.iter().map(|c| c.name.clone()).collect();
    let baseline = read_baseline_table(baseline_table, &names)?;
    BmpParameters::from_tables(crops, baseline, scaling).with_context(|| {
        format!(
            "building parameters from {} and {}",
            crop_table.display(),
            baseline_table.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn crop_rows_map_to_coefficients() {
        let file = write(
            "Names,Pexp,Nexp,Water,Yield,Cost,Price,Notes\n\
             Corn, 2.0, 10.0, 3.0, 9000, 1200, 200, grain\n\
             Hay,0.5,4.0,1.0,5000,400,120,\n",
        );
        let crops = read_crop_table(file.path()).unwrap();
        assert_eq!(crops.len(), 2);
        assert_eq!(crops[0].name, "Corn");
        assert_eq!(crops[0].yield_per_area, 9000.0);
        assert_eq!(crops[1].price, 120.0);
    }

    #[test]
    fn missing_coefficient_column_is_reported() {
        let file = write("Names,Pexp,Nexp,Water,Yield,Cost\nCorn,1,1,1,1,1\n");
        assert!(read_crop_table(file.path()).is_err());
    }

    #[test]
    fn baseline_columns_follow_crop_order() {
        let file = write(
            "Geography,Hay,Total,Corn\n\
             Essex,5,20,15\n\
             Kent,,8,8\n",
        );
        let crops = vec!["Corn".to_string(), "Hay".to_string()];
        let table = read_baseline_table(file.path(), &crops).unwrap();
        assert_eq!(table.crop_columns, crops);
        assert_eq!(table.subdivisions, vec!["Essex", "Kent"]);
        assert_eq!(table.areas, vec![vec![15.0, 5.0], vec![8.0, 0.0]]);
    }

    #[test]
    fn crop_absent_from_baseline_fails_fast() {
        let file = write("Geography,Corn\nEssex,1\n");
        let crops = vec!["Corn".to_string(), "Hay".to_string()];
        let err = read_baseline_table(file.path(), &crops).unwrap_err();
        assert!(err.to_string().contains("Hay"));
    }

    #[test]
    fn baseline_without_geography_is_rejected() {
        let file = write("Region,Corn\nEssex,1\n");
        assert!(read_baseline_table(file.path(), &["Corn".to_string()]).is_err());
    }
}
