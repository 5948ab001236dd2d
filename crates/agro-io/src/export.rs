//! Result table writers.
//!
//! | File | Layout |
//! |------|--------|
//! | `Prod.csv` | crop index, `Base`, then one column per scenario |
//! | `Prod_PV_<name>.csv` | crop index, `Ton_<name>` |
//! | `Price_PV_<name>.csv` | crop index, `MCAD_Ton_<name>` |
//! | `Ha_<name>.csv` | `Geography`, one column per crop |
//! | goal result | `name,value` rows or JSON |

use crate::tables::GEOGRAPHY_COLUMN;
use agro_core::{AllocationMatrix, ProductionRecord, ResultRecord};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// File name of the sweep production table.
pub const PRODUCTION_TABLE_FILE: &str = "Prod.csv";

/// Leading column holding baseline production.
pub const BASE_COLUMN: &str = "Base";

/// Crop × scenario production table [Ton/yr].
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionTable {
    crops: Vec<String>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ProductionTable {
    /// Start a table whose first column is the baseline production.
    pub fn with_baseline(crops: Vec<String>, base: Vec<f64>) -> Result<Self> {
        let mut table = Self {
            crops,
            columns: Vec::new(),
        };
        table.push_column(BASE_COLUMN, base)?;
        Ok(table)
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.crops.len() {
            return Err(anyhow!(
                "column '{}' has {} values for {} crops",
                name,
                values.len(),
                self.crops.len()
            ));
        }
        if self.column(&name).is_some() {
            return Err(anyhow!("duplicate production column '{}'", name));
        }
        self.columns.push((name, values));
        Ok(())
    }

    /// Append a solved scenario; its crop list must match the table's.
    pub fn push_record(&mut self, record: &ProductionRecord) -> Result<()> {
        if record.crops != self.crops {
            return Err(anyhow!(
                "scenario '{}' crops do not match the production table",
                record.scenario
            ));
        }
        self.push_column(record.scenario.clone(), record.production.clone())
    }

    pub fn crops(&self) -> &[String] {
        &self.crops
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating CSV writer for {}", path.display()))?;

        let mut header = vec![String::new()];
        header.extend(self.columns.iter().map(|(n, _)| n.clone()));
        wtr.write_record(&header).context("writing CSV header")?;

        for (row, crop) in self.crops.iter().enumerate() {
            let mut record = vec![crop.clone()];
            record.extend(self.columns.iter().map(|(_, v)| v[row].to_string()));
            wtr.write_record(&record).context("writing CSV record")?;
        }

        wtr.flush().context("flushing CSV writer")?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening production table: {}", path.display()))?;
        let names: Vec<String> = reader
            .headers()
            .context("reading production table header")?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();
        let mut crops = Vec::new();
        let mut columns: Vec<(String, Vec<f64>)> =
            names.into_iter().map(|n| (n, Vec::new())).collect();
        for result in reader.records() {
            let record = result.context("reading production table record")?;
            let crop = record.get(0).unwrap_or("").to_string();
            for (i, (name, values)) in columns.iter_mut().enumerate() {
                let value = record
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("row '{}' has no '{}' value", crop, name))?
                    .parse::<f64>()
                    .with_context(|| format!("parsing '{}' for {}", name, crop))?;
                values.push(value);
            }
            crops.push(crop);
        }
        Ok(Self { crops, columns })
    }
}

/// Single-column crop table, index header left blank.
pub fn write_crop_series(path: &Path, header: &str, crops: &[String], values: &[f64]) -> Result<()> {
    if crops.len() != values.len() {
        return Err(anyhow!(
            "{} values for {} crops in {}",
            values.len(),
            crops.len(),
            path.display()
        ));
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    wtr.write_record(["", header]).context("writing CSV header")?;
    for (crop, value) in crops.iter().zip(values) {
        let value = value.to_string();
        wtr.write_record([crop.as_str(), value.as_str()])
            .context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// Paths of the production and price tables of one price-responsive run.
pub fn price_responsive_paths(dir: &Path, scenario: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("Prod_PV_{scenario}.csv")),
        dir.join(format!("Price_PV_{scenario}.csv")),
    )
}

/// Write `Prod_PV_<name>.csv` [Ton/yr] and `Price_PV_<name>.csv` [$M/Ton].
pub fn write_price_responsive_tables(
    dir: &Path,
    scenario: &str,
    crops: &[String],
    production: &[f64],
    price: &[f64],
) -> Result<(PathBuf, PathBuf)> {
    let (prod_path, price_path) = price_responsive_paths(dir, scenario);
    write_crop_series(&prod_path, &format!("Ton_{scenario}"), crops, production)?;
    write_crop_series(&price_path, &format!("MCAD_Ton_{scenario}"), crops, price)?;
    Ok((prod_path, price_path))
}

/// Subdivision × crop allocation [thousand-Ha].
pub fn write_allocation_table(
    path: &Path,
    subdivisions: &[String],
    crops: &[String],
    allocation: &AllocationMatrix,
) -> Result<()> {
    if allocation.rows() != subdivisions.len() || allocation.cols() != crops.len() {
        return Err(anyhow!(
            "allocation is {}x{} but labels are {}x{}",
            allocation.rows(),
            allocation.cols(),
            subdivisions.len(),
            crops.len()
        ));
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    let mut header = vec![GEOGRAPHY_COLUMN.to_string()];
    header.extend(crops.iter().cloned());
    wtr.write_record(&header).context("writing CSV header")?;
    for (s, name) in subdivisions.iter().enumerate() {
        let mut record = vec![name.clone()];
        record.extend(allocation.row(s).iter().map(|v| v.to_string()));
        wtr.write_record(&record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// `name,value` rows with the objective last.
pub fn write_result_record_csv(path: &Path, record: &ResultRecord) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    wtr.write_record(["name", "value"]).context("writing CSV header")?;
    for entry in record.entries() {
        let value = entry.value.to_string();
        wtr.write_record([entry.name.as_str(), value.as_str()])
            .context("writing CSV record")?;
    }
    let objective = record.objective_value().to_string();
    wtr.write_record(["objective", objective.as_str()])
        .context("writing CSV record")?;
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

pub fn write_result_record_json(path: &Path, record: &ResultRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("serializing result record to JSON")?;
    std::fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))?;
    Ok(())
}
