//! Solved-model records handed from the model builders to exporters.

use crate::matrix::AllocationMatrix;
use serde::{Deserialize, Serialize};

/// One named solved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    pub value: f64,
}

/// Variable name → solved value, in declaration order, plus the objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    entries: Vec<ResultEntry>,
    objective_value: f64,
}

impl ResultRecord {
    pub fn new(entries: Vec<ResultEntry>, objective_value: f64) -> Self {
        Self {
            entries,
            objective_value,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value)
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

/// Per-crop production of one solved allocation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub scenario: String,
    pub crops: Vec<String>,
    /// [Ton/yr], one entry per crop
    pub production: Vec<f64>,
    /// Total margin [$M/yr]
    pub objective_value: f64,
    /// Additional water drawn [thousand-m³/yr]
    pub water_slack: f64,
    /// Full subdivision × crop allocation, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationMatrix>,
}

impl ProductionRecord {
    pub fn production_of(&self, crop: &str) -> Option<f64> {
        self.crops
            .iter()
            .position(|c| c == crop)
            .map(|i| self.production[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lookup_by_name() {
        let record = ResultRecord::new(
            vec![
                ResultEntry {
                    name: "grass".into(),
                    value: 200.0,
                },
                ResultEntry {
                    name: "cow".into(),
                    value: 12.5,
                },
            ],
            3.0,
        );
        assert_eq!(record.get("cow"), Some(12.5));
        assert_eq!(record.get("wheat"), None);
        assert_eq!(record.objective_value(), 3.0);
    }
}
