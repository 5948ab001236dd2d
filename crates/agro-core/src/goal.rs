//! Parameters of the single-farm goal-programming model.
//!
//! Three activities (grass and wheat area, cattle headcount) are scored
//! against sales, cost, emission, fertilizer and production targets. Every
//! target is soft: its gap is absorbed by a deviation variable whose penalty
//! comes from [`GoalWeights`].

use serde::{Deserialize, Serialize};

/// Per-activity coefficient triple (grass, wheat, cow).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityCoefficients {
    pub grass: f64,
    pub wheat: f64,
    pub cow: f64,
}

impl ActivityCoefficients {
    pub const fn new(grass: f64, wheat: f64, cow: f64) -> Self {
        Self { grass, wheat, cow }
    }

    /// Grass, wheat, cow.
    pub const fn as_array(&self) -> [f64; 3] {
        [self.grass, self.wheat, self.cow]
    }
}

/// Coefficient tables of the farm model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCoefficients {
    /// Average earnings [€/Ha] for crops, [€/head] for livestock
    pub sales: ActivityCoefficients,
    /// Production or capital cost [€/Ha-yr], [€/head-yr]
    pub cost: ActivityCoefficients,
    /// P emission [kg/Ha-yr], [kg/head]
    pub emission_p: ActivityCoefficients,
    /// Greenhouse-gas emission as C [kg/Ha-yr], [kg/head]
    pub emission_c: ActivityCoefficients,
    /// Organic fertilizer [kg/Ha-yr]; the cow entry is manure supplied per head
    pub organic_fertilizer: ActivityCoefficients,
    /// Chemical fertilizer [kg/Ha-yr]
    pub chemical_fertilizer: ActivityCoefficients,
    /// Yield [kg/Ha-yr], [kg/head-yr]
    #[serde(rename = "yield")]
    pub yield_rate: ActivityCoefficients,
    /// Land used per head of cattle [Ha/head]
    pub area_per_head: f64,
}

/// Right-hand sides of the farm model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTargets {
    /// Typical sales per activity [€/yr]
    pub typical_sales: ActivityCoefficients,
    /// [Ha]
    pub available_area: f64,
    /// [€/yr]
    pub budget: f64,
    /// [kg/yr]
    pub max_emission_p: f64,
    /// [kg/yr]
    pub max_emission_c: f64,
    /// Organic fertilizer balance target [kg/yr]
    pub organic_fertilizer: f64,
    /// [kg/yr]
    pub max_chemical: f64,
    /// Target production per activity [kg/yr]
    pub production: ActivityCoefficients,
}

/// Penalty per deviation variable. Field names follow the deviation they
/// weight; serialized keys keep the `Deficit_*` / `Exceed_*` labels. Keys
/// missing on input take their [`GoalWeights::reference`] value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalWeights {
    #[serde(rename = "Deficit_GrassSales")]
    pub deficit_grass_sales: f64,
    #[serde(rename = "Deficit_WheatSales")]
    pub deficit_wheat_sales: f64,
    #[serde(rename = "Deficit_CowSales")]
    pub deficit_cow_sales: f64,
    #[serde(rename = "Exceed_Cost")]
    pub exceed_cost: f64,
    #[serde(rename = "Exceed_P")]
    pub exceed_p: f64,
    #[serde(rename = "Exceed_C")]
    pub exceed_c: f64,
    #[serde(rename = "Deficit_OF")]
    pub deficit_of: f64,
    #[serde(rename = "Exceed_OF")]
    pub exceed_of: f64,
    #[serde(rename = "Exceed_CF")]
    pub exceed_cf: f64,
    #[serde(rename = "Deficit_ProdGrass")]
    pub deficit_prod_grass: f64,
    #[serde(rename = "Exceed_ProdGrass")]
    pub exceed_prod_grass: f64,
    #[serde(rename = "Deficit_ProdWheat")]
    pub deficit_prod_wheat: f64,
    #[serde(rename = "Exceed_ProdWheat")]
    pub exceed_prod_wheat: f64,
    #[serde(rename = "Deficit_ProdCow")]
    pub deficit_prod_cow: f64,
    #[serde(rename = "Exceed_ProdCow")]
    pub exceed_prod_cow: f64,
}

impl GoalWeights {
    /// Same weight on every deviation.
    pub const fn uniform(weight: f64) -> Self {
        Self {
            deficit_grass_sales: weight,
            deficit_wheat_sales: weight,
            deficit_cow_sales: weight,
            exceed_cost: weight,
            exceed_p: weight,
            exceed_c: weight,
            deficit_of: weight,
            exceed_of: weight,
            exceed_cf: weight,
            deficit_prod_grass: weight,
            exceed_prod_grass: weight,
            deficit_prod_wheat: weight,
            exceed_prod_wheat: weight,
            deficit_prod_cow: weight,
            exceed_prod_cow: weight,
        }
    }

    /// Reference weighting: monetary deviations at 1 €/€, physical ones
    /// discounted per kg.
    pub const fn reference() -> Self {
        Self {
            exceed_p: 0.001,
            exceed_c: 0.001,
            exceed_of: 0.01,
            deficit_of: 0.1,
            exceed_cf: 0.001,
            ..Self::uniform(1.0)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|w| w.is_finite() && *w >= 0.0)
    }

    /// Weights in deviation-variable declaration order.
    pub fn as_array(&self) -> [f64; 15] {
        [
            self.deficit_grass_sales,
            self.deficit_wheat_sales,
            self.deficit_cow_sales,
            self.exceed_cost,
            self.exceed_p,
            self.exceed_c,
            self.deficit_of,
            self.exceed_of,
            self.exceed_cf,
            self.deficit_prod_grass,
            self.exceed_prod_grass,
            self.deficit_prod_wheat,
            self.exceed_prod_wheat,
            self.deficit_prod_cow,
            self.exceed_prod_cow,
        ]
    }
}

impl Default for GoalWeights {
    fn default() -> Self {
        Self::reference()
    }
}

/// Complete input of one goal-programming build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalParameters {
    pub coefficients: GoalCoefficients,
    pub targets: GoalTargets,
    #[serde(default)]
    pub weights: GoalWeights,
}

impl GoalParameters {
    /// Irish grass/wheat/cattle case.
    pub fn ireland() -> Self {
        Self {
            coefficients: GoalCoefficients {
                sales: ActivityCoefficients::new(0.5, 0.7, 1.2),
                cost: ActivityCoefficients::new(0.05, 0.17, 0.6),
                emission_p: ActivityCoefficients::new(2.0, 5.0, 13.0),
                emission_c: ActivityCoefficients::new(1.0, 2.0, 15.0),
                organic_fertilizer: ActivityCoefficients::new(10.0, 15.0, 5.0),
                chemical_fertilizer: ActivityCoefficients::new(10.0, 12.0, 0.0),
                yield_rate: ActivityCoefficients::new(10.0, 12.0, 20.0),
                // 11 cows per 9 Ha would be 0.82; the farm case uses 0.51
                area_per_head: 0.51,
            },
            targets: GoalTargets {
                typical_sales: ActivityCoefficients::new(2000.0, 5000.0, 15000.0),
                available_area: 500.0,
                budget: 10000.0,
                max_emission_p: 1000.0,
                max_emission_c: 1200.0,
                organic_fertilizer: 100.0,
                max_chemical: 2000.0,
                production: ActivityCoefficients::new(2000.0, 2000.0, 6000.0),
            },
            weights: GoalWeights::reference(),
        }
    }

    pub fn with_weights(mut self, weights: GoalWeights) -> Self {
        self.weights = weights;
        self
    }
}
