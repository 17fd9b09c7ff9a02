use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Indicator catalogs
// ---------------------------------------------------------------------------

/// Health indicators offered in the selector (OWID column names).
pub const HEALTH_INDICATORS: &[&str] = &[
    "new_cases",
    "new_deaths",
    "total_cases",
    "total_deaths",
    "new_cases_per_million",
    "new_deaths_per_million",
    "reproduction_rate",
    "icu_patients",
    "hosp_patients",
];

/// Columns the regression may use as features, when present.
pub const MODEL_FEATURES: &[&str] = &[
    "new_cases",
    "new_deaths",
    "total_cases",
    "total_deaths",
    "new_cases_per_million",
    "new_deaths_per_million",
    "reproduction_rate",
    "icu_patients",
    "hosp_patients",
    "population_density",
    "median_age",
    "aged_65_older",
    "aged_70_older",
    "gdp_per_capita",
    "cardiovasc_death_rate",
    "diabetes_prevalence",
    "handwashing_facilities",
    "hospital_beds_per_thousand",
    "life_expectancy",
    "human_development_index",
    "extreme_poverty",
    "female_smokers",
    "male_smokers",
];

/// A World Bank indicator: display name and series code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EconomicIndicator {
    pub name: &'static str,
    pub code: &'static str,
}

pub const ECONOMIC_INDICATORS: &[EconomicIndicator] = &[
    EconomicIndicator {
        name: "GDP (Current US$)",
        code: "NY.GDP.MKTP.CD",
    },
    EconomicIndicator {
        name: "GDP per Capita (Current US$)",
        code: "NY.GDP.PCAP.CD",
    },
    EconomicIndicator {
        name: "GDP Growth (Annual %)",
        code: "NY.GDP.MKTP.KD.ZG",
    },
    EconomicIndicator {
        name: "Inflation, Consumer Prices (Annual %)",
        code: "FP.CPI.TOTL.ZG",
    },
    EconomicIndicator {
        name: "Unemployment Rate (%)",
        code: "SL.UEM.TOTL.ZS",
    },
    EconomicIndicator {
        name: "Health Expenditure per Capita (Current US$)",
        code: "SH.XPD.CHEX.PC.CD",
    },
    EconomicIndicator {
        name: "Health Expenditure (% of GDP)",
        code: "SH.XPD.CHEX.GD.ZS",
    },
    EconomicIndicator {
        name: "Poverty Headcount Ratio (% of Population)",
        code: "SI.POV.DDAY",
    },
    EconomicIndicator {
        name: "Gini Index",
        code: "SI.POV.GINI",
    },
    EconomicIndicator {
        name: "Life Expectancy at Birth (Years)",
        code: "SP.DYN.LE00.IN",
    },
    EconomicIndicator {
        name: "CO₂ Emissions (Metric Tons per Capita)",
        code: "EN.ATM.CO2E.PC",
    },
    EconomicIndicator {
        name: "Access to Electricity (% of Population)",
        code: "EG.ELC.ACCS.ZS",
    },
    EconomicIndicator {
        name: "Population Growth (Annual %)",
        code: "SP.POP.GROW",
    },
    EconomicIndicator {
        name: "Urban Population (% of Total Population)",
        code: "SP.URB.TOTL.IN.ZS",
    },
    EconomicIndicator {
        name: "Labor Force Participation Rate (%)",
        code: "SL.TLF.CACT.ZS",
    },
    EconomicIndicator {
        name: "Government Expenditure on Education (% of GDP)",
        code: "SE.XPD.TOTL.GD.ZS",
    },
];

/// Display name for a World Bank code, falling back to the code itself.
pub fn economic_indicator_name(code: &str) -> &str {
    ECONOMIC_INDICATORS
        .iter()
        .find(|ind| ind.code == code)
        .map(|ind| ind.name)
        .unwrap_or(code)
}

// ---------------------------------------------------------------------------
// Observation – anything keyed by (country, year)
// ---------------------------------------------------------------------------

/// A row that belongs to one country and one year.
pub trait Observation {
    fn iso_code(&self) -> &str;
    fn year(&self) -> i32;
}

// ---------------------------------------------------------------------------
// Health table
// ---------------------------------------------------------------------------

/// One country-year of health data. Missing cells are absent from `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRow {
    pub iso_code: String,
    pub location: Option<String>,
    pub year: i32,
    pub values: BTreeMap<String, f64>,
}

impl HealthRow {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

impl Observation for HealthRow {
    fn iso_code(&self) -> &str {
        &self.iso_code
    }

    fn year(&self) -> i32 {
        self.year
    }
}

/// Yearly health data for many countries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthTable {
    /// Numeric indicator columns in source order.
    pub columns: Vec<String>,
    pub rows: Vec<HealthRow>,
}

impl HealthTable {
    /// Build a table, deriving the column list from the rows when `columns`
    /// is empty.
    pub fn new(columns: Vec<String>, rows: Vec<HealthRow>) -> Self {
        if !columns.is_empty() {
            return HealthTable { columns, rows };
        }
        let derived: BTreeSet<String> = rows
            .iter()
            .flat_map(|r| r.values.keys().cloned())
            .collect();
        HealthTable {
            columns: derived.into_iter().collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Sorted unique ISO codes.
    pub fn countries(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.iso_code.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// The most recent row for a country.
    pub fn latest_for(&self, iso_code: &str) -> Option<&HealthRow> {
        self.rows
            .iter()
            .filter(|r| r.iso_code == iso_code)
            .max_by_key(|r| r.year)
    }
}

// ---------------------------------------------------------------------------
// Economic table
// ---------------------------------------------------------------------------

/// One country-year observation of a World Bank indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicRow {
    pub iso_code: String,
    pub year: i32,
    pub indicator_code: String,
    pub value: f64,
}

impl Observation for EconomicRow {
    fn iso_code(&self) -> &str {
        &self.iso_code
    }

    fn year(&self) -> i32 {
        self.year
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EconomicTable {
    pub rows: Vec<EconomicRow>,
}

impl EconomicTable {
    pub fn new(rows: Vec<EconomicRow>) -> Self {
        EconomicTable { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
