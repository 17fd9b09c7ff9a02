use std::collections::BTreeSet;

use super::model::{EconomicTable, HealthTable, Observation};

// ---------------------------------------------------------------------------
// Selection: what the user picked in the side panel
// ---------------------------------------------------------------------------

/// Current user selection. Filtering is a pure function of a table and
/// this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub countries: BTreeSet<String>,
    pub health_indicator: String,
    /// World Bank series code.
    pub economic_indicator: String,
    /// Inclusive `(from, to)`.
    pub year_range: (i32, i32),
}

impl Selection {
    /// Whether a country-year falls inside the selection.
    pub fn matches<R: Observation + ?Sized>(&self, row: &R) -> bool {
        let (from, to) = self.year_range;
        row.year() >= from && row.year() <= to && self.countries.contains(row.iso_code())
    }

    pub fn country_list(&self) -> Vec<String> {
        self.countries.iter().cloned().collect()
    }
}

/// Rows matching both the country set and the year range.
/// An empty country set selects nothing.
pub fn filter_rows<'a, R: Observation>(rows: &'a [R], selection: &Selection) -> Vec<&'a R> {
    rows.iter().filter(|r| selection.matches(*r)).collect()
}

impl HealthTable {
    pub fn filtered(&self, selection: &Selection) -> HealthTable {
        HealthTable {
            columns: self.columns.clone(),
            rows: filter_rows(&self.rows, selection).into_iter().cloned().collect(),
        }
    }
}

impl EconomicTable {
    /// Rows of the selected indicator inside the selection.
    pub fn filtered(&self, selection: &Selection) -> EconomicTable {
        EconomicTable {
            rows: filter_rows(&self.rows, selection)
                .into_iter()
                .filter(|r| r.indicator_code == selection.economic_indicator)
                .cloned()
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Min-max scaling
// ---------------------------------------------------------------------------

/// Scale values into `[0, 1]`. A constant series maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range.abs() < f64::EPSILON {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|&v| (v - min) / range).collect()
    }
}

/// Min-max scale one health column in place; rows missing the column are
/// left alone.
pub fn normalize_health_column(table: &mut HealthTable, column: &str) {
    let present: Vec<f64> = table.rows.iter().filter_map(|r| r.value(column)).collect();
    let scaled = min_max_normalize(&present);
    let mut it = scaled.into_iter();
    for row in &mut table.rows {
        if let Some(v) = row.values.get_mut(column) {
            if let Some(s) = it.next() {
                *v = s;
            }
        }
    }
}

/// Min-max scale the economic values in place.
pub fn normalize_economic(table: &mut EconomicTable) {
    let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();
    for (row, s) in table.rows.iter_mut().zip(min_max_normalize(&values)) {
        row.value = s;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{EconomicRow, HealthRow};

    fn selection(countries: &[&str], years: (i32, i32)) -> Selection {
        Selection {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            health_indicator: "new_cases".to_string(),
            economic_indicator: "NY.GDP.MKTP.CD".to_string(),
            year_range: years,
        }
    }

    fn health() -> HealthTable {
        let mut rows = Vec::new();
        for iso in ["USA", "IND", "BRA"] {
            for year in 2018..=2023 {
                rows.push(HealthRow {
                    iso_code: iso.to_string(),
                    location: None,
                    year,
                    values: BTreeMap::from([("new_cases".to_string(), year as f64)]),
                });
            }
        }
        HealthTable::new(Vec::new(), rows)
    }

    #[test]
    fn filter_matches_both_constraints() {
        let sel = selection(&["USA", "BRA"], (2020, 2022));
        let table = health().filtered(&sel);

        assert_eq!(table.len(), 6);
        for row in &table.rows {
            assert!(sel.countries.contains(&row.iso_code));
            assert!((2020..=2022).contains(&row.year));
        }
    }

    #[test]
    fn empty_country_set_selects_nothing() {
        let table = health().filtered(&selection(&[], (2000, 2030)));
        assert!(table.is_empty());
    }

    #[test]
    fn economic_filter_restricts_indicator() {
        let row = |code: &str| EconomicRow {
            iso_code: "USA".to_string(),
            year: 2021,
            indicator_code: code.to_string(),
            value: 1.0,
        };
        let table = EconomicTable::new(vec![row("NY.GDP.MKTP.CD"), row("SP.POP.GROW")]);
        let out = table.filtered(&selection(&["USA"], (2020, 2023)));
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0].indicator_code, "NY.GDP.MKTP.CD");
    }

    #[test]
    fn min_max_edges() {
        assert_eq!(min_max_normalize(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(min_max_normalize(&[7.0, 7.0]), vec![0.0, 0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn normalizing_skips_missing_cells() {
        let mut table = health().filtered(&selection(&["USA"], (2020, 2022)));
        table.rows[1].values.clear();
        normalize_health_column(&mut table, "new_cases");
        assert_eq!(table.rows[0].value("new_cases"), Some(0.0));
        assert_eq!(table.rows[1].value("new_cases"), None);
        assert_eq!(table.rows[2].value("new_cases"), Some(1.0));
    }
}
