use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::data::model::{EconomicTable, HealthTable};

// ---------------------------------------------------------------------------
// Chart models, independent of rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("health indicator '{0}' not found in the data")]
    MissingIndicator(String),
}

/// Health and economic polylines of one country, `[year, value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySeries {
    pub iso_code: String,
    pub health: Vec<[f64; 2]>,
    pub economic: Vec<[f64; 2]>,
    pub health_peak: Option<[f64; 2]>,
    pub economic_peak: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonChart {
    pub series: Vec<CountrySeries>,
    /// Countries skipped for lack of data, as user-facing messages.
    pub notices: Vec<String>,
}

/// Position of the first maximum; ties keep the earliest point.
fn peak(points: &[[f64; 2]]) -> Option<[f64; 2]> {
    points
        .iter()
        .copied()
        .fold(None, |best: Option<[f64; 2]>, p| match best {
            Some(b) if b[1] >= p[1] => Some(b),
            _ => Some(p),
        })
}

/// Build one series per selected country. Countries missing either side
/// are skipped with a notice.
pub fn comparison_series(
    health: &HealthTable,
    economic: &EconomicTable,
    indicator: &str,
    countries: &[String],
) -> ComparisonChart {
    let mut chart = ComparisonChart::default();

    for iso in countries {
        let mut health_pts: Vec<[f64; 2]> = health
            .rows
            .iter()
            .filter(|r| &r.iso_code == iso)
            .filter_map(|r| Some([r.year as f64, r.value(indicator)?]))
            .collect();
        let mut econ_pts: Vec<[f64; 2]> = economic
            .rows
            .iter()
            .filter(|r| &r.iso_code == iso)
            .map(|r| [r.year as f64, r.value])
            .collect();

        if health_pts.is_empty() {
            log::warn!("No health data found for country code '{iso}'. Skipping.");
            chart
                .notices
                .push(format!("No health data found for country code '{iso}'. Skipping."));
            continue;
        }
        if econ_pts.is_empty() {
            log::warn!("No economic data found for country code '{iso}'. Skipping.");
            chart
                .notices
                .push(format!("No economic data found for country code '{iso}'. Skipping."));
            continue;
        }

        health_pts.sort_by(|a, b| a[0].total_cmp(&b[0]));
        econ_pts.sort_by(|a, b| a[0].total_cmp(&b[0]));

        chart.series.push(CountrySeries {
            iso_code: iso.clone(),
            health_peak: peak(&health_pts),
            economic_peak: peak(&econ_pts),
            health: health_pts,
            economic: econ_pts,
        });
    }
    chart
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Countries × years matrix of one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub countries: Vec<String>,
    pub years: Vec<i32>,
    /// `cells[country][year]`, both in the sorted order above.
    pub cells: Vec<Vec<Option<f64>>>,
    /// `(min, max)` over present cells.
    pub range: Option<(f64, f64)>,
}

impl HeatmapGrid {
    /// Position of a value inside `range`, in `[0, 1]`.
    pub fn fraction(&self, value: f64) -> f64 {
        match self.range {
            Some((lo, hi)) if hi > lo => ((value - lo) / (hi - lo)).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Pivot a health column to countries × years.
pub fn heatmap_grid(health: &HealthTable, indicator: &str) -> Result<HeatmapGrid, ChartError> {
    if !health.has_column(indicator) {
        return Err(ChartError::MissingIndicator(indicator.to_string()));
    }

    let countries: Vec<String> = health.countries();
    let years: Vec<i32> = health
        .rows
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut lookup: BTreeMap<(&str, i32), f64> = BTreeMap::new();
    for row in &health.rows {
        if let Some(v) = row.value(indicator) {
            lookup.entry((row.iso_code.as_str(), row.year)).or_insert(v);
        }
    }

    let cells: Vec<Vec<Option<f64>>> = countries
        .iter()
        .map(|c| {
            years
                .iter()
                .map(|&y| lookup.get(&(c.as_str(), y)).copied())
                .collect()
        })
        .collect();

    let range = lookup.values().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    Ok(HeatmapGrid {
        countries,
        years,
        cells,
        range,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{EconomicRow, HealthRow};

    fn health() -> HealthTable {
        let rows = [("USA", 2021, 5.0), ("USA", 2020, 9.0), ("IND", 2022, 1.0), ("USA", 2022, 9.0)]
            .iter()
            .map(|&(iso, year, v)| HealthRow {
                iso_code: iso.to_string(),
                location: None,
                year,
                values: BTreeMap::from([("new_cases".to_string(), v)]),
            })
            .collect();
        HealthTable::new(Vec::new(), rows)
    }

    fn economic() -> EconomicTable {
        EconomicTable::new(vec![EconomicRow {
            iso_code: "USA".to_string(),
            year: 2021,
            indicator_code: "NY.GDP.MKTP.CD".to_string(),
            value: 3.0,
        }])
    }

    #[test]
    fn series_are_sorted_with_first_peak() {
        let chart = comparison_series(
            &health(),
            &economic(),
            "new_cases",
            &["USA".to_string(), "IND".to_string(), "BRA".to_string()],
        );

        assert_eq!(chart.series.len(), 1);
        let usa = &chart.series[0];
        assert_eq!(usa.health, vec![[2020.0, 9.0], [2021.0, 5.0], [2022.0, 9.0]]);
        assert_eq!(usa.health_peak, Some([2020.0, 9.0]));
        assert_eq!(usa.economic_peak, Some([2021.0, 3.0]));

        assert_eq!(chart.notices.len(), 2);
        assert!(chart.notices[0].contains("economic") && chart.notices[0].contains("IND"));
        assert!(chart.notices[1].contains("health") && chart.notices[1].contains("BRA"));
    }

    #[test]
    fn heatmap_pivots_countries_by_years() {
        let grid = heatmap_grid(&health(), "new_cases").unwrap();
        assert_eq!(grid.countries, vec!["IND", "USA"]);
        assert_eq!(grid.years, vec![2020, 2021, 2022]);
        assert_eq!(grid.cells[0], vec![None, None, Some(1.0)]);
        assert_eq!(grid.cells[1], vec![Some(9.0), Some(5.0), Some(9.0)]);
        assert_eq!(grid.range, Some((1.0, 9.0)));
        assert_eq!(grid.fraction(5.0), 0.5);
    }

    #[test]
    fn heatmap_rejects_unknown_indicator() {
        assert_eq!(
            heatmap_grid(&health(), "icu_patients"),
            Err(ChartError::MissingIndicator("icu_patients".to_string()))
        );
    }
}
