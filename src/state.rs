use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;

use crate::analysis::correlation::indicator_correlation;
use crate::analysis::regression::{TrainingReport, forecast_latest, train_economic_model};
use crate::chart::{ComparisonChart, HeatmapGrid, comparison_series, heatmap_grid};
use crate::color::CountryColors;
use crate::config::DashboardConfig;
use crate::data::export::{save_economic_csv, save_health_csv};
use crate::data::filter::{Selection, normalize_economic, normalize_health_column};
use crate::data::loader::{load_economic_file, load_health_file};
use crate::data::model::{ECONOMIC_INDICATORS, EconomicTable, HEALTH_INDICATORS, HealthTable};
use crate::data::worldbank::{EconomicSource, FileEconomicSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Comparison,
    Heatmap,
}

impl ChartType {
    pub const ALL: [ChartType; 2] = [ChartType::Comparison, ChartType::Heatmap];

    pub fn label(self) -> &'static str {
        match self {
            ChartType::Comparison => "Comparison Chart",
            ChartType::Heatmap => "Heatmap",
        }
    }
}

/// Economic fetches are memoized per country set and indicator.
type EconomicKey = (Vec<String>, String);

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Full yearly health table (None until a file is loaded).
    pub health: Option<HealthTable>,

    economic_source: Box<dyn EconomicSource>,
    economic_cache: HashMap<EconomicKey, EconomicTable>,

    pub selection: Selection,
    pub chart_type: ChartType,
    pub minmax_scaling: bool,
    /// Text typed into the country search box.
    pub country_search: String,

    /// Filtered (and optionally scaled) views shown in charts and tables.
    pub health_view: Option<HealthTable>,
    pub economic_view: Option<EconomicTable>,
    /// Filtered, unscaled views used for training and forecasts.
    health_raw: Option<HealthTable>,
    economic_raw: Option<EconomicTable>,

    pub comparison: Option<ComparisonChart>,
    pub heatmap: Option<HeatmapGrid>,
    pub colors: CountryColors,
    pub correlation: Option<f64>,

    pub training: Option<TrainingReport>,
    /// `(iso_code, year, forecast)` from the last trained model.
    pub forecasts: Vec<(String, i32, f64)>,

    /// Non-fatal messages (skipped countries, missing data).
    pub notices: Vec<String>,
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Set when the selection changed and views need recomputing.
    dirty: bool,
}

impl AppState {
    pub fn new(config: DashboardConfig, economic_source: Box<dyn EconomicSource>) -> Self {
        let selection = Selection {
            countries: config.default_countries.iter().cloned().collect(),
            health_indicator: HEALTH_INDICATORS[0].to_string(),
            economic_indicator: ECONOMIC_INDICATORS[0].code.to_string(),
            year_range: config.default_years,
        };
        Self {
            config,
            health: None,
            economic_source,
            economic_cache: HashMap::new(),
            selection,
            chart_type: ChartType::Comparison,
            minmax_scaling: true,
            country_search: String::new(),
            health_view: None,
            economic_view: None,
            health_raw: None,
            economic_raw: None,
            comparison: None,
            heatmap: None,
            colors: CountryColors::default(),
            correlation: None,
            training: None,
            forecasts: Vec::new(),
            notices: Vec::new(),
            status_message: None,
            dirty: true,
        }
    }

    pub fn economic_source_label(&self) -> String {
        self.economic_source.describe()
    }

    // -- loading ----------------------------------------------------------

    /// Ingest a newly loaded health table.
    pub fn set_health_table(&mut self, table: HealthTable) {
        let known: BTreeSet<String> = table.countries().into_iter().collect();
        let before = self.selection.countries.len();
        self.selection.countries.retain(|c| known.contains(c));
        if self.selection.countries.len() < before {
            log::debug!("Dropped selected countries absent from the health data");
        }
        self.health = Some(table);
        self.status_message = None;
        self.mark_dirty();
    }

    pub fn load_health(&mut self, path: &Path) {
        match load_health_file(path) {
            Ok(table) => {
                log::info!(
                    "Loaded {} country-years with {} indicator columns from {}",
                    table.len(),
                    table.columns.len(),
                    path.display()
                );
                self.set_health_table(table);
            }
            Err(e) => {
                log::error!("Failed to load health data: {e:#}");
                self.status_message = Some(format!("Failed to process health data: {e:#}"));
            }
        }
    }

    /// Replace the economic source with a file.
    pub fn load_economic(&mut self, path: &Path) {
        match load_economic_file(path) {
            Ok(table) => {
                log::info!("Loaded {} economic rows from {}", table.len(), path.display());
                self.set_economic_source(Box::new(FileEconomicSource::new(
                    path.display().to_string(),
                    table,
                )));
            }
            Err(e) => {
                log::error!("Failed to load economic data: {e:#}");
                self.status_message = Some(format!("Failed to process economic data: {e:#}"));
            }
        }
    }

    pub fn set_economic_source(&mut self, source: Box<dyn EconomicSource>) {
        self.economic_source = source;
        self.economic_cache.clear();
        self.mark_dirty();
    }

    // -- selection --------------------------------------------------------

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn toggle_country(&mut self, iso_code: &str) {
        if !self.selection.countries.remove(iso_code) {
            self.selection.countries.insert(iso_code.to_string());
        }
        self.mark_dirty();
    }

    pub fn clear_countries(&mut self) {
        if !self.selection.countries.is_empty() {
            self.selection.countries.clear();
            self.mark_dirty();
        }
    }

    pub fn set_health_indicator(&mut self, column: String) {
        if self.selection.health_indicator != column {
            self.selection.health_indicator = column;
            self.mark_dirty();
        }
    }

    pub fn set_economic_indicator(&mut self, code: String) {
        if self.selection.economic_indicator != code {
            self.selection.economic_indicator = code;
            self.mark_dirty();
        }
    }

    pub fn set_year_range(&mut self, from: i32, to: i32) {
        let (lo, hi) = self.config.year_bounds;
        let from = from.clamp(lo, hi);
        let to = to.clamp(lo, hi).max(from);
        if self.selection.year_range != (from, to) {
            self.selection.year_range = (from, to);
            self.mark_dirty();
        }
    }

    /// Recompute views if the selection changed since the last call.
    pub fn refresh_if_dirty(&mut self) {
        if self.dirty {
            self.refresh();
        }
    }

    // -- derived views ----------------------------------------------------

    /// Economic rows for the current countries and indicator, fetched once
    /// per key.
    fn economic_for_selection(&mut self) -> Option<EconomicTable> {
        let countries = self.selection.country_list();
        let code = self.selection.economic_indicator.clone();
        let key = (countries.clone(), code.clone());
        if let Some(hit) = self.economic_cache.get(&key) {
            return Some(hit.clone());
        }
        match self
            .economic_source
            .fetch(&countries, &code, self.config.year_bounds)
        {
            Ok(table) => {
                self.economic_cache.insert(key, table.clone());
                Some(table)
            }
            Err(e) => {
                log::error!("Economic fetch from {} failed: {e}", self.economic_source.describe());
                self.status_message = Some(format!("Failed to process economic data: {e}"));
                None
            }
        }
    }

    /// Recompute filtered views, charts and correlation from the full
    /// tables and the current selection.
    pub fn refresh(&mut self) {
        self.dirty = false;
        self.status_message = None;
        self.notices.clear();
        self.training = None;
        self.forecasts.clear();

        let sel = self.selection.clone();
        self.colors = CountryColors::new(&sel.country_list());

        self.health_raw = self.health.as_ref().map(|h| h.filtered(&sel));
        self.economic_raw = if self.health.is_some() {
            self.economic_for_selection().map(|e| e.filtered(&sel))
        } else {
            None
        };
        log::debug!(
            "Filtered for years {:?} and countries {:?}",
            sel.year_range,
            sel.countries
        );

        self.health_view = self.health_raw.clone().map(|mut h| {
            if self.minmax_scaling {
                normalize_health_column(&mut h, &sel.health_indicator);
            }
            h
        });
        self.economic_view = self.economic_raw.clone().map(|mut e| {
            if self.minmax_scaling {
                normalize_economic(&mut e);
            }
            e
        });

        self.comparison = None;
        self.heatmap = None;
        self.correlation = None;

        if let (Some(h), Some(e)) = (&self.health_view, &self.economic_view) {
            let chart = comparison_series(h, e, &sel.health_indicator, &sel.country_list());
            self.notices.extend(chart.notices.iter().cloned());
            self.comparison = Some(chart);
            // Pearson is invariant to min-max scaling; use the raw values.
            if let (Some(hr), Some(er)) = (&self.health_raw, &self.economic_raw) {
                self.correlation = indicator_correlation(hr, er, &sel.health_indicator);
            }
        }
        if let Some(h) = &self.health_view {
            match heatmap_grid(h, &sel.health_indicator) {
                Ok(grid) => self.heatmap = Some(grid),
                Err(e) => {
                    log::error!("Error generating heatmap: {e}");
                    self.notices.push(e.to_string());
                }
            }
        }
    }

    // -- model ------------------------------------------------------------

    /// Train on the filtered, unscaled rows and forecast each selected
    /// country from its latest health row.
    pub fn train_model(&mut self) {
        let (Some(health), Some(economic)) = (&self.health_raw, &self.economic_raw) else {
            self.status_message = Some("Insufficient data to train a model.".to_string());
            return;
        };
        match train_economic_model(health, economic, &self.config.train) {
            Ok(report) => {
                self.forecasts = self
                    .selection
                    .countries
                    .iter()
                    .filter_map(|iso| {
                        let (year, value) = forecast_latest(&report.model, health, iso).ok()?;
                        Some((iso.clone(), year, value))
                    })
                    .collect();
                self.training = Some(report);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Error training model: {e}");
                self.training = None;
                self.forecasts.clear();
                self.status_message = Some(format!("Error training model: {e}"));
            }
        }
    }

    // -- export -----------------------------------------------------------

    pub fn export_health(&self, path: &Path) -> Result<()> {
        match &self.health_view {
            Some(view) => save_health_csv(view, path),
            None => anyhow::bail!("no health data to export"),
        }
    }

    pub fn export_economic(&self, path: &Path) -> Result<()> {
        match &self.economic_view {
            Some(view) => save_economic_csv(view, path),
            None => anyhow::bail!("no economic data to export"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::*;
    use crate::data::model::{EconomicRow, HealthRow};
    use crate::data::worldbank::FetchError;

    /// Serves a fixed linear relation and counts calls.
    struct StubSource {
        calls: Rc<Cell<usize>>,
        fail: bool,
    }

    impl EconomicSource for StubSource {
        fn fetch(
            &self,
            countries: &[String],
            indicator_code: &str,
            years: (i32, i32),
        ) -> Result<EconomicTable, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(FetchError::Status(503));
            }
            let mut rows = Vec::new();
            for iso in countries {
                for year in years.0..=years.1 {
                    rows.push(EconomicRow {
                        iso_code: iso.clone(),
                        year,
                        indicator_code: indicator_code.to_string(),
                        value: 100.0 + 2.0 * year as f64,
                    });
                }
            }
            Ok(EconomicTable::new(rows))
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    fn health() -> HealthTable {
        let mut rows = Vec::new();
        for iso in ["USA", "IND", "BRA", "GBR"] {
            for year in 2000..=2023 {
                rows.push(HealthRow {
                    iso_code: iso.to_string(),
                    location: None,
                    year,
                    values: BTreeMap::from([
                        ("new_cases".to_string(), year as f64 * 10.0),
                        ("median_age".to_string(), 30.0 + (year % 7) as f64),
                    ]),
                });
            }
        }
        HealthTable::new(Vec::new(), rows)
    }

    fn state(fail: bool) -> (AppState, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let source = StubSource {
            calls: calls.clone(),
            fail,
        };
        let mut st = AppState::new(DashboardConfig::default(), Box::new(source));
        st.set_health_table(health());
        (st, calls)
    }

    #[test]
    fn refresh_builds_views_for_default_selection() {
        let (mut st, _) = state(false);
        st.refresh_if_dirty();

        let view = st.health_view.as_ref().unwrap();
        assert_eq!(view.len(), 3 * 4);
        assert!(view.rows.iter().all(|r| (2020..=2023).contains(&r.year)));
        assert_eq!(st.comparison.as_ref().unwrap().series.len(), 3);
        assert_eq!(st.heatmap.as_ref().unwrap().countries, vec!["BRA", "IND", "USA"]);
        assert!((st.correlation.unwrap() - 1.0).abs() < 1e-9);
        assert!(st.status_message.is_none());
    }

    #[test]
    fn economic_fetch_is_cached_per_key() {
        let (mut st, calls) = state(false);
        st.refresh_if_dirty();
        st.set_year_range(2021, 2022);
        st.refresh_if_dirty();
        assert_eq!(calls.get(), 1);

        st.toggle_country("GBR");
        st.refresh_if_dirty();
        assert_eq!(calls.get(), 2);
        assert_eq!(st.health_view.as_ref().unwrap().len(), 4 * 2);
    }

    #[test]
    fn fetch_failure_is_user_visible() {
        let (mut st, _) = state(true);
        st.refresh_if_dirty();
        assert!(st.economic_view.is_none());
        assert!(st.comparison.is_none());
        assert!(st.status_message.as_deref().unwrap().contains("503"));
        // Heatmap needs health data only.
        assert!(st.heatmap.is_some());
    }

    #[test]
    fn empty_selection_shows_nothing() {
        let (mut st, _) = state(false);
        for iso in ["USA", "IND", "BRA"] {
            st.toggle_country(iso);
        }
        st.refresh_if_dirty();
        assert!(st.health_view.as_ref().unwrap().is_empty());
        assert!(st.comparison.as_ref().unwrap().series.is_empty());
        assert!(st.correlation.is_none());
    }

    #[test]
    fn training_uses_unscaled_rows_and_forecasts() {
        let (mut st, _) = state(false);
        st.set_year_range(2000, 2023);
        st.refresh_if_dirty();
        st.train_model();

        let report = st.training.as_ref().unwrap();
        assert!(report.r2.unwrap() > 0.999);
        assert_eq!(st.forecasts.len(), 3);
        let (_, year, value) = &st.forecasts[0];
        assert_eq!(*year, 2023);
        assert!((value - (100.0 + 2.0 * 2023.0)).abs() < 1e-6);
    }

    #[test]
    fn export_writes_current_view() {
        let (mut st, _) = state(false);
        st.refresh_if_dirty();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health_data.csv");
        st.export_health(&path).unwrap();
        let reloaded = load_health_file(&path).unwrap();
        assert_eq!(Some(&reloaded), st.health_view.as_ref());
    }
}
