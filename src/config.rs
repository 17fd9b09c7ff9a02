use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::regression::TrainConfig;

/// Runtime settings, read from the environment with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Health table to open at startup.
    pub health_path: Option<PathBuf>,
    /// Offline economic data; the World Bank API is used when unset.
    pub economic_path: Option<PathBuf>,
    pub worldbank_base: String,
    pub http_timeout: Duration,
    /// Bounds of the year sliders.
    pub year_bounds: (i32, i32),
    /// Initial year selection.
    pub default_years: (i32, i32),
    pub default_countries: Vec<String>,
    pub train: TrainConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| get(key).and_then(|v| v.trim().parse::<f64>().ok());
        let int = |key: &str, default: i32| parsed(key).map(|v| v as i32).unwrap_or(default);

        let year_min = int("YEAR_MIN", 2000);
        let year_max = int("YEAR_MAX", 2023).max(year_min);
        let clamp = |y: i32| y.clamp(year_min, year_max);
        let from = clamp(int("DEFAULT_YEAR_FROM", 2020));
        let to = clamp(int("DEFAULT_YEAR_TO", 2023)).max(from);

        let default_countries = get("DEFAULT_COUNTRIES")
            .unwrap_or_else(|| "USA,IND,BRA".to_string())
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            health_path: get("HEALTH_DATA_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            economic_path: get("ECONOMIC_DATA_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            worldbank_base: get("WORLDBANK_BASE")
                .unwrap_or_else(|| "https://api.worldbank.org/v2".to_string()),
            http_timeout: Duration::from_secs(
                parsed("HTTP_TIMEOUT_SECS").map(|v| v.max(1.0) as u64).unwrap_or(30),
            ),
            year_bounds: (year_min, year_max),
            default_years: (from, to),
            default_countries,
            train: TrainConfig {
                test_fraction: parsed("TEST_FRACTION").unwrap_or(0.2).clamp(0.0, 0.9),
                seed: get("SPLIT_SEED").and_then(|v| v.trim().parse().ok()).unwrap_or(42),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> DashboardConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.year_bounds, (2000, 2023));
        assert_eq!(cfg.default_years, (2020, 2023));
        assert_eq!(cfg.default_countries, vec!["USA", "IND", "BRA"]);
        assert_eq!(cfg.worldbank_base, "https://api.worldbank.org/v2");
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.train, TrainConfig::default());
        assert!(cfg.health_path.is_none());
    }

    #[test]
    fn overrides_and_clamping() {
        let cfg = config(&[
            ("YEAR_MIN", "2010"),
            ("YEAR_MAX", "2022"),
            ("DEFAULT_YEAR_FROM", "1990"),
            ("DEFAULT_YEAR_TO", "2030"),
            ("DEFAULT_COUNTRIES", " gbr, deu ,,"),
            ("TEST_FRACTION", "0.95"),
            ("SPLIT_SEED", "7"),
            ("HEALTH_DATA_PATH", "data/owid.csv"),
        ]);
        assert_eq!(cfg.default_years, (2010, 2022));
        assert_eq!(cfg.default_countries, vec!["GBR", "DEU"]);
        assert_eq!(cfg.train.test_fraction, 0.9);
        assert_eq!(cfg.train.seed, 7);
        assert_eq!(cfg.health_path, Some(PathBuf::from("data/owid.csv")));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let cfg = config(&[("YEAR_MIN", "soon"), ("HTTP_TIMEOUT_SECS", "x")]);
        assert_eq!(cfg.year_bounds.0, 2000);
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
    }
}
