use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::model::{EconomicTable, HealthRow, HealthTable, MODEL_FEATURES};

use super::AnalysisError;
use super::linalg::solve_psd;
use super::merge::join_on_country_year;

/// Fewest training rows a fit accepts.
const MIN_TRAIN_ROWS: usize = 2;

/// Train/test split parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Share of joined rows held out for evaluation, in `[0, 0.9]`.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// LinearModel
// ---------------------------------------------------------------------------

/// Ordinary least squares with intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Training means, used for missing inputs at prediction time.
    pub feature_means: Vec<f64>,
}

impl LinearModel {
    /// Fit `y ≈ intercept + x · coefficients`.
    ///
    /// Features are standardized and the normal equations solved with a
    /// pseudo-inverse, so constant or collinear columns yield the
    /// minimum-norm solution. Constant columns get coefficient 0.
    pub fn fit(
        feature_names: Vec<String>,
        x: &[Vec<f64>],
        y: &[f64],
    ) -> Result<Self, AnalysisError> {
        let n = x.len();
        let p = feature_names.len();
        if n < MIN_TRAIN_ROWS || y.len() != n {
            return Err(AnalysisError::TooFewRows {
                needed: MIN_TRAIN_ROWS,
                got: n.min(y.len()),
            });
        }
        if let Some(bad) = x.iter().find(|row| row.len() != p) {
            return Err(AnalysisError::FeatureMismatch {
                expected: p,
                got: bad.len(),
            });
        }

        let nf = n as f64;
        let means: Vec<f64> = (0..p)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / nf)
            .collect();
        let stds: Vec<f64> = (0..p)
            .map(|j| {
                let var = x.iter().map(|row| (row[j] - means[j]).powi(2)).sum::<f64>() / nf;
                var.sqrt()
            })
            .collect();
        let y_mean = y.iter().sum::<f64>() / nf;

        let active: Vec<usize> = (0..p)
            .filter(|&j| stds[j] > 1e-12 * means[j].abs().max(1.0))
            .collect();
        let k = active.len();

        // Standardized design matrix over active columns.
        let z: Vec<Vec<f64>> = x
            .iter()
            .map(|row| {
                active
                    .iter()
                    .map(|&j| (row[j] - means[j]) / stds[j])
                    .collect()
            })
            .collect();

        let mut gram = vec![0.0; k * k];
        let mut rhs = vec![0.0; k];
        for (zi, &yi) in z.iter().zip(y) {
            let dy = yi - y_mean;
            for a in 0..k {
                rhs[a] += zi[a] * dy;
                for b in a..k {
                    gram[a * k + b] += zi[a] * zi[b];
                }
            }
        }
        for a in 0..k {
            for b in 0..a {
                gram[a * k + b] = gram[b * k + a];
            }
        }

        let beta = solve_psd(&gram, &rhs, k);

        let mut coefficients = vec![0.0; p];
        for (slot, &j) in active.iter().enumerate() {
            coefficients[j] = beta[slot] / stds[j];
        }
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Ok(Self {
            feature_names,
            coefficients,
            intercept,
            feature_means: means,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, AnalysisError> {
        if features.len() != self.coefficients.len() {
            return Err(AnalysisError::FeatureMismatch {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    /// Predict from a health row, using training means for missing cells.
    pub fn predict_row(&self, row: &HealthRow) -> f64 {
        let features = self.features_of(row);
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(&features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    fn features_of(&self, row: &HealthRow) -> Vec<f64> {
        self.feature_names
            .iter()
            .zip(&self.feature_means)
            .map(|(name, mean)| row.value(name).unwrap_or(*mean))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Training on the dashboard tables
// ---------------------------------------------------------------------------

/// A fitted model and its held-out metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub model: LinearModel,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when nothing was held out.
    pub rmse: Option<f64>,
    /// `None` with fewer than two test rows or a constant test target.
    pub r2: Option<f64>,
}

/// Smallest joined-row count that leaves `MIN_TRAIN_ROWS` for training.
fn min_rows_for(test_fraction: f64) -> usize {
    (MIN_TRAIN_ROWS..10_000)
        .find(|&n| n - test_size(n, test_fraction) >= MIN_TRAIN_ROWS)
        .unwrap_or(10_000)
}

fn test_size(n: usize, test_fraction: f64) -> usize {
    ((n as f64) * test_fraction).ceil() as usize
}

/// Train a model predicting the economic value from health features.
///
/// The tables are inner-joined on country and year; feature columns are
/// the known model features present in the join, with missing cells
/// filled by the column mean. Rows are split with a seeded shuffle, so the
/// same input always gives the same model.
pub fn train_economic_model(
    health: &HealthTable,
    economic: &EconomicTable,
    config: &TrainConfig,
) -> Result<TrainingReport, AnalysisError> {
    let joined = join_on_country_year(health, economic);
    if joined.is_empty() {
        return Err(AnalysisError::EmptyJoin);
    }

    let features: Vec<String> = MODEL_FEATURES
        .iter()
        .filter(|f| joined.iter().any(|j| j.health.value(f).is_some()))
        .map(|f| f.to_string())
        .collect();
    if features.is_empty() {
        return Err(AnalysisError::NoFeatures);
    }

    let fill: Vec<f64> = features
        .iter()
        .map(|f| {
            let present: Vec<f64> = joined.iter().filter_map(|j| j.health.value(f)).collect();
            present.iter().sum::<f64>() / present.len() as f64
        })
        .collect();
    let x: Vec<Vec<f64>> = joined
        .iter()
        .map(|j| {
            features
                .iter()
                .zip(&fill)
                .map(|(f, m)| j.health.value(f).unwrap_or(*m))
                .collect()
        })
        .collect();
    let y: Vec<f64> = joined.iter().map(|j| j.economic_value).collect();

    let fraction = config.test_fraction.clamp(0.0, 0.9);
    let n = joined.len();
    let n_test = test_size(n, fraction);
    if n - n_test < MIN_TRAIN_ROWS {
        return Err(AnalysisError::TooFewRows {
            needed: min_rows_for(fraction),
            got: n,
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    order.shuffle(&mut rng);
    let (test_idx, train_idx) = order.split_at(n_test);

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
    log::info!(
        "Training on {} rows, testing on {} rows, {} features",
        train_idx.len(),
        test_idx.len(),
        features.len()
    );

    let model = LinearModel::fit(features, &x_train, &y_train)?;

    let mut residuals = Vec::with_capacity(n_test);
    for &i in test_idx {
        residuals.push(y[i] - model.predict(&x[i])?);
    }
    let rmse = (!residuals.is_empty()).then(|| {
        (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
    });
    let actual: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();
    let r2 = r_squared(&actual, &residuals);

    log::info!("Model evaluation - RMSE: {rmse:?}, R²: {r2:?}");
    Ok(TrainingReport {
        model,
        train_rows: train_idx.len(),
        test_rows: n_test,
        rmse,
        r2,
    })
}

fn r_squared(actual: &[f64], residuals: &[f64]) -> Option<f64> {
    if actual.len() < 2 {
        return None;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot <= 0.0 {
        return None;
    }
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Forecast the economic value for a country from its latest health row.
pub fn forecast_latest(
    model: &LinearModel,
    health: &HealthTable,
    iso_code: &str,
) -> Result<(i32, f64), AnalysisError> {
    let row = health
        .latest_for(iso_code)
        .ok_or_else(|| AnalysisError::UnknownCountry(iso_code.to_string()))?;
    Ok((row.year, model.predict_row(row)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::EconomicRow;

    fn health_row(iso: &str, year: i32, vals: &[(&str, f64)]) -> HealthRow {
        HealthRow {
            iso_code: iso.to_string(),
            location: None,
            year,
            values: vals
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn econ_row(iso: &str, year: i32, value: f64) -> EconomicRow {
        EconomicRow {
            iso_code: iso.to_string(),
            year,
            indicator_code: "NY.GDP.MKTP.CD".to_string(),
            value,
        }
    }

    /// GDP = 5 + 3 * new_cases - 2 * median_age, exactly.
    fn linear_tables() -> (HealthTable, EconomicTable) {
        let mut health = Vec::new();
        let mut econ = Vec::new();
        for (i, iso) in ["USA", "IND", "BRA"].iter().enumerate() {
            for year in 2015..=2020 {
                let cases = (year - 2010) as f64 * (i + 1) as f64;
                let age = 30.0 + ((year * 7 + i as i32 * 3) % 11) as f64;
                health.push(health_row(
                    iso,
                    year,
                    &[("new_cases", cases), ("median_age", age), ("handwashing_facilities", 95.0)],
                ));
                econ.push(econ_row(iso, year, 5.0 + 3.0 * cases - 2.0 * age));
            }
        }
        (HealthTable::new(Vec::new(), health), EconomicTable::new(econ))
    }

    #[test]
    fn fit_recovers_exact_relation() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 5.0], vec![3.0, 2.0]];
        let y: Vec<f64> = x.iter().map(|r| 1.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let model = LinearModel::fit(vec!["a".into(), "b".into()], &x, &y).unwrap();

        assert!((model.intercept - 1.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-9);
        assert!((model.predict(&[10.0, 4.0]).unwrap() - 19.0).abs() < 1e-8);
    }

    #[test]
    fn constant_feature_gets_zero_weight() {
        let x = vec![vec![1.0, 7.0], vec![2.0, 7.0], vec![3.0, 7.0]];
        let y = vec![2.0, 4.0, 6.0];
        let model = LinearModel::fit(vec!["a".into(), "c".into()], &x, &y).unwrap();
        assert_eq!(model.coefficients[1], 0.0);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!(model.intercept.abs() < 1e-9);
    }

    #[test]
    fn predict_checks_feature_count() {
        let x = vec![vec![1.0], vec![2.0]];
        let model = LinearModel::fit(vec!["a".into()], &x, &[1.0, 2.0]).unwrap();
        assert_eq!(
            model.predict(&[1.0, 2.0]),
            Err(AnalysisError::FeatureMismatch { expected: 1, got: 2 })
        );
    }

    #[test]
    fn training_is_deterministic() {
        let (health, econ) = linear_tables();
        let config = TrainConfig::default();
        let first = train_economic_model(&health, &econ, &config).unwrap();
        let second = train_economic_model(&health, &econ, &config).unwrap();
        assert_eq!(first.model.coefficients, second.model.coefficients);
        assert_eq!(first.model.intercept, second.model.intercept);
        assert_eq!(first, second);
    }

    #[test]
    fn training_recovers_linear_target() {
        let (health, econ) = linear_tables();
        let report = train_economic_model(&health, &econ, &TrainConfig::default()).unwrap();

        assert_eq!(report.train_rows + report.test_rows, 18);
        assert_eq!(report.test_rows, 4);
        assert!(report.rmse.unwrap() < 1e-6);
        assert!(report.r2.unwrap() > 0.999_999);

        let names = &report.model.feature_names;
        let coef = |name: &str| {
            let i = names.iter().position(|n| n == name).unwrap();
            report.model.coefficients[i]
        };
        assert!((coef("new_cases") - 3.0).abs() < 1e-6);
        assert!((coef("median_age") + 2.0).abs() < 1e-6);
        assert_eq!(coef("handwashing_facilities"), 0.0);

        let (year, forecast) = forecast_latest(&report.model, &health, "BRA").unwrap();
        assert_eq!(year, 2020);
        let expected = econ.rows.iter().find(|r| r.iso_code == "BRA" && r.year == 2020).unwrap();
        assert!((forecast - expected.value).abs() < 1e-6);
    }

    #[test]
    fn small_joins_are_rejected() {
        let health = HealthTable::new(
            Vec::new(),
            vec![
                health_row("USA", 2020, &[("new_cases", 1.0)]),
                health_row("USA", 2021, &[("new_cases", 2.0)]),
            ],
        );
        let econ = EconomicTable::new(vec![econ_row("USA", 2020, 1.0), econ_row("USA", 2021, 2.0)]);
        assert_eq!(
            train_economic_model(&health, &econ, &TrainConfig::default()),
            Err(AnalysisError::TooFewRows { needed: 3, got: 2 })
        );

        let disjoint = EconomicTable::new(vec![econ_row("IND", 2020, 1.0)]);
        assert_eq!(
            train_economic_model(&health, &disjoint, &TrainConfig::default()),
            Err(AnalysisError::EmptyJoin)
        );
    }

    #[test]
    fn unknown_columns_only_means_no_features() {
        let health = HealthTable::new(
            Vec::new(),
            vec![health_row("USA", 2020, &[("stringency_index", 1.0)])],
        );
        let econ = EconomicTable::new(vec![econ_row("USA", 2020, 1.0)]);
        assert_eq!(
            train_economic_model(&health, &econ, &TrainConfig::default()),
            Err(AnalysisError::NoFeatures)
        );
    }

    #[test]
    fn wide_underdetermined_data_still_trains() {
        // Four years of one country and many features, several constant.
        let rows: Vec<HealthRow> = (0..4)
            .map(|i| {
                let f = i as f64;
                health_row(
                    "USA",
                    2020 + i,
                    &[
                        ("new_cases", 1000.0 + 500.0 * f),
                        ("new_deaths", 50.0 + 3.0 * f * f),
                        ("total_cases", 50000.0 + 1700.0 * f),
                        ("population_density", 36.0),
                        ("life_expectancy", 78.0 + 0.1 * f),
                        ("handwashing_facilities", 95.0),
                    ],
                )
            })
            .collect();
        let health = HealthTable::new(Vec::new(), rows);
        let econ = EconomicTable::new(
            (0..4)
                .map(|i| econ_row("USA", 2020 + i, 21e12 + 1e12 * i as f64))
                .collect(),
        );

        let report = train_economic_model(&health, &econ, &TrainConfig::default()).unwrap();
        assert_eq!((report.train_rows, report.test_rows), (3, 1));
        assert!(report.rmse.is_some());
        assert!(report.r2.is_none());
        assert!(report.model.coefficients.iter().all(|c| c.is_finite()));
    }
}
