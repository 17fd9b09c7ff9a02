//! Statistics over the filtered tables: joins, correlation and a linear
//! regression that forecasts an economic indicator from health metrics.

pub mod correlation;
pub mod linalg;
pub mod merge;
pub mod regression;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("health and economic data have no country-year in common")]
    EmptyJoin,
    #[error("need at least {needed} rows to train, got {got}")]
    TooFewRows { needed: usize, got: usize },
    #[error("none of the model features are present in the health data")]
    NoFeatures,
    #[error("expected {expected} feature values, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("no health data for country '{0}'")]
    UnknownCountry(String),
}
