use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{EconomicRow, EconomicTable};

/// Rows requested per page. Large enough that a handful of countries over a
/// couple of decades fits in one page.
const PER_PAGE: usize = 1000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("World Bank API returned HTTP {0}")]
    Status(u16),
    #[error("World Bank API error: {0}")]
    Api(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("no economic data file provides indicator {0}")]
    Unavailable(String),
}

/// Anything that can provide observations of one indicator for a set of
/// countries.
pub trait EconomicSource {
    fn fetch(
        &self,
        countries: &[String],
        indicator_code: &str,
        years: (i32, i32),
    ) -> Result<EconomicTable, FetchError>;

    /// Short label for logs and the status bar.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
struct PageInfo {
    page: u32,
    pages: u32,
}

#[derive(Deserialize, Debug)]
struct IndicatorRef {
    id: String,
}

#[derive(Deserialize, Debug)]
struct WbObservation {
    indicator: IndicatorRef,
    #[serde(rename = "countryiso3code")]
    country_iso3: String,
    date: String,
    value: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct WbMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

/// One decoded page of an indicator query.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldBankPage {
    pub page: u32,
    pub pages: u32,
    pub rows: Vec<EconomicRow>,
}

/// Decode a World Bank v2 JSON response.
///
/// Data responses are `[page_info, [observation, ...]]`; the second element
/// is `null` when the query matched nothing. Errors come back as
/// `[{"message": [{"id", "key", "value"}]}]`.
pub fn parse_response(body: &str) -> Result<WorldBankPage, FetchError> {
    let root: JsonValue =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let parts = root
        .as_array()
        .ok_or_else(|| FetchError::Decode("expected a JSON array".into()))?;

    let header = parts
        .first()
        .ok_or_else(|| FetchError::Decode("empty response array".into()))?;
    if let Some(messages) = header.get("message") {
        let messages: Vec<WbMessage> = serde_json::from_value(messages.clone())
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        let text = messages
            .iter()
            .map(|m| format!("{} {}: {}", m.id, m.key, m.value))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(FetchError::Api(text));
    }

    let info: PageInfo = serde_json::from_value(header.clone())
        .map_err(|e| FetchError::Decode(format!("page info: {e}")))?;

    let observations: Vec<WbObservation> = match parts.get(1) {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(data) => serde_json::from_value(data.clone())
            .map_err(|e| FetchError::Decode(format!("observations: {e}")))?,
    };

    let rows = observations
        .into_iter()
        .filter_map(|obs| {
            let year = obs.date.trim().parse::<i32>().ok()?;
            let value = obs.value?;
            if obs.country_iso3.is_empty() {
                return None;
            }
            Some(EconomicRow {
                iso_code: obs.country_iso3,
                year,
                indicator_code: obs.indicator.id,
                value,
            })
        })
        .collect();

    Ok(WorldBankPage {
        page: info.page,
        pages: info.pages,
        rows,
    })
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct WorldBankClient {
    client: Client,
    base_url: String,
}

impl WorldBankClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of one page of an indicator query.
    pub fn indicator_url(
        &self,
        countries: &[String],
        indicator_code: &str,
        years: (i32, i32),
        page: u32,
    ) -> String {
        format!(
            "{}/country/{}/indicator/{}?format=json&date={}:{}&per_page={}&page={}",
            self.base_url,
            countries.join(";"),
            indicator_code,
            years.0,
            years.1,
            PER_PAGE,
            page
        )
    }

    /// Fetch every page of an indicator for the given countries.
    pub fn fetch_indicator(
        &self,
        countries: &[String],
        indicator_code: &str,
        years: (i32, i32),
    ) -> Result<EconomicTable, FetchError> {
        if countries.is_empty() {
            return Ok(EconomicTable::default());
        }

        let mut rows = Vec::new();
        let mut page = 1;
        loop {
            let url = self.indicator_url(countries, indicator_code, years, page);
            log::debug!("GET {url}");
            let resp = self.client.get(&url).send()?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let body = resp.text()?;
            let parsed = parse_response(&body)?;
            rows.extend(parsed.rows);
            if parsed.pages <= page {
                break;
            }
            page += 1;
        }

        log::info!(
            "Fetched {} rows of {indicator_code} for {} countries",
            rows.len(),
            countries.len()
        );
        Ok(EconomicTable::new(rows))
    }
}

impl EconomicSource for WorldBankClient {
    fn fetch(
        &self,
        countries: &[String],
        indicator_code: &str,
        years: (i32, i32),
    ) -> Result<EconomicTable, FetchError> {
        self.fetch_indicator(countries, indicator_code, years)
    }

    fn describe(&self) -> String {
        format!("World Bank API ({})", self.base_url)
    }
}

// ---------------------------------------------------------------------------
// Offline source
// ---------------------------------------------------------------------------

/// Economic data loaded once from disk, served per query.
pub struct FileEconomicSource {
    label: String,
    table: EconomicTable,
}

impl FileEconomicSource {
    pub fn new(label: impl Into<String>, table: EconomicTable) -> Self {
        Self {
            label: label.into(),
            table,
        }
    }
}

impl EconomicSource for FileEconomicSource {
    fn fetch(
        &self,
        countries: &[String],
        indicator_code: &str,
        years: (i32, i32),
    ) -> Result<EconomicTable, FetchError> {
        if countries.is_empty() {
            return Ok(EconomicTable::default());
        }
        // Rows without a code come from single-indicator files and answer
        // any query.
        let serves =
            |r: &EconomicRow| r.indicator_code.is_empty() || r.indicator_code == indicator_code;
        if !self.table.rows.iter().any(serves) {
            return Err(FetchError::Unavailable(indicator_code.to_string()));
        }
        let rows = self
            .table
            .rows
            .iter()
            .filter(|r| serves(r))
            .filter(|r| countries.contains(&r.iso_code))
            .filter(|r| r.year >= years.0 && r.year <= years.1)
            .map(|r| EconomicRow {
                indicator_code: indicator_code.to_string(),
                ..r.clone()
            })
            .collect();
        Ok(EconomicTable::new(rows))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
