use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Date32Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{EconomicRow, EconomicTable, HealthRow, HealthTable};
use super::worldbank;

// ---------------------------------------------------------------------------
// Raw records, before cleaning and yearly aggregation
// ---------------------------------------------------------------------------

/// When a raw record was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Date(NaiveDate),
    Year(i32),
}

impl Period {
    pub fn year(self) -> i32 {
        match self {
            Period::Date(d) => d.year(),
            Period::Year(y) => y,
        }
    }
}

/// One source row as read from disk. Key fields may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHealthRecord {
    pub iso_code: Option<String>,
    pub location: Option<String>,
    pub period: Option<Period>,
    pub values: BTreeMap<String, f64>,
}

const ISO_COLUMN: &str = "iso_code";
const LOCATION_COLUMN: &str = "location";
const DATE_COLUMN: &str = "date";
const YEAR_COLUMN: &str = "year";

fn is_key_column(name: &str) -> bool {
    matches!(name, ISO_COLUMN | LOCATION_COLUMN | DATE_COLUMN | YEAR_COLUMN)
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a health table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – flat OWID table, one row per country and date (or year)
/// * `.json`    – OWID layout `{ "USA": { "location": .., "data": [..] } }`
/// * `.parquet` – flat table with the same columns as the CSV
///
/// Daily data is cleaned and averaged per country and year. Files that
/// already carry a `year` column are taken as yearly.
pub fn load_health_file(path: &Path) -> Result<HealthTable> {
    let ext = extension(path);
    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_health_csv(file)
        }
        "json" => load_health_json(path),
        "parquet" | "pq" => load_health_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Load economic observations from a file.
///
/// * `.csv`  – columns `iso_code, year, [indicator_code], value`
/// * `.json` – a saved World Bank API response
pub fn load_economic_file(path: &Path) -> Result<EconomicTable> {
    let ext = extension(path);
    let rows = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            return read_economic_csv(file);
        }
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            worldbank::parse_response(&text)
                .context("parsing World Bank response")?
                .rows
        }
        other => bail!("Unsupported file extension: .{other}"),
    };
    Ok(EconomicTable::new(dedup_economic(rows)))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Cleaning and aggregation
// ---------------------------------------------------------------------------

/// Drop records without a country or period, and repeated
/// `(iso_code, period)` keys (first one wins).
pub fn clean_health_records(records: Vec<RawHealthRecord>) -> Vec<RawHealthRecord> {
    let before = records.len();
    let mut seen: HashSet<(String, Period)> = HashSet::new();
    let cleaned: Vec<RawHealthRecord> = records
        .into_iter()
        .filter(|rec| {
            let (Some(iso), Some(period)) = (&rec.iso_code, rec.period) else {
                return false;
            };
            if iso.is_empty() {
                return false;
            }
            seen.insert((iso.clone(), period))
        })
        .collect();
    if cleaned.len() < before {
        log::debug!("Cleaning dropped {} of {before} health records", before - cleaned.len());
    }
    cleaned
}

/// Average every indicator per `(iso_code, year)` over its non-missing
/// values. Output is sorted by country then year.
pub fn aggregate_by_year(records: &[RawHealthRecord]) -> Vec<HealthRow> {
    struct Acc {
        location: Option<String>,
        sums: BTreeMap<String, (f64, usize)>,
    }

    let mut groups: BTreeMap<(String, i32), Acc> = BTreeMap::new();
    for rec in records {
        let (Some(iso), Some(period)) = (&rec.iso_code, rec.period) else {
            continue;
        };
        let acc = groups
            .entry((iso.clone(), period.year()))
            .or_insert_with(|| Acc {
                location: None,
                sums: BTreeMap::new(),
            });
        if acc.location.is_none() {
            acc.location = rec.location.clone();
        }
        for (col, v) in &rec.values {
            let slot = acc.sums.entry(col.clone()).or_insert((0.0, 0));
            slot.0 += v;
            slot.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|((iso_code, year), acc)| HealthRow {
            iso_code,
            location: acc.location,
            year,
            values: acc
                .sums
                .into_iter()
                .map(|(col, (sum, n))| (col, sum / n as f64))
                .collect(),
        })
        .collect()
}

/// Turn raw records into a yearly table: daily data is aggregated, yearly
/// data is kept in source order.
fn into_health_table(columns: Vec<String>, records: Vec<RawHealthRecord>) -> HealthTable {
    let records = clean_health_records(records);
    let yearly = records
        .iter()
        .all(|r| matches!(r.period, Some(Period::Year(_))));

    let rows = if yearly {
        records
            .into_iter()
            .filter_map(|r| {
                Some(HealthRow {
                    iso_code: r.iso_code?,
                    location: r.location,
                    year: r.period?.year(),
                    values: r.values,
                })
            })
            .collect()
    } else {
        aggregate_by_year(&records)
    };
    HealthTable::new(columns, rows)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i32)
}

/// `None` for blank cells; other text is kept as written.
fn non_empty(s: &str) -> Option<String> {
    (!s.trim().is_empty()).then(|| s.to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read a flat health table from CSV.
///
/// Required columns: `iso_code` and one of `date` / `year`.
/// Every other column is an indicator when all of its non-empty cells are
/// numbers; text columns such as `continent` are ignored.
/// Rows the CSV reader cannot parse are skipped.
pub fn read_health_csv<R: Read>(source: R) -> Result<HealthTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let iso_idx = headers
        .iter()
        .position(|h| h == ISO_COLUMN)
        .context("CSV missing 'iso_code' column")?;
    let location_idx = headers.iter().position(|h| h == LOCATION_COLUMN);
    let date_idx = headers.iter().position(|h| h == DATE_COLUMN);
    let year_idx = headers.iter().position(|h| h == YEAR_COLUMN);
    if date_idx.is_none() && year_idx.is_none() {
        bail!("CSV needs a 'date' or 'year' column");
    }

    let candidates: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !is_key_column(h))
        .collect();
    let mut non_numeric: BTreeSet<usize> = BTreeSet::new();
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping CSV row {row_no}: {e}");
                skipped += 1;
                continue;
            }
        };

        let period = match (date_idx, year_idx) {
            (Some(d), _) => record.get(d).and_then(parse_date).map(Period::Date),
            (None, Some(y)) => record.get(y).and_then(parse_year).map(Period::Year),
            (None, None) => None,
        };

        let mut values = BTreeMap::new();
        for &(idx, name) in &candidates {
            let cell = record.get(idx).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                // NaN and infinities count as missing.
                Ok(v) if !v.is_finite() => {}
                Ok(v) => {
                    values.insert(name.clone(), v);
                }
                Err(_) => {
                    non_numeric.insert(idx);
                }
            }
        }

        records.push(RawHealthRecord {
            iso_code: record.get(iso_idx).and_then(non_empty),
            location: location_idx.and_then(|i| record.get(i)).and_then(non_empty),
            period,
            values,
        });
    }

    let dropped: Vec<&String> = non_numeric.iter().map(|&i| &headers[i]).collect();
    if !dropped.is_empty() {
        log::debug!("Ignoring non-numeric columns {dropped:?}");
        for rec in &mut records {
            for name in &dropped {
                rec.values.remove(*name);
            }
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} malformed CSV rows");
    }

    let columns = candidates
        .iter()
        .filter(|(i, _)| !non_numeric.contains(i))
        .map(|(_, name)| (*name).clone())
        .collect();
    Ok(into_health_table(columns, records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (the OWID `owid-covid-data.json` layout):
///
/// ```json
/// {
///   "USA": {
///     "location": "United States",
///     "median_age": 38.3,
///     "data": [ { "date": "2020-03-01", "new_cases": 7.0 }, ... ]
///   },
///   ...
/// }
/// ```
///
/// Country-level numbers (`median_age`, ...) are copied into every daily
/// record of that country.
fn load_health_json(path: &Path) -> Result<HealthTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    parse_health_json(&root)
}

pub(crate) fn parse_health_json(root: &JsonValue) -> Result<HealthTable> {
    let countries = root
        .as_object()
        .context("Expected top-level JSON object keyed by ISO code")?;

    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut records = Vec::new();

    for (iso, country) in countries {
        let Some(country) = country.as_object() else {
            log::warn!("Skipping '{iso}': not a JSON object");
            continue;
        };
        let location = country
            .get(LOCATION_COLUMN)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let statics: BTreeMap<String, f64> = country
            .iter()
            .filter(|(k, _)| k.as_str() != "data")
            .filter_map(|(k, v)| Some((k.clone(), v.as_f64()?)))
            .collect();

        let Some(days) = country.get("data").and_then(|d| d.as_array()) else {
            log::warn!("Skipping '{iso}': no 'data' array");
            continue;
        };

        for day in days {
            let Some(day) = day.as_object() else {
                continue;
            };
            let mut values = statics.clone();
            for (k, v) in day {
                if let Some(f) = v.as_f64() {
                    values.insert(k.clone(), f);
                }
            }
            values.retain(|k, _| !is_key_column(k));
            columns.extend(values.keys().cloned());

            records.push(RawHealthRecord {
                iso_code: Some(iso.clone()),
                location: location.clone(),
                period: day
                    .get(DATE_COLUMN)
                    .and_then(|d| d.as_str())
                    .and_then(parse_date)
                    .map(Period::Date),
                values,
            });
        }
    }

    Ok(into_health_table(columns.into_iter().collect(), records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat health table from Parquet.
///
/// Expected schema:
/// - `iso_code`: Utf8
/// - `date` (Utf8 or Date32) or `year` (any integer type)
/// - `location`: Utf8, optional
/// - Any numeric column is an indicator; other columns are ignored
fn load_health_parquet(path: &Path) -> Result<HealthTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let iso_idx = schema
            .index_of(ISO_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'iso_code' column"))?;
        let iso_col = cast(batch.column(iso_idx), &DataType::Utf8)
            .context("casting 'iso_code' to text")?;
        let location_col = match schema.index_of(LOCATION_COLUMN) {
            Ok(i) => Some(cast(batch.column(i), &DataType::Utf8).context("casting 'location'")?),
            Err(_) => None,
        };
        let periods = parquet_periods(&batch)?;

        // Numeric indicator columns, cast once to Float64.
        let mut numeric: Vec<(String, Arc<dyn Array>)> = Vec::new();
        for (i, field) in schema.fields().iter().enumerate() {
            if is_key_column(field.name()) || !field.data_type().is_numeric() {
                continue;
            }
            let as_f64 = cast(batch.column(i), &DataType::Float64)
                .with_context(|| format!("casting '{}' to Float64", field.name()))?;
            if !columns.contains(field.name()) {
                columns.push(field.name().clone());
            }
            numeric.push((field.name().clone(), as_f64));
        }

        for (row, period) in periods.into_iter().enumerate() {
            let mut values = BTreeMap::new();
            for (name, col) in &numeric {
                if let Some(v) = f64_cell(col, row) {
                    values.insert(name.clone(), v);
                }
            }
            records.push(RawHealthRecord {
                iso_code: text_cell(&iso_col, row),
                location: location_col.as_ref().and_then(|c| text_cell(c, row)),
                period,
                values,
            });
        }
    }

    Ok(into_health_table(columns, records))
}

/// Read the `date` or `year` column of a batch as periods.
fn parquet_periods(batch: &arrow::record_batch::RecordBatch) -> Result<Vec<Option<Period>>> {
    let schema = batch.schema();
    let n = batch.num_rows();

    if let Ok(i) = schema.index_of(DATE_COLUMN) {
        let col = batch.column(i);
        if let Some(dates) = col.as_any().downcast_ref::<Date32Array>() {
            return Ok((0..n)
                .map(|row| dates.value_as_date(row).filter(|_| !dates.is_null(row)))
                .map(|d| d.map(Period::Date))
                .collect());
        }
        let text = cast(col, &DataType::Utf8).context("casting 'date' to text")?;
        return Ok((0..n)
            .map(|row| text_cell(&text, row).and_then(|s| parse_date(&s)).map(Period::Date))
            .collect());
    }

    if let Ok(i) = schema.index_of(YEAR_COLUMN) {
        let years = cast(batch.column(i), &DataType::Float64).context("casting 'year'")?;
        return Ok((0..n)
            .map(|row| f64_cell(&years, row).map(|y| Period::Year(y as i32)))
            .collect());
    }

    bail!("Parquet file needs a 'date' or 'year' column")
}

fn f64_cell(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let arr = col.as_primitive_opt::<Float64Type>()?;
    let v = arr.value(row);
    (!v.is_nan()).then_some(v)
}

fn text_cell(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    let arr = col.as_string_opt::<i32>()?;
    non_empty(arr.value(row))
}

// ---------------------------------------------------------------------------
// Economic CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EconomicCsvRecord {
    iso_code: String,
    year: i32,
    /// Absent in single-indicator files.
    #[serde(default)]
    indicator_code: Option<String>,
    value: Option<f64>,
}

/// Read economic rows from CSV (`iso_code, year, [indicator_code], value`).
/// Rows with an empty value or that fail to parse are skipped.
pub fn read_economic_csv<R: Read>(source: R) -> Result<EconomicTable> {
    let mut reader = csv::Reader::from_reader(source);
    let mut rows = Vec::new();
    for (row_no, result) in reader.deserialize::<EconomicCsvRecord>().enumerate() {
        match result {
            Ok(EconomicCsvRecord {
                iso_code,
                year,
                indicator_code,
                value: Some(value),
            }) => rows.push(EconomicRow {
                iso_code,
                year,
                indicator_code: indicator_code.unwrap_or_default(),
                value,
            }),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping economic CSV row {row_no}: {e}"),
        }
    }
    Ok(EconomicTable::new(dedup_economic(rows)))
}

fn dedup_economic(rows: Vec<EconomicRow>) -> Vec<EconomicRow> {
    let mut seen: HashSet<(String, i32, String)> = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert((r.iso_code.clone(), r.year, r.indicator_code.clone())))
        .collect()
}
