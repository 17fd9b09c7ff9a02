use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{EconomicTable, HealthTable};

pub const HEALTH_EXPORT_NAME: &str = "health_data.csv";
pub const ECONOMIC_EXPORT_NAME: &str = "economic_data.csv";

/// Write a health table as CSV: `iso_code,location,year,<columns...>`.
/// Missing cells are left empty. Floats use the shortest representation
/// that parses back to the same value.
pub fn write_health_csv<W: Write>(table: &HealthTable, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);

    let mut header = vec!["iso_code", "location", "year"];
    header.extend(table.columns.iter().map(String::as_str));
    writer.write_record(&header).context("writing CSV header")?;

    for row in &table.rows {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(row.iso_code.clone());
        record.push(row.location.clone().unwrap_or_default());
        record.push(row.year.to_string());
        for col in &table.columns {
            record.push(row.value(col).map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Write economic rows as CSV: `iso_code,year,indicator_code,value`.
pub fn write_economic_csv<W: Write>(table: &EconomicTable, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    for row in &table.rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    if table.rows.is_empty() {
        writer
            .write_record(["iso_code", "year", "indicator_code", "value"])
            .context("writing CSV header")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

pub fn save_health_csv(table: &HealthTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_health_csv(table, file)?;
    log::info!("Exported {} health rows to {}", table.len(), path.display());
    Ok(())
}

pub fn save_economic_csv(table: &EconomicTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_economic_csv(table, file)?;
    log::info!("Exported {} economic rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::filter::Selection;
    use crate::data::loader::{load_economic_file, load_health_file, read_health_csv};
    use crate::data::model::{EconomicRow, HealthRow};

    fn health() -> HealthTable {
        let row = |iso: &str, loc: Option<&str>, year: i32, vals: &[(&str, f64)]| HealthRow {
            iso_code: iso.to_string(),
            location: loc.map(str::to_string),
            year,
            values: vals
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        };
        HealthTable::new(
            vec!["new_cases".to_string(), "reproduction_rate".to_string()],
            vec![
                row("BRA", Some("Brazil"), 2021, &[("new_cases", 0.1 + 0.2)]),
                row("USA", Some("United States, of"), 2020, &[("reproduction_rate", 1.0 / 3.0)]),
                row("USA", None, 2022, &[("new_cases", 1e-12), ("reproduction_rate", 2.5e9)]),
                row("IND", None, 2019, &[]),
            ],
        )
    }

    fn selection() -> Selection {
        Selection {
            countries: ["USA", "BRA"].iter().map(|s| s.to_string()).collect(),
            health_indicator: "new_cases".to_string(),
            economic_indicator: "NY.GDP.MKTP.CD".to_string(),
            year_range: (2020, 2022),
        }
    }

    #[test]
    fn filtered_health_export_round_trips() {
        let filtered = health().filtered(&selection());
        let mut buf = Vec::new();
        write_health_csv(&filtered, &mut buf).unwrap();

        let reloaded = read_health_csv(buf.as_slice()).unwrap();
        assert_eq!(reloaded, filtered);
    }

    #[test]
    fn economic_export_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ECONOMIC_EXPORT_NAME);
        let table = EconomicTable::new(vec![
            EconomicRow {
                iso_code: "USA".to_string(),
                year: 2021,
                indicator_code: "NY.GDP.MKTP.CD".to_string(),
                value: 2.331508e13,
            },
            EconomicRow {
                iso_code: "BRA".to_string(),
                year: 2020,
                indicator_code: "NY.GDP.MKTP.CD".to_string(),
                value: 0.7,
            },
        ]);

        save_economic_csv(&table, &path).unwrap();
        assert_eq!(load_economic_file(&path).unwrap(), table);
    }

    #[test]
    fn health_export_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HEALTH_EXPORT_NAME);
        let filtered = health().filtered(&selection());

        save_health_csv(&filtered, &path).unwrap();
        assert_eq!(load_health_file(&path).unwrap(), filtered);
    }

    #[test]
    fn empty_economic_export_still_has_a_header() {
        let mut buf = Vec::new();
        write_economic_csv(&EconomicTable::default(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim(), "iso_code,year,indicator_code,value");
    }
}
