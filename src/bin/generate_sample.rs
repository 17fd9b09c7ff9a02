use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const HEALTH_CSV: &str = "sample_health.csv";
const HEALTH_PARQUET: &str = "sample_health.parquet";
const ECONOMIC_CSV: &str = "sample_economic.csv";

const FIRST_YEAR: i32 = 2019;
const LAST_YEAR: i32 = 2023;

/// Static profile a country's series are generated from.
struct Country {
    iso: &'static str,
    location: &'static str,
    population_m: f64,
    gdp_per_capita: f64,
    median_age: f64,
    life_expectancy: f64,
}

const COUNTRIES: &[Country] = &[
    Country {
        iso: "USA",
        location: "United States",
        population_m: 331.0,
        gdp_per_capita: 54225.0,
        median_age: 38.3,
        life_expectancy: 78.9,
    },
    Country {
        iso: "IND",
        location: "India",
        population_m: 1380.0,
        gdp_per_capita: 6427.0,
        median_age: 28.2,
        life_expectancy: 69.7,
    },
    Country {
        iso: "BRA",
        location: "Brazil",
        population_m: 212.6,
        gdp_per_capita: 14103.0,
        median_age: 33.5,
        life_expectancy: 75.9,
    },
    Country {
        iso: "GBR",
        location: "United Kingdom",
        population_m: 67.9,
        gdp_per_capita: 39753.0,
        median_age: 40.8,
        life_expectancy: 81.3,
    },
    Country {
        iso: "DEU",
        location: "Germany",
        population_m: 83.8,
        gdp_per_capita: 45229.0,
        median_age: 46.6,
        life_expectancy: 81.3,
    },
    Country {
        iso: "ZAF",
        location: "South Africa",
        population_m: 59.3,
        gdp_per_capita: 12295.0,
        median_age: 27.3,
        life_expectancy: 64.1,
    },
    Country {
        iso: "JPN",
        location: "Japan",
        population_m: 126.5,
        gdp_per_capita: 39002.0,
        median_age: 48.2,
        life_expectancy: 84.6,
    },
];

/// Numeric health columns, in file order.
const HEALTH_COLUMNS: &[&str] = &[
    "new_cases",
    "new_deaths",
    "total_cases",
    "total_deaths",
    "new_cases_per_million",
    "new_deaths_per_million",
    "reproduction_rate",
    "icu_patients",
    "hosp_patients",
    "median_age",
    "gdp_per_capita",
    "life_expectancy",
];

/// `(code, per-country base as a function of the profile, yearly drift)`.
type EconomicRule = (&'static str, fn(&Country) -> f64, f64);

const ECONOMIC_RULES: &[EconomicRule] = &[
    ("NY.GDP.MKTP.CD", |c| c.gdp_per_capita * c.population_m * 1e6, 0.03),
    ("NY.GDP.PCAP.CD", |c| c.gdp_per_capita, 0.025),
    ("NY.GDP.MKTP.KD.ZG", |c| 1.5 + 40.0 / c.median_age, 0.0),
    ("FP.CPI.TOTL.ZG", |c| 2.0 + 2000.0 / c.gdp_per_capita, 0.1),
    ("SL.UEM.TOTL.ZS", |c| 3.0 + 150.0 / c.median_age, -0.02),
    ("SH.XPD.CHEX.PC.CD", |c| c.gdp_per_capita * 0.09, 0.04),
    ("SP.DYN.LE00.IN", |c| c.life_expectancy, 0.002),
];

/// One monthly health observation.
struct HealthRecord {
    iso: &'static str,
    location: &'static str,
    date: NaiveDate,
    values: Vec<f64>,
}

fn month_starts() -> Vec<NaiveDate> {
    (FIRST_YEAR..=LAST_YEAR)
        .flat_map(|y| (1..=12).filter_map(move |m| NaiveDate::from_ymd_opt(y, m, 1)))
        .collect()
}

/// Waves of infection with a slow decline after 2021.
fn generate_health(rng: &mut StdRng) -> Vec<HealthRecord> {
    let months = month_starts();
    let mut out = Vec::with_capacity(COUNTRIES.len() * months.len());

    for country in COUNTRIES {
        let phase = rng.gen_range(0.0..std::f64::consts::TAU);
        let severity = rng.gen_range(50.0..400.0);
        let mut total_cases = 0.0;
        let mut total_deaths = 0.0;

        for (i, date) in months.iter().enumerate() {
            let t = i as f64;
            let wave = (t / 4.0 + phase).sin().max(0.0);
            let decay = if date.year() > 2021 { 0.4 } else { 1.0 };
            let per_million = severity * wave * decay * rng.gen_range(0.8..1.2);
            let new_cases = (per_million * country.population_m).round();
            let new_deaths = (new_cases * rng.gen_range(0.005..0.02)).round();
            total_cases += new_cases;
            total_deaths += new_deaths;

            let hosp = (new_cases * 0.05).round();
            let yearly_growth = 1.0 + 0.02 * f64::from(date.year() - FIRST_YEAR);
            out.push(HealthRecord {
                iso: country.iso,
                location: country.location,
                date: *date,
                values: vec![
                    new_cases,
                    new_deaths,
                    total_cases,
                    total_deaths,
                    per_million,
                    new_deaths / country.population_m,
                    0.7 + 0.6 * wave + rng.gen_range(-0.05..0.05),
                    (hosp * 0.2).round(),
                    hosp,
                    country.median_age,
                    country.gdp_per_capita * yearly_growth,
                    country.life_expectancy,
                ],
            });
        }
    }
    out
}

fn write_health_csv(records: &[HealthRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(HEALTH_CSV).context("creating health CSV")?;
    let mut header = vec!["iso_code", "location", "date"];
    header.extend_from_slice(HEALTH_COLUMNS);
    wtr.write_record(&header)?;

    for rec in records {
        let mut fields = vec![
            rec.iso.to_string(),
            rec.location.to_string(),
            rec.date.format("%Y-%m-%d").to_string(),
        ];
        fields.extend(rec.values.iter().map(|v| v.to_string()));
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_health_parquet(records: &[HealthRecord]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch date")?;

    let mut fields = vec![
        Field::new("iso_code", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, true),
        Field::new("date", DataType::Date32, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.iso))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.location))),
        Arc::new(Date32Array::from(
            records
                .iter()
                .map(|r| (r.date - epoch).num_days() as i32)
                .collect::<Vec<_>>(),
        )),
    ];
    for (i, name) in HEALTH_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(
            records.iter().map(|r| r.values[i]).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(HEALTH_PARQUET).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_economic_csv(rng: &mut StdRng) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(ECONOMIC_CSV).context("creating economic CSV")?;
    wtr.write_record(["iso_code", "year", "indicator_code", "value"])?;

    let mut rows = 0;
    for country in COUNTRIES {
        for (code, base, drift) in ECONOMIC_RULES {
            let start = base(country);
            for year in FIRST_YEAR..=LAST_YEAR {
                let t = f64::from(year - FIRST_YEAR);
                let value = start * (1.0 + drift).powf(t) * rng.gen_range(0.97..1.03);
                wtr.write_record([
                    country.iso.to_string(),
                    year.to_string(),
                    code.to_string(),
                    value.to_string(),
                ])?;
                rows += 1;
            }
        }
    }
    wtr.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    let health = generate_health(&mut rng);
    write_health_csv(&health)?;
    write_health_parquet(&health)?;
    let economic_rows = write_economic_csv(&mut rng)?;

    println!(
        "Wrote {} monthly health rows for {} countries to {HEALTH_CSV} and {HEALTH_PARQUET}",
        health.len(),
        COUNTRIES.len()
    );
    println!("Wrote {economic_rows} economic rows to {ECONOMIC_CSV}");
    Ok(())
}
