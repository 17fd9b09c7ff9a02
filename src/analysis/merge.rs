use std::collections::HashMap;

use crate::data::model::{EconomicTable, HealthRow, HealthTable};

/// One country-year present in both tables.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRow<'a> {
    pub health: &'a HealthRow,
    pub economic_value: f64,
}

/// Inner join on `(iso_code, year)`, in health-table order.
///
/// The economic table is expected to hold a single indicator; if a key
/// repeats, the first economic row wins.
pub fn join_on_country_year<'a>(
    health: &'a HealthTable,
    economic: &EconomicTable,
) -> Vec<JoinedRow<'a>> {
    let mut by_key: HashMap<(&str, i32), f64> = HashMap::with_capacity(economic.len());
    for row in &economic.rows {
        by_key.entry((row.iso_code.as_str(), row.year)).or_insert(row.value);
    }

    health
        .rows
        .iter()
        .filter_map(|h| {
            let value = by_key.get(&(h.iso_code.as_str(), h.year))?;
            Some(JoinedRow {
                health: h,
                economic_value: *value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::EconomicRow;

    #[test]
    fn keeps_only_shared_keys() {
        let health = HealthTable::new(
            Vec::new(),
            [("USA", 2020), ("USA", 2021), ("IND", 2020)]
                .iter()
                .map(|&(iso, year)| HealthRow {
                    iso_code: iso.to_string(),
                    location: None,
                    year,
                    values: BTreeMap::new(),
                })
                .collect(),
        );
        let economic = EconomicTable::new(
            [("USA", 2021, 5.0), ("IND", 2020, 7.0), ("BRA", 2020, 9.0)]
                .iter()
                .map(|&(iso, year, value)| EconomicRow {
                    iso_code: iso.to_string(),
                    year,
                    indicator_code: "X".to_string(),
                    value,
                })
                .collect(),
        );

        let joined = join_on_country_year(&health, &economic);
        let keys: Vec<(&str, i32, f64)> = joined
            .iter()
            .map(|j| (j.health.iso_code.as_str(), j.health.year, j.economic_value))
            .collect();
        assert_eq!(keys, vec![("USA", 2021, 5.0), ("IND", 2020, 7.0)]);
    }
}
