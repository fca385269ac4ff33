use crate::domain::model::{normalize_key, Table};
use crate::utils::error::Result;
use std::collections::HashMap;

/// Stacks per-sector target tables into one stellar catalog.
///
/// With `unique`, each star keeps only its first row, and the `sectors`
/// and `noise` columns list every sector it was observed in and the
/// matching noise values, comma separated in sector order.
pub fn merge_sector_tables(tables: &[(u32, Table)], unique: bool) -> Result<Table> {
    let frames: Vec<Table> = tables.iter().map(|(_, t)| t.clone()).collect();
    let mut merged = Table::concat(&frames);

    if !unique {
        return Ok(merged);
    }

    let mut sectors: HashMap<String, Vec<String>> = HashMap::new();
    let mut noises: HashMap<String, Vec<String>> = HashMap::new();

    for (sector, table) in tables {
        let ticids = table.column("ticid")?;
        let noise_idx = table.column_index("noise");
        for (row, ticid) in table.rows().iter().zip(ticids) {
            let key = normalize_key(ticid);
            sectors.entry(key.clone()).or_default().push(sector.to_string());
            noises
                .entry(key)
                .or_default()
                .push(noise_idx.map(|i| row[i].clone()).unwrap_or_default());
        }
    }

    merged.dedup_by("ticid")?;

    let keys: Vec<String> = merged
        .column("ticid")?
        .into_iter()
        .map(normalize_key)
        .collect();
    let joined = |map: &HashMap<String, Vec<String>>| -> Vec<String> {
        keys.iter()
            .map(|k| map.get(k).map(|v| v.join(",")).unwrap_or_default())
            .collect()
    };
    let sector_values = joined(&sectors);
    let noise_values = joined(&noises);

    merged.set_column("sectors", sector_values)?;
    merged.set_column("noise", noise_values)?;
    Ok(merged)
}
