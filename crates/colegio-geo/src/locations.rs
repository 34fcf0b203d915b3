//! Joining the three datasets into consolidated locations.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::GeoError;
use crate::table::Table;

const CODE: &[&str] = &["código", "codigo", "code", "id"];
const NAME: &[&str] = &["nombre", "name"];
const PROVINCE: &[&str] = &["provincia", "prov"];
const CANTON: &[&str] = &["canton", "cant"];

/// One district with the names of its canton and province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub province: String,
    pub canton: String,
    pub district: String,
}

/// Join districts to their canton and province.
///
/// Districts whose canton code is unknown are skipped. A canton whose
/// province code is unknown yields an empty province name.
pub fn consolidate(
    provinces: &Table,
    cantons: &Table,
    districts: &Table,
) -> Result<Vec<Location>, GeoError> {
    let prov_code = provinces.column(CODE)?;
    let prov_name = provinces.column(NAME)?;

    let cant_code = cantons.column(CODE)?;
    let cant_name = cantons.column(NAME)?;
    let cant_prov = cantons.column(PROVINCE)?;

    let dist_name = districts.column(NAME)?;
    let dist_cant = districts.column(CANTON)?;

    let province_names: HashMap<&str, &str> = provinces
        .rows
        .iter()
        .map(|row| (Table::cell(row, prov_code), Table::cell(row, prov_name)))
        .collect();

    let canton_info: HashMap<&str, (&str, &str)> = cantons
        .rows
        .iter()
        .map(|row| {
            (
                Table::cell(row, cant_code),
                (Table::cell(row, cant_name), Table::cell(row, cant_prov)),
            )
        })
        .collect();

    let mut skipped = 0usize;
    let mut locations = Vec::with_capacity(districts.rows.len());
    for row in &districts.rows {
        let Some((canton, province_code)) = canton_info.get(Table::cell(row, dist_cant)) else {
            skipped += 1;
            continue;
        };
        locations.push(Location {
            province: province_names
                .get(province_code)
                .copied()
                .unwrap_or_default()
                .to_string(),
            canton: canton.to_string(),
            district: Table::cell(row, dist_name).to_string(),
        });
    }

    debug!(locations = locations.len(), skipped, "Consolidated districts");
    Ok(locations)
}

/// Write locations as CSV with a `provincia,canton,distrito` header.
pub fn write_to<W: Write>(writer: W, locations: &[Location]) -> Result<(), GeoError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["provincia", "canton", "distrito"])?;
    for loc in locations {
        out.write_record([&loc.province, &loc.canton, &loc.district])?;
    }
    out.flush()?;
    Ok(())
}

/// Write locations to `path`, creating parent directories as needed.
pub fn write_locations(path: &Path, locations: &[Location]) -> Result<(), GeoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_to(file, locations)
}
