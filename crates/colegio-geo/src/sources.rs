//! Dataset locations and the fetch-join-write pipeline.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::GeoError;
use crate::locations::{consolidate, write_locations};
use crate::table::Table;

const BASE_URL: &str =
    "https://raw.githubusercontent.com/investigacion/divisiones-territoriales-data/master/data/csv";

/// URLs of the three territorial-division datasets.
#[derive(Debug, Clone)]
pub struct GeoSources {
    pub provinces: String,
    pub cantons: String,
    pub districts: String,
}

impl Default for GeoSources {
    fn default() -> Self {
        Self {
            provinces: format!("{BASE_URL}/adm1-provincias.csv"),
            cantons: format!("{BASE_URL}/adm2-cantones.csv"),
            districts: format!("{BASE_URL}/adm3-distritos.csv"),
        }
    }
}

async fn fetch_table(client: &reqwest::Client, name: &str, url: &str) -> Result<Table, GeoError> {
    info!(dataset = name, url, "Fetching dataset");
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let table = Table::parse(&text)?;
    if table.rows.is_empty() {
        return Err(GeoError::EmptyDataset(name.to_string()));
    }
    Ok(table)
}

/// Fetch all three datasets, consolidate them and write the result to
/// `out`. Returns the number of locations written.
pub async fn import(sources: &GeoSources, out: &Path) -> Result<usize, GeoError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let provinces = fetch_table(&client, "provinces", &sources.provinces).await?;
    let cantons = fetch_table(&client, "cantons", &sources.cantons).await?;
    let districts = fetch_table(&client, "districts", &sources.districts).await?;

    let locations = consolidate(&provinces, &cantons, &districts)?;
    write_locations(out, &locations)?;

    info!(path = %out.display(), locations = locations.len(), "Locations written");
    Ok(locations.len())
}
