//! In-memory CSV tables and column lookup.

use crate::error::GeoError;

/// A parsed CSV file: one header row plus records.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn parse(text: &str) -> Result<Self, GeoError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, rows })
    }

    /// Index of the first header matching any candidate.
    pub fn column(&self, candidates: &[&str]) -> Result<usize, GeoError> {
        find_column(&self.headers, candidates)
    }

    /// Cell value, empty when the row is short.
    pub fn cell<'a>(row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(String::as_str).unwrap_or("")
    }
}

/// First header whose lower-cased text contains any candidate.
pub fn find_column(headers: &[String], candidates: &[&str]) -> Result<usize, GeoError> {
    let wanted: Vec<String> = candidates.iter().map(|c| c.to_lowercase()).collect();
    headers
        .iter()
        .position(|h| {
            let low = h.to_lowercase();
            wanted.iter().any(|c| low.contains(c.as_str()))
        })
        .ok_or_else(|| GeoError::MissingColumn {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            headers: headers.to_vec(),
        })
}
