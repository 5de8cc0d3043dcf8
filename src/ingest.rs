//! CSV ingestion: one file becomes an ordered list of [`RawRecord`]s with
//! 1-based row numbers over the data rows (the header row is not counted).

use std::fs::File;
use std::path::Path;

use crate::domain::model::RawRecord;
use crate::utils::error::IngestError;

pub fn read_csv(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for (offset, row) in reader.records().enumerate() {
        let row = row?;
        let fields = headers
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();
        records.push(RawRecord::new(offset + 1, fields));
    }
    Ok(records)
}
