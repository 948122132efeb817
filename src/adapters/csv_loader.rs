use crate::domain::model::LocationRecord;
use crate::utils::error::{LivedError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Day-first dates as written by hand, then ISO dates.
pub const DEFAULT_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

pub fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    city: String,
    country: String,
    start_date: String,
    #[serde(default)]
    end_date: Option<String>,
}

/// Reads `city,country,start_date,end_date` rows into typed records.
/// An empty or missing `end_date` marks the current, open-ended stay.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    date_formats: Vec<String>,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new(default_date_formats())
    }
}

impl CsvLoader {
    pub fn new(date_formats: Vec<String>) -> Self {
        Self { date_formats }
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<LocationRecord>> {
        let file = std::fs::File::open(path.as_ref())?;
        self.load_reader(file)
    }

    pub fn load_bytes(&self, data: &[u8]) -> Result<Vec<LocationRecord>> {
        self.load_reader(data)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Vec<LocationRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let raw: CsvRow = row.deserialize(Some(&headers))?;
            records.push(self.to_record(line, raw)?);
        }

        tracing::debug!("Parsed {} location records", records.len());
        Ok(records)
    }

    fn to_record(&self, line: u64, raw: CsvRow) -> Result<LocationRecord> {
        if raw.city.is_empty() {
            return Err(LivedError::InvalidRecordError {
                line,
                message: "city is empty".to_string(),
            });
        }
        if raw.country.is_empty() {
            return Err(LivedError::InvalidRecordError {
                line,
                message: "country is empty".to_string(),
            });
        }

        let start_date = self.parse_date(line, "start_date", &raw.start_date)?;
        let end_date = match raw.end_date.as_deref() {
            None | Some("") => None,
            Some(value) => Some(self.parse_date(line, "end_date", value)?),
        };

        Ok(LocationRecord {
            city: raw.city,
            country: raw.country,
            start_date,
            end_date,
        })
    }

    pub fn parse_date(&self, line: u64, field: &'static str, value: &str) -> Result<NaiveDate> {
        self.date_formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
            .ok_or_else(|| LivedError::DateParseError {
                line,
                field,
                value: value.to_string(),
                formats: self.date_formats.join(", "),
            })
    }
}
