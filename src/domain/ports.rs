use crate::core::database::LocationDatabase;
use crate::domain::model::{LookupRequest, ReportBundle};
use crate::utils::error::Result;
use chrono::NaiveDate;

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
    /// Where `path` ends up, for reporting back to the user.
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider {
    fn input_files(&self) -> &[String];
    fn dataset(&self) -> Option<&str>;
    fn date_formats(&self) -> &[String];
    fn as_of(&self) -> Option<NaiveDate>;
    fn top_n(&self) -> Option<usize>;
    fn exclude_top_n(&self) -> Option<usize>;
    fn cumulative(&self) -> bool;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn bundle_filename(&self) -> Option<&str>;
    fn lookups(&self) -> LookupRequest;
}

pub trait Pipeline {
    fn extract(&self) -> Result<LocationDatabase>;
    fn transform(&self, database: LocationDatabase) -> Result<ReportBundle>;
    fn load(&self, report: &ReportBundle) -> Result<String>;
}
