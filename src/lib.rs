pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::{csv_loader::CsvLoader, storage::LocalStorage};
pub use crate::core::{
    aggregator::IntervalAggregator, database::LocationDatabase, engine::ReportEngine,
    pipeline::ReportPipeline,
};
pub use crate::domain::model::LocationRecord;
pub use crate::utils::error::{LivedError, Result, ValidationError};
