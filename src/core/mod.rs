pub mod aggregator;
pub mod database;
pub mod engine;
pub mod matching;
pub mod pipeline;
pub mod summary;

pub use crate::domain::model::{LocationRecord, ReportBundle};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
