use crate::adapters::csv_loader::default_date_formats;
use crate::core::ConfigProvider;
use crate::domain::model::{LookupRequest, MatchMode};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate, LOG_FORMATS, OUTPUT_FORMATS};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "days-lived")]
#[command(about = "Days lived per city, country and year from a CSV location history")]
pub struct CliConfig {
    #[arg(long, value_delimiter = ',', required = true, help = "CSV files to load")]
    pub input: Vec<String>,

    #[arg(long, help = "Dataset (file stem) to report on; defaults to the first input")]
    pub dataset: Option<String>,

    #[arg(long, value_delimiter = ',', default_values_t = default_date_formats())]
    pub date_formats: Vec<String>,

    #[arg(long, help = "End date for an open-ended last stay (YYYY-MM-DD); defaults to today")]
    pub as_of: Option<NaiveDate>,

    #[arg(long, help = "Only keep the N cities with the most days in the yearly table")]
    pub top_n: Option<usize>,

    #[arg(long, help = "Drop the N cities with the most days from the yearly table")]
    pub exclude_top_n: Option<usize>,

    #[arg(long, help = "Accumulate the yearly series")]
    pub cumulative: bool,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_values_t = vec!["csv".to_string(), "json".to_string()])]
    pub formats: Vec<String>,

    #[arg(long, help = "Write all tables into a single ZIP file")]
    pub bundle: bool,

    #[arg(long, default_value = "days_lived_report.zip")]
    pub bundle_name: String,

    #[arg(long, value_delimiter = ',', help = "Cities to summarize")]
    pub city: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Countries to summarize")]
    pub country: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Years to summarize")]
    pub year: Vec<i32>,

    #[arg(long, help = "Match city and country names approximately")]
    pub fuzzy: bool,

    #[arg(long, default_value_t = 0.8)]
    pub fuzzy_cutoff: f64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, default_value = "compact")]
    pub log_format: String,
}

impl ConfigProvider for CliConfig {
    fn input_files(&self) -> &[String] {
        &self.input
    }

    fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    fn top_n(&self) -> Option<usize> {
        self.top_n
    }

    fn exclude_top_n(&self) -> Option<usize> {
        self.exclude_top_n
    }

    fn cumulative(&self) -> bool {
        self.cumulative
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.bundle.then_some(self.bundle_name.as_str())
    }

    fn lookups(&self) -> LookupRequest {
        LookupRequest {
            cities: self.city.clone(),
            countries: self.country.clone(),
            years: self.year.clone(),
            match_mode: if self.fuzzy {
                MatchMode::Fuzzy {
                    cutoff: self.fuzzy_cutoff,
                }
            } else {
                MatchMode::Exact
            },
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_paths("input", &self.input)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_date_formats("date_formats", &self.date_formats)?;
        validation::validate_exclusive("top_n", self.top_n, "exclude_top_n", self.exclude_top_n)?;
        if let Some(top_n) = self.top_n {
            validation::validate_positive_number("top_n", top_n, 1)?;
        }
        for format in &self.formats {
            validation::validate_one_of("formats", format, &OUTPUT_FORMATS)?;
        }
        if self.bundle {
            validation::validate_non_empty_string("bundle_name", &self.bundle_name)?;
        }
        validation::validate_range("fuzzy_cutoff", self.fuzzy_cutoff, 0.0, 1.0)?;
        validation::validate_one_of("log_format", &self.log_format, &LOG_FORMATS)?;
        Ok(())
    }
}
