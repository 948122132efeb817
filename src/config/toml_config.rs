use crate::adapters::csv_loader::default_date_formats;
use crate::core::ConfigProvider;
use crate::domain::model::{LookupRequest, MatchMode};
use crate::utils::error::{LivedError, Result};
use crate::utils::validation::{self, Validate, LOG_FORMATS, OUTPUT_FORMATS};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub lookups: LookupsConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub files: Vec<String>,
    pub dataset: Option<String>,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub as_of: Option<NaiveDate>,
    pub top_n: Option<usize>,
    pub exclude_top_n: Option<usize>,
    #[serde(default)]
    pub cumulative: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupsConfig {
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub fuzzy: bool,
    pub fuzzy_cutoff: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_output_formats")]
    pub formats: Vec<String>,
    pub bundle: Option<BundleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

const DEFAULT_FUZZY_CUTOFF: f64 = 0.8;

impl TomlConfig {
    /// Loads a configuration file, substituting `${VAR}` references first.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LivedError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LivedError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LivedError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.name", &self.report.name)?;
        validation::validate_paths("input.files", &self.input.files)?;
        validation::validate_date_formats("input.date_formats", &self.input.date_formats)?;
        validation::validate_exclusive(
            "aggregation.top_n",
            self.aggregation.top_n,
            "aggregation.exclude_top_n",
            self.aggregation.exclude_top_n,
        )?;
        if let Some(top_n) = self.aggregation.top_n {
            validation::validate_positive_number("aggregation.top_n", top_n, 1)?;
        }
        validation::validate_range("lookups.fuzzy_cutoff", self.fuzzy_cutoff(), 0.0, 1.0)?;

        validation::validate_path("output.path", &self.output.path)?;
        for format in &self.output.formats {
            validation::validate_one_of("output.formats", format, &OUTPUT_FORMATS)?;
        }
        if let Some(bundle) = self.output.bundle.as_ref().filter(|b| b.enabled) {
            validation::validate_non_empty_string("output.bundle.filename", &bundle.filename)?;
        }
        validation::validate_one_of("logging.format", self.log_format(), &LOG_FORMATS)?;

        Ok(())
    }

    pub fn fuzzy_cutoff(&self) -> f64 {
        self.lookups.fuzzy_cutoff.unwrap_or(DEFAULT_FUZZY_CUTOFF)
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("compact")
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_files(&self) -> &[String] {
        &self.input.files
    }

    fn dataset(&self) -> Option<&str> {
        self.input.dataset.as_deref()
    }

    fn date_formats(&self) -> &[String] {
        &self.input.date_formats
    }

    fn as_of(&self) -> Option<NaiveDate> {
        self.aggregation.as_of
    }

    fn top_n(&self) -> Option<usize> {
        self.aggregation.top_n
    }

    fn exclude_top_n(&self) -> Option<usize> {
        self.aggregation.exclude_top_n
    }

    fn cumulative(&self) -> bool {
        self.aggregation.cumulative
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.output
            .bundle
            .as_ref()
            .filter(|b| b.enabled)
            .map(|b| b.filename.as_str())
    }

    fn lookups(&self) -> LookupRequest {
        LookupRequest {
            cities: self.lookups.cities.clone(),
            countries: self.lookups.countries.clone(),
            years: self.lookups.years.clone(),
            match_mode: if self.lookups.fuzzy {
                MatchMode::Fuzzy {
                    cutoff: self.fuzzy_cutoff(),
                }
            } else {
                MatchMode::Exact
            },
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
