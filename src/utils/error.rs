use chrono::NaiveDate;
use thiserror::Error;

/// Logically inconsistent input to the interval aggregator.
///
/// Indices are 0-based positions in the record sequence handed to the
/// aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no location records to aggregate")]
    EmptyInput,

    #[error("record {index}: {field} is empty")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index}: start date {start} is after end date {end}")]
    InvertedRange {
        index: usize,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("record {index}: starts on {start}, before the previous record's start {previous_start}")]
    UnsortedRecords {
        index: usize,
        previous_start: NaiveDate,
        start: NaiveDate,
    },

    #[error("record {index}: starts on {start}, overlapping the previous record ending {previous_end}")]
    OverlappingSpans {
        index: usize,
        previous_end: NaiveDate,
        start: NaiveDate,
    },

    #[error("record {index}: only the last record may omit its end date")]
    OpenEndedNotLast { index: usize },

    #[error("top_n ({top_n}) and exclude_top_n ({exclude_top_n}) are mutually exclusive")]
    ConflictingRankFilter { top_n: usize, exclude_top_n: usize },
}

#[derive(Error, Debug)]
pub enum LivedError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Line {line}: cannot parse {field} '{value}' with formats [{formats}]")]
    DateParseError {
        line: u64,
        field: &'static str,
        value: String,
        formats: String,
    },

    #[error("Line {line}: {message}")]
    InvalidRecordError { line: u64, message: String },

    #[error("Dataset not found: {name}")]
    DatasetNotFound { name: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Validation,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code: 2 for configuration, 1 for input data, 3 for system.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl LivedError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LivedError::ValidationError(_) => ErrorCategory::Validation,
            LivedError::CsvError(_)
            | LivedError::DateParseError { .. }
            | LivedError::InvalidRecordError { .. }
            | LivedError::DatasetNotFound { .. } => ErrorCategory::Input,
            LivedError::ConfigError { .. }
            | LivedError::ConfigValidationError { .. }
            | LivedError::MissingConfigError { .. }
            | LivedError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            LivedError::IoError(_)
            | LivedError::ZipError(_)
            | LivedError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            LivedError::ValidationError(ValidationError::ConflictingRankFilter { .. }) => {
                "Pass either --top-n or --exclude-top-n, not both"
            }
            LivedError::ValidationError(ValidationError::OpenEndedNotLast { .. }) => {
                "Fill in the end date of every record except the most recent one"
            }
            LivedError::ValidationError(_) => {
                "Sort the CSV by start date and make sure stays do not overlap"
            }
            LivedError::DateParseError { .. } => {
                "Check the date column or add the format with --date-formats"
            }
            LivedError::CsvError(_) | LivedError::InvalidRecordError { .. } => {
                "Make sure the CSV has the header city,country,start_date,end_date"
            }
            LivedError::DatasetNotFound { .. } => {
                "Use the file stem of one of the loaded input files"
            }
            LivedError::ConfigError { .. }
            | LivedError::ConfigValidationError { .. }
            | LivedError::MissingConfigError { .. }
            | LivedError::InvalidConfigValueError { .. } => {
                "Review the command line flags or the TOML configuration file"
            }
            LivedError::IoError(_) => "Check that the paths exist and are writable",
            LivedError::ZipError(_) | LivedError::SerializationError(_) => {
                "Retry without --bundle or report the issue"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => format!("The location history is inconsistent: {}", self),
            ErrorCategory::Input => format!("Could not read the location data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LivedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_high_severity() {
        let err = LivedError::from(ValidationError::EmptyInput);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_validation_message_names_record() {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        let err = ValidationError::InvertedRange {
            index: 4,
            start,
            end,
        };
        assert_eq!(
            err.to_string(),
            "record 4: start date 2021-03-01 is after end date 2021-02-01"
        );
    }

    #[test]
    fn test_config_errors_are_medium_severity() {
        let err = LivedError::ConfigError {
            message: "bad".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_every_failure_exits_non_zero() {
        let errors = [
            LivedError::from(ValidationError::EmptyInput),
            LivedError::DatasetNotFound {
                name: "notes".to_string(),
            },
            LivedError::MissingConfigError {
                field: "input.files".to_string(),
            },
            LivedError::IoError(std::io::Error::other("disk full")),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.severity().exit_code()).collect();
        assert_eq!(codes, vec![1, 1, 2, 3]);
    }
}
