use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input row: a stay in `city`/`country` from `start_date` through
/// `end_date`, both inclusive. `end_date == None` marks the current stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub city: String,
    pub country: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl LocationRecord {
    pub fn new(
        city: impl Into<String>,
        country: impl Into<String>,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            start_date,
            end_date,
        }
    }
}

/// Days attributed to one record after resolving the open end and any
/// handoff day with the following record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySpan {
    pub index: usize,
    pub city: String,
    pub country: String,
    pub city_key: String,
    pub country_key: String,
    pub start: NaiveDate,
    /// Last day counted for this record (inclusive).
    pub end: NaiveDate,
    /// End date as written in the input, or the as-of date when open-ended.
    pub recorded_end: NaiveDate,
    pub days: u64,
}

impl DaySpan {
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }

    /// Exact number of this span's days that fall in `year`.
    pub fn days_in_year(&self, year: i32) -> u64 {
        let (Some(first), Some(last)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) else {
            return 0;
        };
        let from = self.start.max(first);
        let to = self.end.min(last);
        if from > to {
            0
        } else {
            inclusive_days(from, to)
        }
    }
}

pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u64 {
    (end - start).num_days().max(0) as u64 + 1
}

/// Days lived per city and per country, keyed by display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocationAggregate {
    pub cities: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
}

impl LocationAggregate {
    pub fn total_city_days(&self) -> u64 {
        self.cities.values().sum()
    }

    pub fn total_country_days(&self) -> u64 {
        self.countries.values().sum()
    }

    pub fn ranked_cities(&self) -> Vec<RankedTotal> {
        rank(&self.cities)
    }

    pub fn ranked_countries(&self) -> Vec<RankedTotal> {
        rank(&self.countries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTotal {
    pub name: String,
    pub days: u64,
}

/// Days descending, then name ascending.
pub fn rank(totals: &BTreeMap<String, u64>) -> Vec<RankedTotal> {
    let mut ranked: Vec<RankedTotal> = totals
        .iter()
        .map(|(name, days)| RankedTotal {
            name: name.clone(),
            days: *days,
        })
        .collect();
    ranked.sort_by(|a, b| b.days.cmp(&a.days).then_with(|| a.name.cmp(&b.name)));
    ranked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityYearDays {
    pub year: i32,
    pub city: String,
    pub days: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitySeries {
    pub city: String,
    pub values: Vec<u64>,
}

/// Pivoted per-year table for time-series charts: one value per year in
/// `years` for every city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearSeries {
    pub years: Vec<i32>,
    pub cumulative: bool,
    pub series: Vec<CitySeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryIntensity {
    pub country: String,
    pub days: u64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BasicStats {
    pub total_days_lived: u64,
    pub average_days_per_stay: f64,
    pub number_of_stays: usize,
    pub number_of_cities: usize,
    pub number_of_countries: usize,
    pub years_covered: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub total_days_lived: u64,
    pub first_stay: Option<NaiveDate>,
    pub last_stay: Option<NaiveDate>,
    pub number_of_stays: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub total_days_lived: u64,
    pub cities: Vec<String>,
    pub number_of_cities: usize,
    pub first_stay: Option<NaiveDate>,
    pub last_stay: Option<NaiveDate>,
    pub number_of_stays: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub days_lived: u64,
    pub number_of_countries: usize,
    pub number_of_cities: usize,
    pub number_of_stays: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum MatchMode {
    #[default]
    Exact,
    Fuzzy { cutoff: f64 },
}

/// Named lookups to include in a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub cities: Vec<String>,
    pub countries: Vec<String>,
    pub years: Vec<i32>,
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupResults {
    pub cities: Vec<CitySummary>,
    pub countries: Vec<CountrySummary>,
    pub years: Vec<YearSummary>,
}

impl LookupResults {
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.countries.is_empty() && self.years.is_empty()
    }
}

/// Everything the load stage writes out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportBundle {
    pub dataset: String,
    pub as_of: Option<NaiveDate>,
    pub stats: BasicStats,
    pub cities: Vec<RankedTotal>,
    pub countries: Vec<RankedTotal>,
    pub city_years: Vec<CityYearDays>,
    pub year_series: YearSeries,
    pub country_intensity: Vec<CountryIntensity>,
    pub lookups: LookupResults,
}
