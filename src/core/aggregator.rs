use crate::domain::model::{
    inclusive_days, CitySeries, CityYearDays, CountryIntensity, DaySpan, LocationAggregate,
    LocationRecord, YearSeries,
};
use crate::utils::error::ValidationError;
use chrono::{Local, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Grouping key for city and country names: trimmed, inner whitespace
/// collapsed, lowercased.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn display_label(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CityFilter {
    All,
    Top(usize),
    ExcludeTop(usize),
}

impl CityFilter {
    fn from_options(
        top_n: Option<usize>,
        exclude_top_n: Option<usize>,
    ) -> Result<Self, ValidationError> {
        match (top_n, exclude_top_n) {
            (Some(top_n), Some(exclude_top_n)) => Err(ValidationError::ConflictingRankFilter {
                top_n,
                exclude_top_n,
            }),
            (Some(n), None) => Ok(CityFilter::Top(n)),
            (None, Some(n)) => Ok(CityFilter::ExcludeTop(n)),
            (None, None) => Ok(CityFilter::All),
        }
    }
}

/// Rejects a `top_n` / `exclude_top_n` pair before any records are read.
pub fn check_rank_filter(
    top_n: Option<usize>,
    exclude_top_n: Option<usize>,
) -> Result<(), ValidationError> {
    CityFilter::from_options(top_n, exclude_top_n).map(|_| ())
}

/// Turns an ordered list of stays into day totals.
///
/// End dates are inclusive. When one record ends on the day the next one
/// starts, that day belongs to the later record. An open-ended final record
/// runs through `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalAggregator {
    as_of: NaiveDate,
}

impl IntervalAggregator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Validates `records` and resolves the days each one contributes.
    pub fn day_spans(&self, records: &[LocationRecord]) -> Result<Vec<DaySpan>, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        let last = records.len() - 1;
        let mut spans: Vec<DaySpan> = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let city_key = normalize_key(&record.city);
            if city_key.is_empty() {
                return Err(ValidationError::MissingField {
                    index,
                    field: "city",
                });
            }
            let country_key = normalize_key(&record.country);
            if country_key.is_empty() {
                return Err(ValidationError::MissingField {
                    index,
                    field: "country",
                });
            }

            let start = record.start_date;
            let end = match record.end_date {
                Some(end) => end,
                None if index == last => self.as_of,
                None => return Err(ValidationError::OpenEndedNotLast { index }),
            };
            if start > end {
                return Err(ValidationError::InvertedRange { index, start, end });
            }

            if let Some(previous) = spans.last_mut() {
                if start < previous.start {
                    return Err(ValidationError::UnsortedRecords {
                        index,
                        previous_start: previous.start,
                        start,
                    });
                }
                if start < previous.recorded_end {
                    return Err(ValidationError::OverlappingSpans {
                        index,
                        previous_end: previous.recorded_end,
                        start,
                    });
                }
                if start == previous.recorded_end {
                    // handoff day: a single-day stay has nothing left to give up
                    let day_before = previous
                        .recorded_end
                        .pred_opt()
                        .filter(|day| *day >= previous.start)
                        .ok_or(ValidationError::OverlappingSpans {
                            index,
                            previous_end: previous.recorded_end,
                            start,
                        })?;
                    previous.end = day_before;
                    previous.days = inclusive_days(previous.start, day_before);
                }
            }

            spans.push(DaySpan {
                index,
                city: display_label(&record.city),
                country: display_label(&record.country),
                city_key,
                country_key,
                start,
                end,
                recorded_end: end,
                days: inclusive_days(start, end),
            });
        }

        tracing::debug!(
            "Resolved {} day spans through {}",
            spans.len(),
            self.as_of
        );
        Ok(spans)
    }

    pub fn aggregate_by_location(
        &self,
        records: &[LocationRecord],
    ) -> Result<LocationAggregate, ValidationError> {
        let spans = self.day_spans(records)?;
        Ok(location_totals(&spans))
    }

    /// Per-year, per-city day totals, ordered by year, then days descending,
    /// then city name.
    ///
    /// `top_n` keeps only the N cities with the most days overall;
    /// `exclude_top_n` drops them instead. Passing both is an error.
    pub fn aggregate_by_year(
        &self,
        records: &[LocationRecord],
        top_n: Option<usize>,
        exclude_top_n: Option<usize>,
    ) -> Result<Vec<CityYearDays>, ValidationError> {
        let filter = CityFilter::from_options(top_n, exclude_top_n)?;
        let spans = self.day_spans(records)?;

        let ranked = location_totals(&spans).ranked_cities();
        let selected: HashSet<String> = match filter {
            CityFilter::All => ranked.into_iter().map(|r| r.name).collect(),
            CityFilter::Top(n) => ranked.into_iter().take(n).map(|r| r.name).collect(),
            CityFilter::ExcludeTop(n) => ranked.into_iter().skip(n).map(|r| r.name).collect(),
        };

        let labels = first_seen_labels(spans.iter().map(|s| (&s.city_key, &s.city)));
        let mut totals: BTreeMap<(i32, &str), u64> = BTreeMap::new();
        for span in &spans {
            let city = labels[&span.city_key].as_str();
            if !selected.contains(city) {
                continue;
            }
            for year in span.years() {
                let days = span.days_in_year(year);
                if days > 0 {
                    *totals.entry((year, city)).or_insert(0) += days;
                }
            }
        }

        let mut rows: Vec<CityYearDays> = totals
            .into_iter()
            .map(|((year, city), days)| CityYearDays {
                year,
                city: city.to_string(),
                days,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.year
                .cmp(&b.year)
                .then_with(|| b.days.cmp(&a.days))
                .then_with(|| a.city.cmp(&b.city))
        });
        Ok(rows)
    }

    /// Total days per calendar year across all records.
    pub fn days_by_year(
        &self,
        records: &[LocationRecord],
    ) -> Result<BTreeMap<i32, u64>, ValidationError> {
        let spans = self.day_spans(records)?;
        let mut totals = BTreeMap::new();
        for span in &spans {
            for year in span.years() {
                let days = span.days_in_year(year);
                if days > 0 {
                    *totals.entry(year).or_insert(0) += days;
                }
            }
        }
        Ok(totals)
    }
}

pub(crate) fn first_seen_labels<'a>(
    pairs: impl Iterator<Item = (&'a String, &'a String)>,
) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for (key, label) in pairs {
        labels.entry(key.clone()).or_insert_with(|| label.clone());
    }
    labels
}

pub(crate) fn location_totals(spans: &[DaySpan]) -> LocationAggregate {
    let city_labels = first_seen_labels(spans.iter().map(|s| (&s.city_key, &s.city)));
    let country_labels = first_seen_labels(spans.iter().map(|s| (&s.country_key, &s.country)));

    let mut aggregate = LocationAggregate::default();
    for span in spans.iter().filter(|s| s.days > 0) {
        *aggregate
            .cities
            .entry(city_labels[&span.city_key].clone())
            .or_insert(0) += span.days;
        *aggregate
            .countries
            .entry(country_labels[&span.country_key].clone())
            .or_insert(0) += span.days;
    }
    aggregate
}

/// Pivots per-year rows into one series per city over the contiguous range
/// of years present. Cities are ordered by their total over the rows.
pub fn year_series(rows: &[CityYearDays], cumulative: bool) -> YearSeries {
    let (Some(first), Some(last)) = (
        rows.iter().map(|r| r.year).min(),
        rows.iter().map(|r| r.year).max(),
    ) else {
        return YearSeries {
            cumulative,
            ..YearSeries::default()
        };
    };
    let years: Vec<i32> = (first..=last).collect();

    let mut by_city: BTreeMap<String, u64> = BTreeMap::new();
    let mut cells: HashMap<(&str, i32), u64> = HashMap::new();
    for row in rows {
        *by_city.entry(row.city.clone()).or_insert(0) += row.days;
        *cells.entry((row.city.as_str(), row.year)).or_insert(0) += row.days;
    }

    let series = crate::domain::model::rank(&by_city)
        .into_iter()
        .map(|ranked| {
            let mut running = 0;
            let values = years
                .iter()
                .map(|year| {
                    let days = cells
                        .get(&(ranked.name.as_str(), *year))
                        .copied()
                        .unwrap_or(0);
                    if cumulative {
                        running += days;
                        running
                    } else {
                        days
                    }
                })
                .collect();
            CitySeries {
                city: ranked.name,
                values,
            }
        })
        .collect();

    YearSeries {
        years,
        cumulative,
        series,
    }
}

/// Log-scaled country shading in `[0, 1]`, highest total first.
pub fn country_intensities(aggregate: &LocationAggregate) -> Vec<CountryIntensity> {
    let ranked = aggregate.ranked_countries();
    let scaled: Vec<f64> = ranked
        .iter()
        .map(|r| {
            if r.days > 0 {
                (r.days as f64).ln() + 1.0
            } else {
                0.0
            }
        })
        .collect();
    let max = scaled.iter().copied().fold(0.0_f64, f64::max);

    ranked
        .into_iter()
        .zip(scaled)
        .map(|(r, value)| CountryIntensity {
            country: r.name,
            days: r.days,
            intensity: if max > 0.0 { value / max } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stay(city: &str, country: &str, start: NaiveDate, end: NaiveDate) -> LocationRecord {
        LocationRecord::new(city, country, start, Some(end))
    }

    fn aggregator() -> IntervalAggregator {
        IntervalAggregator::new(date(2024, 6, 30))
    }

    fn history() -> Vec<LocationRecord> {
        vec![
            stay("Barcelona", "Spain", date(2018, 9, 1), date(2019, 6, 30)),
            stay("Castelló", "Spain", date(2019, 7, 1), date(2019, 8, 31)),
            stay("Lyon", "France", date(2019, 9, 1), date(2020, 12, 31)),
            stay("Barcelona", " spain ", date(2021, 1, 1), date(2022, 3, 15)),
            stay("Berlin", "Germany", date(2022, 3, 15), date(2023, 2, 1)),
            LocationRecord::new("Lyon", "FRANCE", date(2023, 2, 2), None),
        ]
    }

    #[test]
    fn test_single_month_in_paris() {
        let records = vec![stay("Paris", "France", date(2020, 1, 1), date(2020, 1, 31))];
        let aggregate = aggregator().aggregate_by_location(&records).unwrap();

        assert_eq!(aggregate.cities.get("Paris"), Some(&31));
        assert_eq!(aggregate.countries.get("France"), Some(&31));
        assert_eq!(aggregate.cities.len(), 1);
        assert_eq!(aggregate.countries.len(), 1);
    }

    #[test]
    fn test_year_split_across_new_year() {
        let records = vec![stay("Paris", "France", date(2020, 12, 20), date(2021, 1, 10))];
        let agg = aggregator();

        let by_year = agg.days_by_year(&records).unwrap();
        assert_eq!(by_year.get(&2020), Some(&12));
        assert_eq!(by_year.get(&2021), Some(&10));

        let rows = agg.aggregate_by_year(&records, None, None).unwrap();
        assert_eq!(
            rows,
            vec![
                CityYearDays {
                    year: 2020,
                    city: "Paris".to_string(),
                    days: 12
                },
                CityYearDays {
                    year: 2021,
                    city: "Paris".to_string(),
                    days: 10
                },
            ]
        );
    }

    #[test]
    fn test_start_before_previous_end_is_rejected() {
        let records = vec![
            stay("Paris", "France", date(2020, 1, 1), date(2020, 3, 31)),
            stay("Rome", "Italy", date(2020, 2, 1), date(2020, 4, 30)),
        ];
        let err = aggregator().aggregate_by_location(&records).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OverlappingSpans {
                index: 1,
                previous_end: date(2020, 3, 31),
                start: date(2020, 2, 1),
            }
        );
    }

    #[test]
    fn test_unsorted_records_are_rejected() {
        let records = vec![
            stay("Paris", "France", date(2020, 5, 1), date(2020, 5, 31)),
            stay("Rome", "Italy", date(2020, 1, 1), date(2020, 1, 31)),
        ];
        let err = aggregator().aggregate_by_location(&records).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsortedRecords { index: 1, .. }
        ));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let records = vec![stay("Paris", "France", date(2020, 5, 1), date(2020, 4, 1))];
        let err = aggregator().aggregate_by_location(&records).unwrap_err();
        assert!(matches!(err, ValidationError::InvertedRange { index: 0, .. }));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(
            aggregator().aggregate_by_location(&[]).unwrap_err(),
            ValidationError::EmptyInput
        );
    }

    #[test]
    fn test_blank_country_is_rejected() {
        let records = vec![stay("Paris", "  ", date(2020, 1, 1), date(2020, 1, 2))];
        assert_eq!(
            aggregator().aggregate_by_location(&records).unwrap_err(),
            ValidationError::MissingField {
                index: 0,
                field: "country"
            }
        );
    }

    #[test]
    fn test_open_end_only_allowed_on_last_record() {
        let records = vec![
            LocationRecord::new("Paris", "France", date(2020, 1, 1), None),
            stay("Rome", "Italy", date(2020, 2, 1), date(2020, 2, 10)),
        ];
        assert_eq!(
            aggregator().aggregate_by_location(&records).unwrap_err(),
            ValidationError::OpenEndedNotLast { index: 0 }
        );
    }

    #[test]
    fn test_open_end_runs_through_as_of() {
        let records = vec![LocationRecord::new(
            "Paris",
            "France",
            date(2024, 6, 1),
            None,
        )];
        let aggregate = aggregator().aggregate_by_location(&records).unwrap();
        assert_eq!(aggregate.cities["Paris"], 30);
    }

    #[test]
    fn test_open_end_starting_after_as_of_is_inverted() {
        let records = vec![LocationRecord::new(
            "Paris",
            "France",
            date(2024, 7, 1),
            None,
        )];
        assert!(matches!(
            aggregator().aggregate_by_location(&records).unwrap_err(),
            ValidationError::InvertedRange { index: 0, .. }
        ));
    }

    #[test]
    fn test_single_day_counts_once() {
        let records = vec![stay("Paris", "France", date(2020, 3, 3), date(2020, 3, 3))];
        let aggregate = aggregator().aggregate_by_location(&records).unwrap();
        assert_eq!(aggregate.cities["Paris"], 1);
    }

    #[test]
    fn test_handoff_day_counted_once() {
        let records = vec![
            stay("Paris", "France", date(2020, 1, 1), date(2020, 1, 10)),
            stay("Rome", "Italy", date(2020, 1, 10), date(2020, 1, 20)),
        ];
        let aggregate = aggregator().aggregate_by_location(&records).unwrap();
        assert_eq!(aggregate.cities["Paris"], 9);
        assert_eq!(aggregate.cities["Rome"], 11);
        assert_eq!(aggregate.total_city_days(), 20);
    }

    #[test]
    fn test_single_day_stay_cannot_hand_off_its_day() {
        let records = vec![
            stay("Paris", "France", date(2020, 1, 10), date(2020, 1, 10)),
            stay("Rome", "Italy", date(2020, 1, 10), date(2020, 1, 20)),
        ];
        assert!(matches!(
            aggregator().aggregate_by_location(&records).unwrap_err(),
            ValidationError::OverlappingSpans { index: 1, .. }
        ));
    }

    #[test]
    fn test_names_are_normalized_before_grouping() {
        let records = vec![
            stay("Paris", "France", date(2020, 1, 1), date(2020, 1, 10)),
            stay("  paris ", " france", date(2020, 2, 1), date(2020, 2, 10)),
            stay("PARIS", "FRANCE", date(2020, 3, 1), date(2020, 3, 10)),
        ];
        let aggregate = aggregator().aggregate_by_location(&records).unwrap();
        assert_eq!(aggregate.cities.len(), 1);
        assert_eq!(aggregate.cities["Paris"], 30);
        assert_eq!(aggregate.countries["France"], 30);
    }

    #[test]
    fn test_conservation_across_groupings() {
        let agg = aggregator();
        let records = history();
        let spans = agg.day_spans(&records).unwrap();
        let span_total: u64 = spans.iter().map(|s| s.days).sum();

        let aggregate = agg.aggregate_by_location(&records).unwrap();
        assert_eq!(aggregate.total_city_days(), span_total);
        assert_eq!(aggregate.total_country_days(), span_total);

        let year_total: u64 = agg.days_by_year(&records).unwrap().values().sum();
        assert_eq!(year_total, span_total);

        let row_total: u64 = agg
            .aggregate_by_year(&records, None, None)
            .unwrap()
            .iter()
            .map(|r| r.days)
            .sum();
        assert_eq!(row_total, span_total);
    }

    #[test]
    fn test_each_span_splits_exactly_across_years() {
        let spans = aggregator().day_spans(&history()).unwrap();
        for span in spans {
            let split: u64 = span.years().map(|y| span.days_in_year(y)).sum();
            assert_eq!(split, span.days, "span {}", span.index);
        }
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let agg = aggregator();
        let records = history();
        assert_eq!(
            agg.aggregate_by_location(&records).unwrap(),
            agg.aggregate_by_location(&records).unwrap()
        );
        assert_eq!(
            agg.aggregate_by_year(&records, Some(2), None).unwrap(),
            agg.aggregate_by_year(&records, Some(2), None).unwrap()
        );
    }

    fn three_cities() -> Vec<LocationRecord> {
        // A: 100 days, B: 50 days, C: 10 days, all in 2021
        vec![
            stay("A", "X", date(2021, 1, 1), date(2021, 4, 10)),
            stay("B", "X", date(2021, 5, 1), date(2021, 6, 19)),
            stay("C", "X", date(2021, 7, 1), date(2021, 7, 10)),
        ]
    }

    #[test]
    fn test_top_n_keeps_highest_cities() {
        let rows = aggregator()
            .aggregate_by_year(&three_cities(), Some(2), None)
            .unwrap();
        let cities: Vec<_> = rows.iter().map(|r| (r.city.as_str(), r.days)).collect();
        assert_eq!(cities, vec![("A", 100), ("B", 50)]);
    }

    #[test]
    fn test_exclude_top_n_keeps_long_tail() {
        let rows = aggregator()
            .aggregate_by_year(&three_cities(), None, Some(1))
            .unwrap();
        let cities: Vec<_> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["B", "C"]);
    }

    #[test]
    fn test_top_n_and_exclude_are_exclusive() {
        let err = aggregator()
            .aggregate_by_year(&three_cities(), Some(2), Some(1))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ConflictingRankFilter {
                top_n: 2,
                exclude_top_n: 1
            }
        );
    }

    #[test]
    fn test_ties_rank_by_city_name() {
        let records = vec![
            stay("Zurich", "Switzerland", date(2021, 1, 1), date(2021, 1, 10)),
            stay("Amsterdam", "Netherlands", date(2021, 2, 1), date(2021, 2, 10)),
            stay("Madrid", "Spain", date(2021, 3, 1), date(2021, 3, 10)),
        ];
        let agg = aggregator();

        let top = agg.aggregate_by_year(&records, Some(2), None).unwrap();
        let cities: Vec<_> = top.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["Amsterdam", "Madrid"]);

        let ranked = agg.aggregate_by_location(&records).unwrap().ranked_cities();
        assert_eq!(ranked[2].name, "Zurich");
    }

    #[test]
    fn test_rows_ordered_by_year_then_days() {
        let rows = aggregator()
            .aggregate_by_year(&history(), None, None)
            .unwrap();
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.year < b.year || (a.year == b.year && a.days >= b.days));
        }
        assert_eq!(rows.first().map(|r| r.year), Some(2018));
        assert_eq!(rows.last().map(|r| r.year), Some(2024));
    }

    #[test]
    fn test_year_series_fills_gaps_and_accumulates() {
        let rows = vec![
            CityYearDays {
                year: 2019,
                city: "Lyon".to_string(),
                days: 10,
            },
            CityYearDays {
                year: 2021,
                city: "Lyon".to_string(),
                days: 5,
            },
            CityYearDays {
                year: 2021,
                city: "Oslo".to_string(),
                days: 3,
            },
        ];

        let plain = year_series(&rows, false);
        assert_eq!(plain.years, vec![2019, 2020, 2021]);
        assert_eq!(plain.series[0].city, "Lyon");
        assert_eq!(plain.series[0].values, vec![10, 0, 5]);
        assert_eq!(plain.series[1].values, vec![0, 0, 3]);

        let cumulative = year_series(&rows, true);
        assert!(cumulative.cumulative);
        assert_eq!(cumulative.series[0].values, vec![10, 10, 15]);
    }

    #[test]
    fn test_year_series_of_nothing_is_empty() {
        let series = year_series(&[], true);
        assert!(series.years.is_empty());
        assert!(series.series.is_empty());
    }

    #[test]
    fn test_country_intensities_scale_to_one() {
        let aggregate = aggregator().aggregate_by_location(&history()).unwrap();
        let intensities = country_intensities(&aggregate);

        assert_eq!(intensities.len(), 3);
        assert!((intensities[0].intensity - 1.0).abs() < f64::EPSILON);
        assert!(intensities
            .iter()
            .all(|c| c.intensity > 0.0 && c.intensity <= 1.0));
    }
}
