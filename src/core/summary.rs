use crate::core::aggregator::{first_seen_labels, normalize_key, IntervalAggregator};
use crate::core::matching::closest_match;
use crate::domain::model::{
    BasicStats, CitySummary, CountrySummary, DaySpan, LocationRecord, MatchMode, YearSummary,
};
use crate::utils::error::Result;
use std::collections::HashSet;

pub fn basic_stats(aggregator: &IntervalAggregator, records: &[LocationRecord]) -> Result<BasicStats> {
    if records.is_empty() {
        return Ok(BasicStats::default());
    }

    let spans = aggregator.day_spans(records)?;
    let total_days_lived: u64 = spans.iter().map(|s| s.days).sum();
    let years: HashSet<i32> = spans
        .iter()
        .flat_map(|s| s.years().filter(move |y| s.days_in_year(*y) > 0))
        .collect();

    Ok(BasicStats {
        total_days_lived,
        average_days_per_stay: total_days_lived as f64 / spans.len() as f64,
        number_of_stays: spans.len(),
        number_of_cities: distinct(&spans, |s| &s.city_key),
        number_of_countries: distinct(&spans, |s| &s.country_key),
        years_covered: years.len(),
    })
}

pub fn city_summary(
    aggregator: &IntervalAggregator,
    records: &[LocationRecord],
    city: &str,
    mode: MatchMode,
) -> Result<CitySummary> {
    let empty = CitySummary {
        city: city.to_string(),
        ..CitySummary::default()
    };
    if records.is_empty() {
        return Ok(empty);
    }

    let spans = aggregator.day_spans(records)?;
    let labels = first_seen_labels(spans.iter().map(|s| (&s.city_key, &s.city)));
    let Some(key) = resolve_key(city, labels.values().map(String::as_str), mode, "city") else {
        return Ok(empty);
    };

    let matching: Vec<&DaySpan> = spans.iter().filter(|s| s.city_key == key).collect();
    if matching.is_empty() {
        return Ok(empty);
    }

    Ok(CitySummary {
        city: labels[&key].clone(),
        total_days_lived: matching.iter().map(|s| s.days).sum(),
        first_stay: matching.iter().map(|s| s.start).min(),
        last_stay: matching.iter().map(|s| s.recorded_end).max(),
        number_of_stays: matching.len(),
    })
}

pub fn country_summary(
    aggregator: &IntervalAggregator,
    records: &[LocationRecord],
    country: &str,
    mode: MatchMode,
) -> Result<CountrySummary> {
    let empty = CountrySummary {
        country: country.to_string(),
        ..CountrySummary::default()
    };
    if records.is_empty() {
        return Ok(empty);
    }

    let spans = aggregator.day_spans(records)?;
    let labels = first_seen_labels(spans.iter().map(|s| (&s.country_key, &s.country)));
    let Some(key) = resolve_key(country, labels.values().map(String::as_str), mode, "country")
    else {
        return Ok(empty);
    };

    let matching: Vec<&DaySpan> = spans.iter().filter(|s| s.country_key == key).collect();
    if matching.is_empty() {
        return Ok(empty);
    }

    let city_labels = first_seen_labels(matching.iter().map(|s| (&s.city_key, &s.city)));
    let mut seen = HashSet::new();
    let cities: Vec<String> = matching
        .iter()
        .filter(|s| seen.insert(s.city_key.as_str()))
        .map(|s| city_labels[&s.city_key].clone())
        .collect();

    Ok(CountrySummary {
        country: labels[&key].clone(),
        total_days_lived: matching.iter().map(|s| s.days).sum(),
        number_of_cities: cities.len(),
        cities,
        first_stay: matching.iter().map(|s| s.start).min(),
        last_stay: matching.iter().map(|s| s.recorded_end).max(),
        number_of_stays: matching.len(),
    })
}

/// Stays that touch `year`, and the days of theirs that fall inside it.
pub fn year_summary(
    aggregator: &IntervalAggregator,
    records: &[LocationRecord],
    year: i32,
) -> Result<YearSummary> {
    let empty = YearSummary {
        year,
        ..YearSummary::default()
    };
    if records.is_empty() {
        return Ok(empty);
    }

    let spans = aggregator.day_spans(records)?;
    let in_year: Vec<DaySpan> = spans
        .into_iter()
        .filter(|s| s.days_in_year(year) > 0)
        .collect();

    Ok(YearSummary {
        year,
        days_lived: in_year.iter().map(|s| s.days_in_year(year)).sum(),
        number_of_countries: distinct(&in_year, |s| &s.country_key),
        number_of_cities: distinct(&in_year, |s| &s.city_key),
        number_of_stays: in_year.len(),
    })
}

fn distinct<'a>(spans: &'a [DaySpan], key: impl Fn(&'a DaySpan) -> &'a String) -> usize {
    spans.iter().map(key).collect::<HashSet<_>>().len()
}

fn resolve_key<'a>(
    query: &str,
    labels: impl Iterator<Item = &'a str>,
    mode: MatchMode,
    kind: &str,
) -> Option<String> {
    match mode {
        MatchMode::Exact => Some(normalize_key(query)),
        MatchMode::Fuzzy { cutoff } => match closest_match(query, labels, cutoff) {
            Some(found) => {
                tracing::info!("Using closest match for {}: {}", kind, found);
                Some(normalize_key(found))
            }
            None => {
                tracing::warn!("No close match found for {}: {}", kind, query);
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records() -> Vec<LocationRecord> {
        vec![
            LocationRecord::new("Castelló", "Spain", date(2019, 1, 1), Some(date(2019, 1, 31))),
            LocationRecord::new("Valencia", "Spain", date(2019, 2, 1), Some(date(2019, 12, 31))),
            LocationRecord::new("Lyon", "France", date(2020, 1, 1), Some(date(2020, 1, 31))),
            LocationRecord::new("castelló", "spain", date(2020, 2, 1), Some(date(2020, 2, 29))),
            LocationRecord::new("Lyon", "France", date(2020, 3, 1), None),
        ]
    }

    fn aggregator() -> IntervalAggregator {
        IntervalAggregator::new(date(2021, 1, 31))
    }

    #[test]
    fn test_basic_stats() {
        let stats = basic_stats(&aggregator(), &records()).unwrap();
        // 31 + 334 + 31 + 29 + 337
        assert_eq!(stats.total_days_lived, 762);
        assert_eq!(stats.number_of_stays, 5);
        assert_eq!(stats.number_of_cities, 3);
        assert_eq!(stats.number_of_countries, 2);
        assert_eq!(stats.years_covered, 3);
        assert!((stats.average_days_per_stay - 152.4).abs() < 1e-9);
    }

    #[test]
    fn test_basic_stats_of_empty_dataset() {
        assert_eq!(basic_stats(&aggregator(), &[]).unwrap(), BasicStats::default());
    }

    #[test]
    fn test_city_summary_exact_ignores_case() {
        let summary =
            city_summary(&aggregator(), &records(), "CASTELLÓ", MatchMode::Exact).unwrap();
        assert_eq!(summary.city, "Castelló");
        assert_eq!(summary.total_days_lived, 60);
        assert_eq!(summary.number_of_stays, 2);
        assert_eq!(summary.first_stay, Some(date(2019, 1, 1)));
        assert_eq!(summary.last_stay, Some(date(2020, 2, 29)));
    }

    #[test]
    fn test_city_summary_fuzzy_finds_misspelling() {
        let summary = city_summary(
            &aggregator(),
            &records(),
            "Castello",
            MatchMode::Fuzzy { cutoff: 0.8 },
        )
        .unwrap();
        assert_eq!(summary.city, "Castelló");
        assert_eq!(summary.total_days_lived, 60);
    }

    #[test]
    fn test_city_summary_without_match_is_empty() {
        let summary = city_summary(
            &aggregator(),
            &records(),
            "Reykjavik",
            MatchMode::Fuzzy { cutoff: 0.8 },
        )
        .unwrap();
        assert_eq!(summary.city, "Reykjavik");
        assert_eq!(summary.total_days_lived, 0);
        assert_eq!(summary.first_stay, None);
    }

    #[test]
    fn test_open_stay_ends_at_as_of() {
        let summary = city_summary(&aggregator(), &records(), "Lyon", MatchMode::Exact).unwrap();
        assert_eq!(summary.last_stay, Some(date(2021, 1, 31)));
        assert_eq!(summary.total_days_lived, 31 + 337);
    }

    #[test]
    fn test_country_summary_lists_cities_in_order() {
        let summary =
            country_summary(&aggregator(), &records(), "spain", MatchMode::Exact).unwrap();
        assert_eq!(summary.country, "Spain");
        assert_eq!(summary.cities, vec!["Castelló", "Valencia"]);
        assert_eq!(summary.number_of_cities, 2);
        assert_eq!(summary.number_of_stays, 3);
        assert_eq!(summary.total_days_lived, 31 + 334 + 29);
    }

    #[test]
    fn test_year_summary_counts_days_inside_year() {
        let summary = year_summary(&aggregator(), &records(), 2021).unwrap();
        assert_eq!(summary.days_lived, 31);
        assert_eq!(summary.number_of_stays, 1);
        assert_eq!(summary.number_of_cities, 1);

        let summary = year_summary(&aggregator(), &records(), 2020).unwrap();
        assert_eq!(summary.days_lived, 366);
        assert_eq!(summary.number_of_countries, 2);
        assert_eq!(summary.number_of_stays, 3);
    }

    #[test]
    fn test_invalid_history_propagates() {
        let mut bad = records();
        bad.swap(0, 1);
        assert!(basic_stats(&aggregator(), &bad).is_err());
    }
}
