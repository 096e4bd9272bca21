//! Display-only annotations derived from field statistics
//!
//! Nothing here feeds back into type resolution.

use super::accumulator::{FieldStat, ObservedType};
use crate::types::Kind;

/// Fields with fewer distinct values than this list them individually
const LOW_CARDINALITY: usize = 10;

/// Integral values inside this bound are treated as enum-like
const DISCRETE_BOUND: f64 = 100.0;

/// Minimum observations for a full percentile summary
const PERCENTILE_MIN_SAMPLES: usize = 10;

/// Longest probed value shown verbatim
const MAX_VALUE_WIDTH: usize = 20;

/// Build the annotation text for a field, `None` if there is nothing to say
///
/// `level_samples` is the number of samples seen at the field's nesting
/// level; `kind` is the resolved kind of the field.
pub fn annotate(stat: &FieldStat, level_samples: usize, kind: Kind) -> Option<String> {
    let mut parts = Vec::new();

    if level_samples > 0 {
        let percentage = stat.total_count as f64 * 100.0 / level_samples as f64;
        parts.push(format!(
            "seen in {:.1}% ({}/{})",
            percentage, stat.total_count, level_samples
        ));
    }

    if stat.type_counts.len() > 1 {
        let mut distribution: Vec<String> = stat
            .type_counts
            .iter()
            .map(|(observed, count)| format!("{}:{}", observed, count))
            .collect();
        distribution.sort();
        parts.push(format!("types: {}", distribution.join(", ")));
    }

    if kind == Kind::String {
        if let Some(format) = uniform_format(stat) {
            parts.push(format!("format: {}", format));
        }
    }

    if kind == Kind::Numeric && !stat.numeric_values.is_empty() {
        if let Some(summary) = numeric_summary(stat) {
            parts.push(summary);
        }
    } else if let Some(summary) = value_summary(stat, true) {
        parts.push(summary);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The string format every string observation matched, if there is one
fn uniform_format(stat: &FieldStat) -> Option<&'static str> {
    let strings = stat.count(ObservedType::String);
    if strings == 0 || stat.string_formats.len() != 1 {
        return None;
    }
    stat.string_formats
        .iter()
        .next()
        .filter(|(_, count)| **count == strings)
        .map(|(format, _)| format.as_str())
}

fn numeric_summary(stat: &FieldStat) -> Option<String> {
    let values = &stat.numeric_values;
    let continuous = values
        .iter()
        .any(|v| v.fract() != 0.0 || *v < -DISCRETE_BOUND || *v > DISCRETE_BOUND);

    if continuous && values.len() > 2 {
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        if sorted.len() >= PERCENTILE_MIN_SAMPLES {
            return Some(format!(
                "range: [{}, p25:{}, p50:{}, p75:{}, p90:{}, p99:{}, {}]",
                format_number(min),
                format_number(percentile(&sorted, 0.25)),
                format_number(percentile(&sorted, 0.50)),
                format_number(percentile(&sorted, 0.75)),
                format_number(percentile(&sorted, 0.90)),
                format_number(percentile(&sorted, 0.99)),
                format_number(max),
            ));
        }
        return Some(format!("range: [{}, {}]", format_number(min), format_number(max)));
    }

    value_summary(stat, false)
}

/// Distinct values with their share, or just the cardinality
fn value_summary(stat: &FieldStat, quoted: bool) -> Option<String> {
    let distinct = stat.distinct_values();
    if distinct == 0 {
        return None;
    }

    if distinct >= LOW_CARDINALITY {
        if stat.probe_saturated() {
            return Some(format!("{}+ unique values", distinct));
        }
        return Some(format!("{} unique values", distinct));
    }

    let listed: Vec<String> = stat
        .value_order
        .iter()
        .filter_map(|value| {
            let count = stat.values.get(value)?;
            let percentage = *count as f64 * 100.0 / stat.total_count as f64;
            if quoted {
                Some(format!("{:?}:{:.1}%", truncate(value), percentage))
            } else {
                Some(format!("{}:{:.1}%", value, percentage))
            }
        })
        .collect();

    Some(format!("values: {}", listed.join(", ")))
}

fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_VALUE_WIDTH {
        let head: String = value.chars().take(MAX_VALUE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Linear-interpolation percentile over sorted samples
///
/// The position is `p * (n - 1)`; the result interpolates between the two
/// bracketing samples.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = lower + 1;
    if upper >= sorted.len() {
        return sorted[lower.min(sorted.len() - 1)];
    }
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Whole numbers print plainly, everything else with two significant digits
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v > -1_000_000.0 && v < 1_000_000.0 {
        return format!("{:.0}", v);
    }
    format_significant(v, 2)
}

/// Shortest of fixed or exponent notation with `digits` significant digits
fn format_significant(v: f64, digits: usize) -> String {
    if v == 0.0 || !v.is_finite() {
        return v.to_string();
    }

    let scientific = format!("{:.*e}", digits - 1, v);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_zeros(&mantissa), sign, exponent.abs());
    }

    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, v))
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stat_of(values: &[serde_json::Value]) -> FieldStat {
        let mut stat = FieldStat::new("f", 0);
        for v in values {
            stat.observe(v);
        }
        stat
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 1.0), 4.0);
        assert!((percentile(&sorted, 0.5) - 2.5).abs() < 1e-9);
        assert!((percentile(&sorted, 0.25) - 1.75).abs() < 1e-9);
        assert_eq!(percentile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(3.14159), "3.1");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(123456.7), "1.2e+05");
        assert_eq!(format_number(2_000_000.0), "2e+06");
        assert_eq!(format_number(0.00001234), "1.2e-05");
    }

    #[test]
    fn test_occurrence_and_type_distribution() {
        let stat = stat_of(&[json!(1), json!("x"), json!(null)]);
        let text = annotate(&stat, 4, Kind::Numeric).unwrap();
        assert!(text.starts_with("seen in 75.0% (3/4)"), "{text}");
        assert!(text.contains("types: null:1, number:1, string:1"), "{text}");
    }

    #[test]
    fn test_continuous_numbers_get_percentiles() {
        let values: Vec<_> = (1..=10).map(|i| json!(i as f64 + 0.5)).collect();
        let stat = stat_of(&values);
        let text = annotate(&stat, 10, Kind::Numeric).unwrap();
        assert!(text.contains("range: [1.5, p25:"), "{text}");
        assert!(text.contains(", p50:6, p75:"), "{text}");
        assert!(text.contains(", p99:10, "), "{text}");
        assert!(text.ends_with(']'), "{text}");
    }

    #[test]
    fn test_few_continuous_numbers_get_min_max() {
        let stat = stat_of(&[json!(1.5), json!(250), json!(3)]);
        let text = annotate(&stat, 3, Kind::Numeric).unwrap();
        assert!(text.ends_with("range: [1.5, 250]"), "{text}");
    }

    #[test]
    fn test_enum_like_numbers_list_values() {
        let stat = stat_of(&[json!(1), json!(2), json!(1), json!(1)]);
        let text = annotate(&stat, 4, Kind::Numeric).unwrap();
        assert!(text.ends_with("values: 1:75.0%, 2:25.0%"), "{text}");
    }

    #[test]
    fn test_low_cardinality_strings_are_quoted_and_truncated() {
        let stat = stat_of(&[
            json!("open"),
            json!("a very long status value indeed"),
        ]);
        let text = annotate(&stat, 2, Kind::String).unwrap();
        assert!(
            text.ends_with(r#"values: "open":50.0%, "a very long statu...":50.0%"#),
            "{text}"
        );
    }

    #[test]
    fn test_high_cardinality_reports_count() {
        let values: Vec<_> = (0..12).map(|i| json!(format!("v{i}"))).collect();
        let stat = stat_of(&values);
        let text = annotate(&stat, 12, Kind::String).unwrap();
        assert!(text.ends_with("12 unique values"), "{text}");

        let values: Vec<_> = (0..150).map(|i| json!(format!("v{i}"))).collect();
        let stat = stat_of(&values);
        let text = annotate(&stat, 150, Kind::String).unwrap();
        assert!(text.ends_with("100+ unique values"), "{text}");
    }

    #[test]
    fn test_uniform_string_format() {
        let stat = stat_of(&[json!("2024-01-01"), json!("2024-02-01")]);
        let text = annotate(&stat, 2, Kind::String).unwrap();
        assert!(text.contains("format: date"), "{text}");

        let mixed = stat_of(&[json!("2024-01-01"), json!("tomorrow")]);
        let text = annotate(&mixed, 2, Kind::String).unwrap();
        assert!(!text.contains("format:"), "{text}");
    }
}
