use crate::models::Season;

/// Text shown in place of a percentage when there is nothing to divide by
pub const NOT_APPLICABLE: &str = "N/A";

/// Format a win rate for display, e.g. "42.50% (17 wins from 40 starts)"
pub fn format_win_rate(rate: Option<f64>, wins: u32, starts: u32) -> String {
    match rate {
        Some(rate) => format!("{:.2}% ({} wins from {} starts)", rate * 100.0, wins, starts),
        None => format!("{} ({} wins from {} starts)", NOT_APPLICABLE, wins, starts),
    }
}

/// Collapse ascending seasons into ranges of consecutive years.
///
/// A lone season is still written as a range ("2005-2005"). Ranges are joined
/// with ", ", and an empty list gives an empty string.
pub fn compress_years_to_spans(years: &[Season]) -> String {
    let mut spans: Vec<(Season, Season)> = Vec::new();

    for &year in years {
        match spans.last_mut() {
            Some((_, end)) if u32::from(year) == u32::from(*end) + 1 => *end = year,
            _ => spans.push((year, year)),
        }
    }

    spans
        .iter()
        .map(|(start, end)| format!("{}-{}", start, end))
        .collect::<Vec<_>>()
        .join(", ")
}
