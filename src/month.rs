//! Canonical months and month field name normalisation.
//!
//! Records name their month fields inconsistently: full names and three-letter abbreviations, in
//! upper, title or lower case. Every recognised spelling parses to exactly one [Month].


use serde::Serialize;
use strum_macros::Display;

/// A calendar month, identified by its canonical three-letter code.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// All months in calendar order.
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Parse a record field name into a month.
    ///
    /// Matching is exact and case-sensitive against the recognised spellings. Mixed case
    /// spellings such as `jAN` are not months.
    pub fn parse(field: &str) -> Option<Month> {
        let month = match field {
            "JANUARY" | "January" | "january" | "JAN" | "Jan" | "jan" => Month::Jan,
            "FEBRUARY" | "February" | "february" | "FEB" | "Feb" | "feb" => Month::Feb,
            "MARCH" | "March" | "march" | "MAR" | "Mar" | "mar" => Month::Mar,
            "APRIL" | "April" | "april" | "APR" | "Apr" | "apr" => Month::Apr,
            "MAY" | "May" | "may" => Month::May,
            "JUNE" | "June" | "june" | "JUN" | "Jun" | "jun" => Month::Jun,
            "JULY" | "July" | "july" | "JUL" | "Jul" | "jul" => Month::Jul,
            "AUGUST" | "August" | "august" | "AUG" | "Aug" | "aug" => Month::Aug,
            "SEPTEMBER" | "September" | "september" | "SEP" | "Sep" | "sep" => Month::Sep,
            "OCTOBER" | "October" | "october" | "OCT" | "Oct" | "oct" => Month::Oct,
            "NOVEMBER" | "November" | "november" | "NOV" | "Nov" | "nov" => Month::Nov,
            "DECEMBER" | "December" | "december" | "DEC" | "Dec" | "dec" => Month::Dec,
            _ => return None,
        };
        Some(month)
    }

    /// Returns the canonical three-letter code.
    pub fn code(self) -> &'static str {
        match self {
            Month::Jan => "JAN",
            Month::Feb => "FEB",
            Month::Mar => "MAR",
            Month::Apr => "APR",
            Month::May => "MAY",
            Month::Jun => "JUN",
            Month::Jul => "JUL",
            Month::Aug => "AUG",
            Month::Sep => "SEP",
            Month::Oct => "OCT",
            Month::Nov => "NOV",
            Month::Dec => "DEC",
        }
    }
}

/// Normalise a field name.
///
/// Returns the canonical month code if `field` is a recognised month spelling, otherwise returns
/// `field` unchanged. This is the string form of [Month::parse] for callers that key on field
/// names rather than [Month].
pub fn normalize(field: &str) -> &str {
    match Month::parse(field) {
        Some(month) => month.code(),
        None => field,
    }
}
