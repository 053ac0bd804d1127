use crate::dataset::PlannedActual;
use regex::Regex;
use std::sync::LazyLock;

/// Digit groups with optional thousands separators and decimal part. The
/// decimal part is allowed to repeat so that "1.2.3" is captured as one
/// malformed token and skipped, rather than split into two numbers. A dot
/// with no digit after it ends the token.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)*").expect("number pattern is valid"));

/// A document line with its lower-cased form computed once.
pub(crate) struct Line<'a> {
    raw: &'a str,
    lower: String,
}

pub(crate) fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .map(|raw| Line {
            raw,
            lower: raw.to_lowercase(),
        })
        .collect()
}

/// Every numeric token on the line that parses, in left-to-right order.
pub(crate) fn numbers_on_line(line: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(line)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

/// Ordered keyword/line scan for count indicators.
///
/// Keywords are tried in the given order; for each keyword, lines are tried
/// top to bottom. The first line that contains the keyword (as a plain
/// substring) and carries a number decides the result. Lines that match but
/// hold no number do not stop the scan.
pub(crate) fn find_single(lines: &[Line<'_>], keywords: &[String]) -> Option<f64> {
    keywords.iter().find_map(|keyword| {
        matching(lines, keyword).find_map(|line| numbers_on_line(line.raw).first().copied())
    })
}

/// Planned / actual scan. Only the first line containing a keyword is read;
/// when it has no number the next keyword is tried.
///
/// Two numbers: planned then actual. One number: actual only.
pub(crate) fn find_planned_actual(
    lines: &[Line<'_>],
    keywords: &[String],
) -> Option<PlannedActual> {
    keywords.iter().find_map(|keyword| {
        let line = matching(lines, keyword).next()?;
        match numbers_on_line(line.raw).as_slice() {
            [] => None,
            [actual] => Some(PlannedActual {
                planned: None,
                actual: Some(*actual),
            }),
            [planned, actual, ..] => Some(PlannedActual {
                planned: Some(*planned),
                actual: Some(*actual),
            }),
        }
    })
}

fn matching<'l, 'a>(
    lines: &'l [Line<'a>],
    keyword: &'l str,
) -> impl Iterator<Item = &'l Line<'a>> {
    lines.iter().filter(move |l| l.lower.contains(keyword))
}
