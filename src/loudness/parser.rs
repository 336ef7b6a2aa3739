use std::sync::LazyLock;

use regex::Regex;

pub const TIME_LABEL: &str = "t:";
pub const MOMENTARY_LABEL: &str = "M:";
pub const SHORT_TERM_LABEL: &str = "S:";
pub const INTEGRATED_LABEL: &str = "I:";
pub const RANGE_LABEL: &str = "LRA:";
/// Per-frame true peak, one reading per channel.
pub const PEAK_LABEL: &str = "FTPK:";

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+))").unwrap());

/// A channel reading; silent channels print as `-inf`.
const READING: &str = r"[-+]?(?:\d+\.?\d*|\.\d+|inf)";

static READING_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*({READING})\s+({READING})")).unwrap());

static READING_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*({READING})")).unwrap());

/// One analyzer frame. `None` marks a field that was absent or unreadable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    pub time: f64,
    pub momentary: Option<f64>,
    pub short_term: Option<f64>,
    pub integrated: Option<f64>,
    pub loudness_range: Option<f64>,
    pub peak: Option<f64>,
}

impl FrameRecord {
    /// Parses a frame line. Lines without a time value or without a momentary
    /// label are not frames (banners, summary lines) and give `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let time = extract(line, TIME_LABEL)?;
        if !line.contains(MOMENTARY_LABEL) {
            return None;
        }
        Some(FrameRecord {
            time,
            momentary: extract(line, MOMENTARY_LABEL),
            short_term: extract(line, SHORT_TERM_LABEL),
            integrated: extract(line, INTEGRATED_LABEL),
            loudness_range: extract(line, RANGE_LABEL),
            peak: extract_peak(line, PEAK_LABEL),
        })
    }
}

/// Reads the number following the first occurrence of `label`.
///
/// Only the leftmost occurrence is considered: if it is not followed by a
/// number the field is missing, even when a later occurrence would parse.
pub fn extract(line: &str, label: &str) -> Option<f64> {
    let rest = after_label(line, label)?;
    NUMBER
        .captures(rest)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Reads the louder of the two channel readings following `label`, or a lone
/// reading when the line only carries one channel. Silent (`-inf`) channels
/// are skipped; if no channel has a finite reading the peak is missing.
pub fn extract_peak(line: &str, label: &str) -> Option<f64> {
    let rest = after_label(line, label)?;
    let caps = READING_PAIR
        .captures(rest)
        .or_else(|| READING_SINGLE.captures(rest))?;
    caps.iter()
        .skip(1)
        .flatten()
        .filter_map(|reading| reading.as_str().parse::<f64>().ok())
        .filter(|reading| reading.is_finite())
        .reduce(f64::max)
}

fn after_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.find(label).map(|idx| &line[idx + label.len()..])
}
