use super::parser::extract;

const SUMMARY_MARKER: &str = "Summary:";
const DURATION_LABEL: &str = "Duration:";

/// Whole-program values from the trailing summary section of an analyzer log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub integrated: Option<f64>,
    pub loudness_range: Option<f64>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub true_peak: Option<f64>,
}

impl Summary {
    /// Scans the lines after the last `Summary:` marker. The first readable
    /// value of each field is kept.
    pub fn parse<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut summary = Summary::default();
        let mut in_summary = false;
        for line in lines {
            if line.contains(SUMMARY_MARKER) {
                summary = Summary::default();
                in_summary = true;
                continue;
            }
            if !in_summary {
                continue;
            }
            fill(&mut summary.integrated, line, "I:");
            fill(&mut summary.loudness_range, line, "LRA:");
            fill(&mut summary.range_low, line, "LRA low:");
            fill(&mut summary.range_high, line, "LRA high:");
            fill(&mut summary.true_peak, line, "Peak:");
        }
        summary
    }
}

fn fill(slot: &mut Option<f64>, line: &str, label: &str) {
    if slot.is_none() {
        *slot = extract(line, label);
    }
}

/// Reads a `Duration: HH:MM:SS.ss` banner into seconds.
pub fn parse_duration(line: &str) -> Option<f64> {
    let idx = line.find(DURATION_LABEL)?;
    let stamp = line[idx + DURATION_LABEL.len()..]
        .trim_start()
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()?;
    let mut parts = stamp.split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600. + minutes * 60. + seconds)
}
