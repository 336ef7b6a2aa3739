use std::io::{self, Write};

use super::window::AugmentedRecord;

const TIME_WIDTH: usize = 11;
const FIELD_WIDTH: usize = 6;
const MISSING: &str = "-";

/// Formats one dataset row:
/// `time M S I LRA peak psr`, right-aligned, `-` for missing values.
pub fn format_row(record: &AugmentedRecord) -> String {
    let frame = &record.frame;
    let mut row = format!("{:>width$.3}", frame.time, width = TIME_WIDTH);
    for value in [
        frame.momentary,
        frame.short_term,
        frame.integrated,
        frame.loudness_range,
        frame.peak,
        record.psr,
    ] {
        let cell = match value {
            Some(v) => format!(" {:>width$.1}", v, width = FIELD_WIDTH),
            None => format!(" {:>width$}", MISSING, width = FIELD_WIDTH),
        };
        row.push_str(&cell);
    }
    row
}

pub fn write_row<W: Write>(out: &mut W, record: &AugmentedRecord) -> io::Result<()> {
    writeln!(out, "{}", format_row(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loudness::parser::FrameRecord;
    use approx::assert_abs_diff_eq;

    fn record(time: f64, psr: Option<f64>) -> AugmentedRecord {
        AugmentedRecord {
            frame: FrameRecord {
                time,
                momentary: Some(-18.44),
                short_term: Some(-120.7),
                integrated: Some(-21.),
                loudness_range: None,
                peak: Some(-0.26),
            },
            psr,
        }
    }

    fn parse_row(row: &str) -> Vec<Option<f64>> {
        row.split_whitespace()
            .map(|cell| if cell == MISSING { None } else { cell.parse().ok() })
            .collect()
    }

    #[test]
    fn fixed_width_layout() {
        let row = format_row(&record(12.3999, None));
        assert_eq!(row, "     12.400  -18.4 -120.7  -21.0      -   -0.3      -");
        let row = format_row(&record(7.0, Some(15.)));
        assert_eq!(row, "      7.000  -18.4 -120.7  -21.0      -   -0.3   15.0");
    }

    #[test]
    fn rows_parse_back_by_position() {
        let original = record(1234.5, Some(-3.24));
        let cells = parse_row(&format_row(&original));
        assert_eq!(cells.len(), 7);
        let frame = original.frame;
        let expected = [
            Some(frame.time),
            frame.momentary,
            frame.short_term,
            frame.integrated,
            frame.loudness_range,
            frame.peak,
            original.psr,
        ];
        for (cell, want) in cells.iter().zip(expected) {
            match (cell, want) {
                (Some(got), Some(want)) => assert_abs_diff_eq!(*got, want, epsilon = 0.05),
                (None, None) => {}
                other => panic!("mismatch: {other:?}"),
            }
        }
    }

    #[test]
    fn emitting_twice_is_identical() -> anyhow::Result<()> {
        let records: Vec<_> = (0..50)
            .map(|i| record(i as f64 / 10., (i % 5 == 0).then_some(9.9)))
            .collect();
        let mut first = Vec::new();
        let mut second = Vec::new();
        for r in &records {
            write_row(&mut first, r)?;
        }
        for r in &records {
            write_row(&mut second, r)?;
        }
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first)?.lines().count(), 50);
        Ok(())
    }
}
