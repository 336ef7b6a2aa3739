use std::io::{BufRead, Write};

pub mod parser;
pub mod summary;
pub mod table;
pub mod window;

use parser::FrameRecord;
use summary::Summary;
use window::{PsrAggregator, WindowSizing};

/// What a first pass over an analyzer log learns before windowing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogScan {
    pub duration: Option<f64>,
    pub last_frame_time: Option<f64>,
    pub frames: usize,
    pub summary: Summary,
}

impl LogScan {
    pub fn read<R: BufRead>(log: R) -> anyhow::Result<Self> {
        let mut scan = LogScan::default();
        let mut lines = Vec::new();
        for line in log.lines() {
            let line = line?;
            if scan.duration.is_none() {
                scan.duration = summary::parse_duration(&line);
            }
            if let Some(frame) = FrameRecord::parse(&line) {
                scan.last_frame_time = Some(frame.time);
                scan.frames += 1;
                lines.clear();
            } else {
                lines.push(line);
            }
        }
        // only the tail after the last frame can hold the summary
        scan.summary = Summary::parse(lines.iter().map(String::as_str));
        Ok(scan)
    }
}

/// Runs every frame of `log` through one aggregator and writes the dataset.
/// Returns the number of rows written.
pub fn write_dataset<R: BufRead, W: Write>(
    log: R,
    sizing: &WindowSizing,
    mut out: W,
) -> anyhow::Result<usize> {
    let mut aggregator = PsrAggregator::new(sizing);
    let mut rows = 0;
    for line in log.lines() {
        let line = line?;
        let Some(frame) = FrameRecord::parse(&line) else {
            continue;
        };
        table::write_row(&mut out, &aggregator.push(frame))?;
        rows += 1;
    }
    out.flush()?;
    tracing::trace!(
        "last window left open with {} frames, peak {:.1} dBFS",
        aggregator.frames_in_window(),
        aggregator.max_peak_in_window()
    );
    Ok(rows)
}
