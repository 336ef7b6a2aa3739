use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

use crate::error::Error;
use crate::loudness::summary::Summary;

const GNUPLOT: &str = "gnuplot";

/// Everything the gnuplot script needs to draw one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub psr_offset: f64,
    pub summary: Summary,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    pub fn script(&self) -> String {
        let data = quote(&self.dataset);
        let mut script = String::new();
        script.push_str(&format!(
            "set terminal pngcairo size {},{} enhanced font 'Sans,10'\n",
            self.width, self.height
        ));
        script.push_str(&format!("set output {}\n", quote(&self.output)));
        script.push_str(&format!(
            "set title \"{}\\n{}\"\n",
            escape(&self.title),
            escape(&self.subtitle())
        ));
        script.push_str(
            "set xlabel 'Time (s)'
set ylabel 'Loudness (LUFS) / Peak (dBFS)'
set y2label 'LRA (LU) / PSR (dB)'
set ytics nomirror
set y2tics
set yrange [-60:0]
set y2range [0:30]
set grid
set key outside bottom center horizontal
set datafile missing '-'
",
        );

        let mut series = vec![
            format!("{data} using 1:2 with lines lw 1 title 'Momentary'"),
            "'' using 1:3 with lines lw 2 title 'Short-term'".to_string(),
            "'' using 1:4 with lines lw 2 title 'Integrated'".to_string(),
            "'' using 1:6 with lines lw 1 title 'True peak'".to_string(),
            "'' using 1:5 axes x1y2 with lines lw 2 title 'Loudness range'".to_string(),
            format!(
                "'' using ($1{:+.2}):7 axes x1y2 with linespoints pt 7 ps 0.5 title 'PSR'",
                self.psr_offset
            ),
        ];
        if let Some(integrated) = self.summary.integrated {
            series.push(format!(
                "{integrated:.1} with lines dashtype 2 lw 1 title 'Integrated (final)'"
            ));
        }
        script.push_str("plot ");
        script.push_str(&series.join(", \\\n     "));
        script.push('\n');
        script
    }

    fn subtitle(&self) -> String {
        let value = |v: Option<f64>| v.map_or_else(|| "?".to_string(), |v| format!("{v:.1}"));
        let mut subtitle = format!(
            "Integrated: {} LUFS   LRA: {} LU",
            value(self.summary.integrated),
            value(self.summary.loudness_range)
        );
        if let (Some(low), Some(high)) = (self.summary.range_low, self.summary.range_high) {
            subtitle.push_str(&format!(" ({low:.1} .. {high:.1} LUFS)"));
        }
        if let Some(peak) = self.summary.true_peak {
            subtitle.push_str(&format!("   True peak: {peak:.1} dBFS"));
        }
        subtitle
    }
}

/// Pipes the chart script to gnuplot.
pub async fn render(spec: &ChartSpec) -> anyhow::Result<()> {
    let mut child = Command::new(GNUPLOT)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|source| Error::ToolMissing {
            tool: GNUPLOT,
            source,
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(spec.script().as_bytes()).await?;
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(Error::ToolFailed {
            tool: GNUPLOT,
            status,
        }
        .into());
    }
    tracing::info!("chart written to {}", spec.output.display());
    Ok(())
}

/// Single-quoted gnuplot string; embedded quotes are doubled.
fn quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
