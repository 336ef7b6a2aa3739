use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser as _;
use tracing::Level;

mod analysis;
mod audio;
mod chart;
mod cli;
mod error;
mod loudness;

use chart::ChartSpec;
use error::Error;
use loudness::{LogScan, window::WindowSizing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    if !args.input.is_file() {
        return Err(Error::InputNotFound(args.input.clone()).into());
    }

    let media = match audio::probe(&args.input) {
        Ok(media) => media,
        Err(err) => {
            tracing::debug!("probe failed for {}: {err}", args.input.display());
            audio::MediaInfo::default()
        }
    };

    let analyzer = analysis::get_analyzer(args.analyzer);
    let log = tempfile::Builder::new()
        .prefix("psr-meter-")
        .suffix(".log")
        .tempfile()?;
    tracing::info!("analyzing {} with {}", args.input.display(), analyzer.name());
    analyzer.write_log(&args.input, log.path()).await?;

    let scan = LogScan::read(BufReader::new(File::open(log.path())?))?;
    tracing::debug!("{} frames in analyzer log", scan.frames);
    let duration = media
        .duration
        .or(scan.duration)
        .or(scan.last_frame_time)
        .ok_or_else(|| Error::UnknownDuration(args.input.clone()))?;

    let sizing = WindowSizing::new(duration, args.windows);
    tracing::info!(
        "duration {duration:.1}s, {} frames per window, offset {:.2}s",
        sizing.frames,
        sizing.time_offset
    );

    let mut scratch = None;
    let dataset: Option<PathBuf> = match (&args.data, args.no_chart) {
        (Some(path), _) => Some(path.clone()),
        (None, false) => {
            let file = tempfile::Builder::new()
                .prefix("psr-meter-")
                .suffix(".dat")
                .tempfile()?;
            let path = file.path().to_path_buf();
            scratch = Some(file);
            Some(path)
        }
        (None, true) => None,
    };

    let out: Box<dyn Write> = match &dataset {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let rows = loudness::write_dataset(BufReader::new(File::open(log.path())?), &sizing, out)?;
    tracing::info!("{rows} rows written");

    if let (false, Some(dataset)) = (args.no_chart, dataset) {
        let spec = ChartSpec {
            title: args
                .title
                .clone()
                .or(media.title)
                .unwrap_or_else(|| audio::file_title(&args.input)),
            dataset,
            output: args.output_path(),
            psr_offset: sizing.time_offset,
            summary: scan.summary,
            width: args.size.0,
            height: args.size.1,
        };
        chart::render(&spec).await?;
    }

    drop(scratch);
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
