use std::path::PathBuf;

use clap::Parser;

use crate::analysis::AnalyzerType;
use crate::loudness::window::DEFAULT_WINDOW_COUNT;

/// Loudness and peak-to-short-term ratio chart for an audio or video file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(required = true, help = "Audio or video file to analyze")]
    pub input: PathBuf,

    #[arg(short, long, help = "Chart image path [default: <input>.png]")]
    pub output: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = AnalyzerType::Ffmpeg,
        help = "Loudness analyzer to run"
    )]
    pub analyzer: AnalyzerType,

    #[arg(
        short,
        long,
        default_value_t = DEFAULT_WINDOW_COUNT,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of PSR windows across the whole program"
    )]
    pub windows: u32,

    #[arg(long, help = "Keep the dataset at this path")]
    pub data: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = false,
        action,
        help = "Only write the dataset (to --data, or stdout)"
    )]
    pub no_chart: bool,

    #[arg(
        long,
        value_parser = parse_size,
        default_value = "1920x1080",
        help = "Chart size as WIDTHxHEIGHT"
    )]
    pub size: (u32, u32),

    #[arg(short, long, help = "Chart title [default: from tags or file name]")]
    pub title: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-v, -vv, -vvv)")]
    pub verbose: u8,
}

impl Args {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("png"))
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = width.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let height = height.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("chart size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["psr-meter", "song.flac"]).unwrap();
        assert_eq!(args.analyzer, AnalyzerType::Ffmpeg);
        assert_eq!(args.windows, 200);
        assert_eq!(args.size, (1920, 1080));
        assert_eq!(args.output_path(), PathBuf::from("song.png"));
        assert!(!args.no_chart);
    }

    #[test]
    fn overrides() {
        let args = Args::try_parse_from([
            "psr-meter", "clip.mkv", "-a", "lufs", "-w", "50", "--size", "800x600", "-o", "c.png",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.analyzer, AnalyzerType::Lufs);
        assert_eq!(args.windows, 50);
        assert_eq!(args.size, (800, 600));
        assert_eq!(args.output_path(), PathBuf::from("c.png"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Args::try_parse_from(["psr-meter", "a.flac", "-w", "0"]).is_err());
        assert!(Args::try_parse_from(["psr-meter", "a.flac", "--size", "800"]).is_err());
        assert!(parse_size("0x10").is_err());
    }
}
