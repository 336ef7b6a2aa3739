use std::path::Path;

use async_trait::async_trait;

mod ffmpeg;
mod lufs_analyzer;

pub use ffmpeg::FfmpegAnalyzer;
pub use lufs_analyzer::LufsAnalyzer;

/// Produces an EBU R128 measurement log for a media file: a `Duration:`
/// banner, one frame line every 100 ms and a trailing `Summary:` section.
#[async_trait]
pub trait Analyze: Send + Sync {
    fn name(&self) -> &'static str;
    async fn write_log(&self, input: &Path, log: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnalyzerType {
    /// ffmpeg's ebur128 filter
    Ffmpeg,
    /// built-in decoder and meter
    Lufs,
}

pub fn get_analyzer(analyzer_type: AnalyzerType) -> Box<dyn Analyze> {
    match analyzer_type {
        AnalyzerType::Ffmpeg => Box::new(FfmpegAnalyzer::default()),
        AnalyzerType::Lufs => Box::new(LufsAnalyzer),
    }
}
