use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::Analyze;
use crate::error::Error;

const FFMPEG: &str = "ffmpeg";

pub struct FfmpegAnalyzer {
    program: String,
}

impl Default for FfmpegAnalyzer {
    fn default() -> Self {
        FfmpegAnalyzer {
            program: FFMPEG.to_string(),
        }
    }
}

impl FfmpegAnalyzer {
    fn command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-nostats")
            .arg("-i")
            .arg(input)
            .args(["-vn", "-af", "ebur128=peak=true", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }
}

#[async_trait]
impl Analyze for FfmpegAnalyzer {
    fn name(&self) -> &'static str {
        FFMPEG
    }

    async fn write_log(&self, input: &Path, log: &Path) -> anyhow::Result<()> {
        let log_file = std::fs::File::create(log)?;
        tracing::debug!("running {} on {}", self.program, input.display());
        let status = self
            .command(input)
            .stderr(Stdio::from(log_file))
            .status()
            .await
            .map_err(|source| Error::ToolMissing {
                tool: FFMPEG,
                source,
            })?;
        if !status.success() {
            return Err(Error::ToolFailed {
                tool: FFMPEG,
                status,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line() {
        let analyzer = FfmpegAnalyzer::default();
        let cmd = analyzer.command(Path::new("clip.mkv"));
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            ["-nostats", "-i", "clip.mkv", "-vn", "-af", "ebur128=peak=true", "-f", "null", "-"]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let analyzer = FfmpegAnalyzer {
            program: "/nonexistent/ffmpeg".to_string(),
        };
        let err = analyzer
            .write_log(Path::new("in.flac"), &dir.path().join("log.txt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ToolMissing { tool: "ffmpeg", .. })
        ));
        Ok(())
    }
}
