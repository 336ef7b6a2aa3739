use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use async_trait::async_trait;
use ebur128::{EbuR128, Mode};
use symphonia::core::{audio::SampleBuffer, codecs::DecoderOptions, errors::Error as DecodeError};

use super::Analyze;
use crate::audio::get_probe;
use crate::error::Error;
use crate::loudness::window::FRAMES_PER_SECOND;

const TAG: &str = "[lufs]";
/// Short-term loudness needs a full 3 s window before it counts towards LRA.
const SHORT_TERM_SECONDS: u64 = 3;
const RANGE_ABSOLUTE_GATE: f64 = -70.;
const RANGE_RELATIVE_GATE: f64 = -20.;
const RANGE_LOW_PERCENTILE: f64 = 0.10;
const RANGE_HIGH_PERCENTILE: f64 = 0.95;

/// Decodes with symphonia and meters with ebur128, writing the same log
/// layout as ffmpeg's ebur128 filter.
pub struct LufsAnalyzer;

#[async_trait]
impl Analyze for LufsAnalyzer {
    fn name(&self) -> &'static str {
        "lufs"
    }

    async fn write_log(&self, input: &Path, log: &Path) -> anyhow::Result<()> {
        let input = input.to_path_buf();
        let log = log.to_path_buf();
        tokio::task::spawn_blocking(move || analyze_file(&input, &log)).await?
    }
}

fn analyze_file(input: &Path, log: &Path) -> anyhow::Result<()> {
    let mut out = BufWriter::new(File::create(log)?);
    let probed = get_probe(input)?;
    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .cloned()
        .ok_or_else(|| Error::NoAudioTrack(input.to_path_buf()))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;
    let track_id = track.id;
    let mut meter: Option<LufsMeter> = None;

    while let Some(packet) = until_end_of_stream(format.next_packet())? {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                if meter.is_none() {
                    meter = Some(LufsMeter::new(spec.channels.count() as u32, spec.rate)?);
                }
                let mut sample: SampleBuffer<f32> =
                    SampleBuffer::new(decoded.capacity() as u64, spec);
                sample.copy_interleaved_ref(decoded);
                if let Some(meter) = meter.as_mut() {
                    meter.add_frames(sample.samples(), &mut out)?;
                }
            }
            Err(DecodeError::DecodeError(err)) => {
                tracing::debug!("skipping undecodable packet: {err}");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    match meter {
        Some(meter) => meter.finish(&mut out)?,
        None => return Err(Error::NoAudioTrack(input.to_path_buf()).into()),
    }
    out.flush()?;
    Ok(())
}

/// End of stream ends the read loop; any other read failure is an error.
fn until_end_of_stream<T>(next: Result<T, DecodeError>) -> anyhow::Result<Option<T>> {
    match next {
        Ok(packet) => Ok(Some(packet)),
        Err(DecodeError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Feeds interleaved samples to ebur128 in 100 ms blocks and writes one
/// frame line per block.
pub struct LufsMeter {
    ebur128: EbuR128,
    channels: usize,
    sample_rate: u32,
    block_frames: usize,
    pending: Vec<f32>,
    frames_done: u64,
    short_terms: Vec<f64>,
}

impl LufsMeter {
    pub fn new(channels: u32, sample_rate: u32) -> anyhow::Result<Self> {
        let block_frames = ((sample_rate as f64 / FRAMES_PER_SECOND).round() as usize).max(1);
        Ok(LufsMeter {
            ebur128: EbuR128::new(
                channels,
                sample_rate,
                Mode::M | Mode::S | Mode::I | Mode::LRA | Mode::TRUE_PEAK,
            )?,
            channels: channels as usize,
            sample_rate,
            block_frames,
            pending: Vec::with_capacity(block_frames * channels as usize),
            frames_done: 0,
            short_terms: Vec::new(),
        })
    }

    pub fn add_frames<W: Write>(&mut self, samples: &[f32], out: &mut W) -> anyhow::Result<()> {
        self.pending.extend_from_slice(samples);
        let block = self.block_frames * self.channels;
        while self.pending.len() >= block {
            self.ebur128.add_frames_f32(&self.pending[..block])?;
            self.pending.drain(..block);
            self.frames_done += self.block_frames as u64;
            if self.frames_done >= SHORT_TERM_SECONDS * self.sample_rate as u64 {
                self.short_terms.push(self.ebur128.loudness_shortterm()?);
            }
            self.write_frame(out)?;
        }
        Ok(())
    }

    fn write_frame<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        let time = self.frames_done as f64 / self.sample_rate as f64;
        let mut peaks = String::new();
        for channel in 0..self.channels {
            let peak = to_dbfs(self.ebur128.prev_true_peak(channel as u32)?);
            peaks.push_str(&format!(" {}", level(peak)));
        }
        writeln!(
            out,
            "{} t: {:<10} TARGET:-23 LUFS    M:{:>6} S:{:>6}     I:{:>6} LUFS       LRA:{:>6} LU  FTPK:{} dBFS",
            TAG,
            format!("{time:.1}"),
            level(self.ebur128.loudness_momentary()?),
            level(self.ebur128.loudness_shortterm()?),
            level(self.ebur128.loudness_global()?),
            level(self.ebur128.loudness_range()?),
            peaks,
        )?;
        Ok(())
    }

    /// Meters the trailing partial block and writes the duration banner and
    /// the summary section.
    pub fn finish<W: Write>(mut self, out: &mut W) -> anyhow::Result<()> {
        let leftover = self.pending.len() / self.channels.max(1);
        if leftover > 0 {
            self.ebur128
                .add_frames_f32(&self.pending[..leftover * self.channels])?;
        }
        let duration = (self.frames_done + leftover as u64) as f64 / self.sample_rate as f64;

        let mut true_peak = f64::NEG_INFINITY;
        for channel in 0..self.channels {
            true_peak = true_peak.max(to_dbfs(self.ebur128.true_peak(channel as u32)?));
        }

        writeln!(out, "  Duration: {}", timestamp(duration))?;
        writeln!(out, "{} Summary:", TAG)?;
        writeln!(out)?;
        writeln!(out, "  Integrated loudness:")?;
        writeln!(out, "    I:         {:>5} LUFS", level(self.ebur128.loudness_global()?))?;
        writeln!(out)?;
        writeln!(out, "  Loudness range:")?;
        writeln!(out, "    LRA:       {:>5} LU", level(self.ebur128.loudness_range()?))?;
        if let Some((low, high)) = range_bounds(&self.short_terms) {
            writeln!(out, "    LRA low:   {:>5} LUFS", level(low))?;
            writeln!(out, "    LRA high:  {:>5} LUFS", level(high))?;
        }
        writeln!(out)?;
        writeln!(out, "  True peak:")?;
        writeln!(out, "    Peak:      {:>5} dBFS", level(true_peak))?;
        Ok(())
    }
}

/// EBU Tech 3342 loudness range bounds: short-term values above the absolute
/// gate and within 20 LU of their energy mean, then the 10th and 95th
/// percentiles.
fn range_bounds(short_terms: &[f64]) -> Option<(f64, f64)> {
    let gated: Vec<f64> = short_terms
        .iter()
        .copied()
        .filter(|l| l.is_finite() && *l > RANGE_ABSOLUTE_GATE)
        .collect();
    if gated.is_empty() {
        return None;
    }
    let mean_energy = gated
        .iter()
        .map(|l| 10f64.powf((l + 0.691) / 10.))
        .sum::<f64>()
        / gated.len() as f64;
    let relative_gate = 10. * mean_energy.log10() - 0.691 + RANGE_RELATIVE_GATE;

    // the loudest value is never below the energy mean, so this is non-empty
    let mut kept: Vec<f64> = gated.into_iter().filter(|l| *l >= relative_gate).collect();
    kept.sort_by(f64::total_cmp);
    let last = (kept.len() - 1) as f64;
    let low = kept[(last * RANGE_LOW_PERCENTILE + 0.5) as usize];
    let high = kept[(last * RANGE_HIGH_PERCENTILE + 0.5) as usize];
    Some((low, high))
}

fn to_dbfs(linear: f64) -> f64 {
    if linear > 0. {
        20. * linear.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// One decimal, or `-inf` the way ffmpeg prints silence.
fn level(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}")
    } else {
        "-inf".to_string()
    }
}

fn timestamp(seconds: f64) -> String {
    let hours = (seconds / 3600.).floor();
    let minutes = ((seconds - hours * 3600.) / 60.).floor();
    let secs = seconds - hours * 3600. - minutes * 60.;
    format!("{:02}:{:02}:{:05.2}", hours as u64, minutes as u64, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loudness::{LogScan, parser::FrameRecord};
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn sine(sample_rate: u32, seconds: f64, amplitude: f32) -> Vec<f32> {
        let frames = (sample_rate as f64 * seconds) as usize;
        (0..frames)
            .flat_map(|i| {
                let v = amplitude
                    * (2. * std::f32::consts::PI * 1000. * i as f32 / sample_rate as f32).sin();
                [v, v]
            })
            .collect()
    }

    #[test]
    fn timestamps() {
        assert_eq!(timestamp(192.34), "00:03:12.34");
        assert_eq!(timestamp(3725.5), "01:02:05.50");
    }

    #[test]
    fn levels() {
        assert_eq!(level(-19.64), "-19.6");
        assert_eq!(level(f64::NEG_INFINITY), "-inf");
        assert_abs_diff_eq!(to_dbfs(0.5), -6.0206, epsilon = 1e-3);
        assert_eq!(to_dbfs(0.), f64::NEG_INFINITY);
    }

    #[test]
    fn meter_writes_parseable_log() -> anyhow::Result<()> {
        let sample_rate = 48_000;
        let mut meter = LufsMeter::new(2, sample_rate)?;
        let mut log = Vec::new();
        // uneven chunks, like decoder packets
        for chunk in sine(sample_rate, 6.05, 0.5).chunks(2 * 1152) {
            meter.add_frames(chunk, &mut log)?;
        }
        meter.finish(&mut log)?;

        let text = String::from_utf8(log)?;
        let frames: Vec<FrameRecord> = text.lines().filter_map(FrameRecord::parse).collect();
        assert_eq!(frames.len(), 60);
        assert_abs_diff_eq!(frames[0].time, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(frames[59].time, 6.0, epsilon = 1e-9);

        let last = frames[59];
        let short_term = last.short_term.unwrap();
        assert!(short_term > -70. && short_term < 0.);
        // a 0.5 amplitude sine peaks around -6 dBFS
        assert_abs_diff_eq!(last.peak.unwrap(), -6.0, epsilon = 0.5);

        let scan = LogScan::read(Cursor::new(text))?;
        assert_abs_diff_eq!(scan.duration.unwrap(), 6.05, epsilon = 0.01);
        assert!(scan.summary.integrated.is_some());
        assert!(scan.summary.loudness_range.is_some());
        let (low, high) = (scan.summary.range_low.unwrap(), scan.summary.range_high.unwrap());
        assert!(low <= high);
        assert_abs_diff_eq!(low, short_term, epsilon = 0.5);
        Ok(())
    }

    #[test]
    fn read_errors_are_not_end_of_stream() {
        let eof = std::io::Error::new(ErrorKind::UnexpectedEof, "end of stream");
        assert!(matches!(until_end_of_stream::<()>(Err(DecodeError::IoError(eof))), Ok(None)));
        assert!(matches!(until_end_of_stream(Ok(7)), Ok(Some(7))));

        let broken = std::io::Error::new(ErrorKind::ConnectionReset, "disk went away");
        assert!(until_end_of_stream::<()>(Err(DecodeError::IoError(broken))).is_err());
        assert!(until_end_of_stream::<()>(Err(DecodeError::ResetRequired)).is_err());
    }

    #[test]
    fn range_bounds_gate_and_percentiles() {
        let mut short_terms: Vec<f64> = (-30..=-10).map(f64::from).collect();
        short_terms.extend([-75., f64::NEG_INFINITY, -60.]);
        // -75 and -inf fail the absolute gate, -60 the relative one
        assert_eq!(range_bounds(&short_terms), Some((-28., -11.)));

        assert_eq!(range_bounds(&[-20.; 8]), Some((-20., -20.)));
        assert_eq!(range_bounds(&[-80., f64::NEG_INFINITY]), None);
        assert_eq!(range_bounds(&[]), None);
    }

    #[test]
    fn silence_is_missing() -> anyhow::Result<()> {
        let mut meter = LufsMeter::new(2, 44_100)?;
        let mut log = Vec::new();
        meter.add_frames(&vec![0.; 2 * 4410], &mut log)?;
        let text = String::from_utf8(log)?;
        let frame = FrameRecord::parse(text.lines().next().unwrap()).unwrap();
        assert_eq!(frame.momentary, None);
        assert_eq!(frame.peak, None);
        Ok(())
    }
}
