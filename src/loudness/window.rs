use super::parser::FrameRecord;

/// Analyzer cadence in frames per second.
pub const FRAMES_PER_SECOND: f64 = 10.;
pub const DEFAULT_WINDOW_COUNT: u32 = 200;

/// Loudness range readings before this time are start-up artifacts.
const RANGE_SETTLE_SECONDS: f64 = 4.;
/// No window closes at or before this time.
const CLOSE_AFTER_SECONDS: f64 = 3.;
/// Short-term loudness at or below this is treated as silence.
const SILENCE_GATE_LUFS: f64 = -70.;
const PEAK_FLOOR: f64 = -120.;
const PSR_CEILING: f64 = 21.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSizing {
    pub frames: u64,
    /// Shift that moves a window's end timestamp back to its center.
    pub time_offset: f64,
}

impl WindowSizing {
    pub fn new(duration: f64, window_count: u32) -> Self {
        let frames = (duration * FRAMES_PER_SECOND / window_count.max(1) as f64)
            .floor()
            .max(0.) as u64;
        WindowSizing {
            frames,
            time_offset: -(frames as f64 / FRAMES_PER_SECOND) / 2.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentedRecord {
    pub frame: FrameRecord,
    pub psr: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowState {
    frame_count: u64,
    max_peak: f64,
}

impl WindowState {
    fn open() -> Self {
        WindowState {
            frame_count: 0,
            max_peak: PEAK_FLOOR,
        }
    }
}

/// Computes one PSR value per window, at the frame that closes it.
#[derive(Debug, Clone)]
pub struct PsrAggregator {
    window_frames: u64,
    state: WindowState,
}

impl PsrAggregator {
    pub fn new(sizing: &WindowSizing) -> Self {
        PsrAggregator {
            window_frames: sizing.frames,
            state: WindowState::open(),
        }
    }

    pub fn push(&mut self, mut frame: FrameRecord) -> AugmentedRecord {
        if frame.time < RANGE_SETTLE_SECONDS {
            frame.loudness_range = Some(0.);
        }
        if let Some(peak) = frame.peak {
            self.state.max_peak = self.state.max_peak.max(peak);
        }
        self.state.frame_count += 1;

        let psr = match frame.short_term {
            Some(short_term)
                if past_startup(frame.time)
                    && window_filled(self.state.frame_count, self.window_frames)
                    && above_gate(short_term) =>
            {
                let psr = (self.state.max_peak - short_term).min(PSR_CEILING);
                self.state = WindowState::open();
                Some(psr)
            }
            _ => None,
        };

        AugmentedRecord { frame, psr }
    }

    pub fn frames_in_window(&self) -> u64 {
        self.state.frame_count
    }

    pub fn max_peak_in_window(&self) -> f64 {
        self.state.max_peak
    }
}

fn past_startup(time: f64) -> bool {
    time > CLOSE_AFTER_SECONDS
}

fn window_filled(frame_count: u64, window_frames: u64) -> bool {
    frame_count >= window_frames
}

fn above_gate(short_term: f64) -> bool {
    short_term > SILENCE_GATE_LUFS
}
