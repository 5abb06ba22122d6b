use std::collections::VecDeque;

use instant::Duration;

const HISTORY: usize = 100;
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Frame time bookkeeping: a rolling window for the average frame rate and
/// the total time spent rendering.
#[derive(Debug, Clone)]
pub struct FpsTimer {
    history: VecDeque<Duration>,
    window_total: Duration,
    elapsed: Duration,
    since_log: Duration,
    frames: u64,
}

impl FpsTimer {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY),
            window_total: Duration::ZERO,
            elapsed: Duration::ZERO,
            since_log: Duration::ZERO,
            frames: 0,
        }
    }

    /// Record one frame. Returns `true` once per second of accumulated frame time.
    pub fn update(&mut self, frame_time: Duration) -> bool {
        if self.history.len() == HISTORY {
            if let Some(oldest) = self.history.pop_front() {
                self.window_total -= oldest;
            }
        }
        self.history.push_back(frame_time);
        self.window_total += frame_time;
        self.elapsed += frame_time;
        self.frames += 1;

        self.since_log += frame_time;
        if self.since_log >= LOG_INTERVAL {
            self.since_log = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Average frames per second over the last hundred frames.
    pub fn average_fps(&self) -> f64 {
        let seconds = self.window_total.as_secs_f64();
        if seconds <= 0.0 {
            0.0
        } else {
            self.history.len() as f64 / seconds
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FpsTimer {
    fn default() -> Self {
        Self::new()
    }
}
