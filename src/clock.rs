//! Host timestamps to elapsed/delta seconds.

use serde::{Deserialize, Serialize};

/// Frame clock options.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockOpts {
    /// Seconds per host timestamp unit (`0.001` for millisecond timestamps).
    pub time_scale: f64,
    /// Upper bound for the integration step, in seconds.
    pub max_delta_secs: f64,
}

impl Default for ClockOpts {
    fn default() -> Self {
        Self {
            time_scale: 0.001,
            max_delta_secs: 0.033,
        }
    }
}

/// Timing for one frame.
///
/// Periodic motion reads `elapsed_secs`; integrated motion reads `delta_secs`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FrameTime {
    /// Scaled host timestamp. Never decreases, never clamped.
    pub elapsed_secs: f64,
    /// Time since the previous frame, clamped to `[0, max_delta_secs]`.
    pub delta_secs: f64,
    /// Frames ticked since the clock was last primed.
    pub frame: u64,
}

#[derive(Clone, Debug)]
pub struct FrameClock {
    opts: ClockOpts,
    last_elapsed: Option<f64>,
    frame: u64,
}

impl FrameClock {
    pub fn new(opts: ClockOpts) -> Self {
        Self {
            opts,
            last_elapsed: None,
            frame: 0,
        }
    }

    pub fn opts(&self) -> ClockOpts {
        self.opts
    }

    /// Forget the previous timestamp; the next tick reports a zero delta.
    pub fn prime(&mut self) {
        self.last_elapsed = None;
        self.frame = 0;
    }

    /// Advance to the host timestamp `timestamp`.
    ///
    /// Timestamps that go backwards or are not finite produce a zero delta and leave the elapsed
    /// time where it was.
    pub fn tick(&mut self, timestamp: f64) -> FrameTime {
        let now = timestamp * self.opts.time_scale;
        let (elapsed, delta) = match self.last_elapsed {
            _ if !now.is_finite() => (self.last_elapsed.unwrap_or(0.0), 0.0),
            None => (now, 0.0),
            Some(prev) if now <= prev => (prev, 0.0),
            Some(prev) => (now, (now - prev).min(self.opts.max_delta_secs.max(0.0))),
        };
        self.last_elapsed = Some(elapsed);
        let frame = self.frame;
        self.frame += 1;
        FrameTime {
            elapsed_secs: elapsed,
            delta_secs: delta,
            frame,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(ClockOpts::default())
    }
}

#[cfg(test)]
#[path = "../tests/unit/clock.rs"]
mod tests;
