//! Frame counting and update cadence.
//!
//! Updates are throttled by frame count, not wall-clock time: `on_update` runs
//! on frames where `frame_count % update_divisor == 0`. Update rate therefore
//! scales with the achieved frame rate; there is no fixed-timestep guarantee.
//! Wall-clock deltas are measured only for the FPS readout.

use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

pub struct FrameClock {
    update_divisor: u32,
    pub frame_count: u64,
    pub update_count: u64,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    /// A divisor of 0 is treated as 1 (update every frame).
    pub fn new(update_divisor: u32) -> Self {
        Self {
            update_divisor: update_divisor.max(1),
            frame_count: 0,
            update_count: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn update_divisor(&self) -> u32 {
        self.update_divisor
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        self.real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    /// Whether the current frame is an update frame.
    pub fn should_update(&self) -> bool {
        self.frame_count % u64::from(self.update_divisor) == 0
    }

    pub fn record_update(&mut self) {
        self.update_count += 1;
    }

    pub fn end_frame(&mut self) {
        self.frame_count += 1;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1)
    }
}
