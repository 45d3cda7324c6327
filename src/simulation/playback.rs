//! Looping playback cursor over a finished trajectory
//!
//! The cursor is what an animation layer drives: it owns an unbounded frame
//! counter and maps it into the shared trajectory with modulo wraparound.
//! Several cursors can read the same `Arc<Trajectory>` at once.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::error::ConfigError;
use crate::simulation::states::{NState, NVec2};
use crate::simulation::trajectory::Trajectory;

/// Frames per second used when a scenario does not set one
pub const DEFAULT_SPEED: u32 = 100;

#[derive(Debug, Clone)]
pub struct Playback {
    trajectory: Arc<Trajectory>,
    frame: usize,
    paused: bool,
    speed: u32, // frames per second
}

impl Playback {
    pub fn new(trajectory: Arc<Trajectory>, speed: u32) -> Result<Self, ConfigError> {
        if speed == 0 {
            return Err(ConfigError::ZeroPlaybackSpeed);
        }
        Ok(Self {
            trajectory,
            frame: 0,
            paused: false,
            speed,
        })
    }

    pub fn trajectory(&self) -> &Arc<Trajectory> {
        &self.trajectory
    }

    /// Raw, unwrapped frame counter
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Delay between two frames at the configured speed
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.speed))
    }

    /// Move to the next frame unless paused
    pub fn advance(&mut self) {
        if !self.paused {
            self.frame = self.frame.wrapping_add(1);
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Back to the first frame, running
    pub fn reset(&mut self) {
        debug!("playback: reset at frame {}", self.frame);
        self.frame = 0;
        self.paused = false;
    }

    pub fn current(&self) -> Option<&NState> {
        self.trajectory.sample(self.frame)
    }

    pub fn current_time(&self) -> Option<f64> {
        self.trajectory.time_at(self.frame)
    }

    /// Trail of `body` up to the current frame
    pub fn current_trail(&self, body: usize) -> Vec<NVec2> {
        self.trajectory.trail(body, self.frame).collect()
    }
}
