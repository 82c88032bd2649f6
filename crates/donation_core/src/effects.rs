//! Celebration side effects fired once when a donation completes.

use anyhow::Result;

pub const CELEBRATION_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfettiBurst {
    pub particle_count: u32,
    pub spread: f32,
    pub origin_y: f32,
}

impl Default for ConfettiBurst {
    fn default() -> Self {
        Self {
            particle_count: 100,
            spread: 70.0,
            origin_y: 0.6,
        }
    }
}

/// A clip that is currently playing and can be cut short.
pub trait PlaybackHandle: Send {
    fn stop(&mut self);

    fn is_playing(&mut self) -> bool {
        false
    }
}

/// Rendering-side hooks for the completion celebration.
///
/// Both calls are fire-and-forget from the controller's point of view: an
/// `Err` is logged and never changes the donation status.
pub trait CelebrationEffects: Send + Sync {
    fn launch_confetti(&self, burst: ConfettiBurst) -> Result<()>;
    fn play_clip(&self, volume: f32) -> Result<Box<dyn PlaybackHandle>>;
}

pub struct NoopCelebration;

impl CelebrationEffects for NoopCelebration {
    fn launch_confetti(&self, _burst: ConfettiBurst) -> Result<()> {
        Ok(())
    }

    fn play_clip(&self, _volume: f32) -> Result<Box<dyn PlaybackHandle>> {
        Ok(Box::new(SilentPlayback))
    }
}

pub struct SilentPlayback;

impl PlaybackHandle for SilentPlayback {
    fn stop(&mut self) {}
}
