//! Stimulus presentation surface.
//!
//! The state machine only decides *when* a stimulus appears; how it appears
//! is behind this trait so the agent can run headless, in a terminal, or
//! under a test harness with the same session logic.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Where and how a stimulus is drawn on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusPlacement {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Presents and clears the reaction stimulus. Both calls must return
/// promptly; the control loop runs on the same thread.
pub trait StimulusSurface {
    fn present(&mut self, placement: StimulusPlacement);
    fn clear(&mut self);
}

/// Surface for headless operation and tests.
#[derive(Debug, Default)]
pub struct NoopSurface;

impl StimulusSurface for NoopSurface {
    fn present(&mut self, _placement: StimulusPlacement) {}
    fn clear(&mut self) {}
}

/// Terminal surface: prints a prompt and rings the bell.
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl StimulusSurface for ConsoleSurface {
    fn present(&mut self, _placement: StimulusPlacement) {
        // BEL draws attention even when the terminal is not focused.
        println!("\x07>>> REACT NOW (press Enter) <<<");
    }

    fn clear(&mut self) {
        println!("    ...waiting...");
    }
}

/// Draw a random on-screen position for a square stimulus, keeping the whole
/// square at least `margin` pixels inside the screen edges.
pub fn random_position<R: Rng>(
    rng: &mut R,
    screen_w: u32,
    screen_h: u32,
    size: u32,
    margin: u32,
) -> StimulusPlacement {
    let max_x = screen_w.saturating_sub(size + margin).max(margin);
    let max_y = screen_h.saturating_sub(size + margin).max(margin);
    StimulusPlacement {
        x: rng.gen_range(margin..=max_x),
        y: rng.gen_range(margin..=max_y),
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_position_respects_margins() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let p = random_position(&mut rng, 1920, 1080, 50, 50);
            assert!(p.x >= 50 && p.x + p.size + 50 <= 1920);
            assert!(p.y >= 50 && p.y + p.size + 50 <= 1080);
        }
    }

    #[test]
    fn test_tiny_screen_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = random_position(&mut rng, 100, 100, 50, 50);
        assert!(p.x <= 100 && p.y <= 100);
    }
}
