use crate::engine::hit::HandPoint;

/// Which points a tracking adapter emits per frame. The engine never
/// branches on this; it only consumes whatever points arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayStyle {
    /// Index/middle fingertip landmarks only.
    #[default]
    Fingertips,
    /// Every hand landmark.
    FullHand,
    /// Landmarks plus interpolated fill between them.
    SolidHand,
}

/// Hand input seam. An implementation maps camera-space landmarks into
/// keyboard screen space and hands over the most recent frame. A frame
/// may be empty (no hands in view); point count and order carry no
/// meaning across frames.
pub trait HandTracker {
    fn poll_points(&mut self) -> Vec<HandPoint>;
    fn set_play_style(&mut self, style: PlayStyle);
}

/// No camera: every frame is empty. Melody gates stall, harmony still
/// plays — the degraded mode used when tracker init fails.
#[derive(Debug, Default)]
pub struct NullTracker;

impl HandTracker for NullTracker {
    fn poll_points(&mut self) -> Vec<HandPoint> {
        Vec::new()
    }

    fn set_play_style(&mut self, _style: PlayStyle) {}
}

/// Plays back a pre-recorded sequence of frames, then reports empty
/// ones. Stands in for the camera in tests and scripted sessions.
#[derive(Debug, Default)]
pub struct ReplayTracker {
    frames: Vec<Vec<HandPoint>>,
    cursor: usize,
}

impl ReplayTracker {
    pub fn new(frames: Vec<Vec<HandPoint>>) -> Self {
        Self { frames, cursor: 0 }
    }
}

impl HandTracker for ReplayTracker {
    fn poll_points(&mut self) -> Vec<HandPoint> {
        let frame = self.frames.get(self.cursor).cloned().unwrap_or_default();
        if self.cursor < self.frames.len() {
            self.cursor += 1;
        }
        frame
    }

    fn set_play_style(&mut self, _style: PlayStyle) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tracker_is_always_empty() {
        let mut tracker = NullTracker;
        assert!(tracker.poll_points().is_empty());
        assert!(tracker.poll_points().is_empty());
    }

    #[test]
    fn test_replay_tracker_exhausts_to_empty() {
        let mut tracker = ReplayTracker::new(vec![
            vec![HandPoint { x: 1.0, y: 2.0 }],
            vec![],
        ]);
        assert_eq!(tracker.poll_points().len(), 1);
        assert!(tracker.poll_points().is_empty());
        assert!(tracker.poll_points().is_empty());
    }
}
