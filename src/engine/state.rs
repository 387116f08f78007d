/// Playback mode of the timeline controller.
///
/// `GatedPaused` means musical time is frozen until the player touches
/// the next required melody note; it is only entered when a session is
/// configured to hold for the first touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Stopped,
    CountingDown,
    Playing,
    GatedPaused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Seconds of musical time, clamped to [0, score duration].
    pub current_time: f64,
    pub mode: PlayMode,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            mode: PlayMode::Stopped,
        }
    }
}
