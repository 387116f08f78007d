use crate::score::note::NoteId;

/// What the controller tells the outside world each tick. The binary
/// prints these; a renderer would draw them.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Countdown display text: "3", "2", "1", "GO!".
    CountdownStep(&'static str),
    /// Musical time started (or resumed) advancing.
    Started,
    /// A gated pause was released by a touch.
    GateReleased,
    /// A melody note was touched and credited.
    NoteHit { id: NoteId, pitch: u8 },
    /// Reached the end of the score.
    SongComplete {
        percent: f64,
        hit: usize,
        total: usize,
    },
}
