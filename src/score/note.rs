/// Lowest playable piano key (A0).
pub const PITCH_MIN: u8 = 21;
/// Highest playable piano key (C8).
pub const PITCH_MAX: u8 = 108;

/// Shortest audible note length in seconds. Anything shorter is
/// stretched up to this floor so triggers never round to silence.
pub const MIN_NOTE_DURATION: f64 = 0.1;

/// Notes whose start times differ by no more than this are treated as
/// one simultaneity group when splitting melody from harmony.
pub const GROUP_EPSILON: f64 = 0.05;

/// Stable note identity: the source track plus the note's ordinal
/// within that track. Survives reloads of the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId {
    pub track: usize,
    pub ordinal: usize,
}

impl NoteId {
    pub fn new(track: usize, ordinal: usize) -> Self {
        Self { track, ordinal }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    /// Piano key number, always within [PITCH_MIN, PITCH_MAX].
    pub pitch: u8,
    /// Seconds from song start, already scaled by the speed multiplier.
    pub start_time: f64,
    /// Seconds, already scaled, never below MIN_NOTE_DURATION.
    pub duration: f64,
    /// Normalized MIDI velocity, 0.0..=1.0.
    pub velocity: f32,
    pub track_index: usize,
}

impl Note {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}
