pub mod synth;

pub use self::synth::{SineSynth, SynthError};

use crate::score::note::Note;
use std::time::Duration;

/// Sound output seam. The controller issues fire-and-forget commands;
/// it never waits on the backend or tracks per-note completion.
pub trait AudioBackend {
    /// Queue a harmony note to sound `at` seconds after the moment
    /// playback (re)started. The backend owns the pending queue.
    fn schedule_harmony(&mut self, note: &Note, at: Duration);
    /// Drop every scheduled-but-not-yet-fired harmony trigger.
    fn cancel_all_scheduled(&mut self);
    /// Sound a melody note immediately (the player just touched it).
    fn trigger_melody(&mut self, note: &Note);
    fn set_instrument(&mut self, name: &str);
}

impl AudioBackend for Box<dyn AudioBackend> {
    fn schedule_harmony(&mut self, note: &Note, at: Duration) {
        (**self).schedule_harmony(note, at)
    }

    fn cancel_all_scheduled(&mut self) {
        (**self).cancel_all_scheduled()
    }

    fn trigger_melody(&mut self, note: &Note) {
        (**self).trigger_melody(note)
    }

    fn set_instrument(&mut self, name: &str) {
        (**self).set_instrument(name)
    }
}

/// Silent backend for tests and audio-less degraded sessions.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn schedule_harmony(&mut self, _note: &Note, _at: Duration) {}
    fn cancel_all_scheduled(&mut self) {}
    fn trigger_melody(&mut self, _note: &Note) {}
    fn set_instrument(&mut self, _name: &str) {}
}
