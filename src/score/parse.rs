use crate::score::note::{Note, NoteId, GROUP_EPSILON, MIN_NOTE_DURATION, PITCH_MAX, PITCH_MIN};
use crate::score::rules::RuleTable;
use midly::{Smf, TrackEventKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Failed to read MIDI file: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Failed to parse MIDI file: {0}")]
    MidiError(#[from] midly::Error),
    #[error("No notes found in MIDI file")]
    EmptyScore,
    #[error("Speed multiplier must be positive, got {0}")]
    InvalidSpeed(f64),
}

const DEFAULT_TEMPO: u32 = 500_000; // microseconds per beat (120 BPM)
const DEFAULT_TICKS_PER_BEAT: f64 = 24.0;

#[derive(Debug, Clone)]
struct TempoChange {
    time: u32,  // in ticks
    tempo: u32, // in microseconds per beat
}

/// A parsed song: every note in playback order plus the melody/harmony
/// partition the gate and the auto-player work from. Rebuilt wholesale
/// on every song or speed change, never patched in place.
#[derive(Debug, Clone)]
pub struct Score {
    /// All notes, ascending by start time.
    pub notes: Vec<Note>,
    /// One note per simultaneity group, the one the player must touch.
    pub melody: Vec<Note>,
    /// Everything else; played automatically on schedule.
    pub harmony: Vec<Note>,
    /// End of the last note, in scaled seconds.
    pub duration: f64,
    pub speed: f64,
    pub song_id: String,
}

impl Score {
    /// Parses raw MIDI bytes into a Score. `speed` > 1.0 plays faster:
    /// every start time and duration is divided by it.
    pub fn load(
        midi_data: &[u8],
        song_id: &str,
        speed: f64,
        rules: &RuleTable,
    ) -> Result<Score, ScoreError> {
        if speed <= 0.0 {
            return Err(ScoreError::InvalidSpeed(speed));
        }

        let smf = Smf::parse(midi_data)?;
        let ticks_per_beat = match smf.header.timing {
            midly::Timing::Metrical(timing) => timing.as_int() as f64,
            _ => DEFAULT_TICKS_PER_BEAT,
        };

        let tempo_changes = collect_tempo_changes(&smf);
        let rule = rules.lookup(song_id);
        let tempo_multiplier = 1.0 / speed;

        let mut notes = Vec::new();
        for (track_index, track) in smf.tracks.iter().enumerate() {
            let mut current_tick = 0u32;
            let mut ordinal = 0usize;
            // pitch -> (start tick, ordinal, velocity)
            let mut active: Vec<(u8, u32, usize, u8)> = Vec::new();

            for event in track.iter() {
                current_tick += event.delta.as_int();

                if let TrackEventKind::Midi { message, .. } = event.kind {
                    match message {
                        midly::MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            active.push((key.as_int(), current_tick, ordinal, vel.as_int()));
                            ordinal += 1;
                        }
                        midly::MidiMessage::NoteOff { key, .. }
                        | midly::MidiMessage::NoteOn { key, .. } => {
                            if let Some(pos) =
                                active.iter().position(|(p, ..)| *p == key.as_int())
                            {
                                let (pitch, start_tick, ord, vel) = active.remove(pos);
                                push_note(
                                    &mut notes,
                                    track_index,
                                    ord,
                                    pitch,
                                    start_tick,
                                    current_tick,
                                    &tempo_changes,
                                    ticks_per_beat,
                                    tempo_multiplier,
                                    rule.transpose_semitones,
                                    vel,
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }

            // Close anything left hanging at the end of the track.
            for (pitch, start_tick, ord, vel) in active {
                push_note(
                    &mut notes,
                    track_index,
                    ord,
                    pitch,
                    start_tick,
                    current_tick,
                    &tempo_changes,
                    ticks_per_beat,
                    tempo_multiplier,
                    rule.transpose_semitones,
                    vel,
                );
            }
        }

        if notes.is_empty() {
            return Err(ScoreError::EmptyScore);
        }

        // Stable sort keeps track/ordinal order on equal start times, so
        // the split below is deterministic across reloads.
        notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let (melody, mut harmony) = split_melody_harmony(&notes);
        if rule.suppress_harmony {
            notes.retain(|n| melody.iter().any(|m| m.id == n.id));
            harmony.clear();
        }

        let duration = notes
            .iter()
            .map(Note::end_time)
            .fold(0.0f64, f64::max);

        Ok(Score {
            notes,
            melody,
            harmony,
            duration,
            speed,
            song_id: song_id.to_string(),
        })
    }

    /// Min and max pitch over every note. The keyboard layout pads this
    /// by a few keys on each side.
    pub fn pitch_range(&self) -> (u8, u8) {
        let min = self.notes.iter().map(|n| n.pitch).min().unwrap_or(PITCH_MIN);
        let max = self.notes.iter().map(|n| n.pitch).max().unwrap_or(PITCH_MAX);
        (min, max)
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }
}

#[allow(clippy::too_many_arguments)]
fn push_note(
    notes: &mut Vec<Note>,
    track_index: usize,
    ordinal: usize,
    pitch: u8,
    start_tick: u32,
    end_tick: u32,
    tempo_changes: &[TempoChange],
    ticks_per_beat: f64,
    tempo_multiplier: f64,
    transpose: i8,
    velocity: u8,
) {
    let pitch = pitch as i16 + transpose as i16;
    if pitch < PITCH_MIN as i16 || pitch > PITCH_MAX as i16 {
        return;
    }

    let start_time = ticks_to_seconds(0, start_tick, tempo_changes, ticks_per_beat);
    let raw_duration = ticks_to_seconds(start_tick, end_tick, tempo_changes, ticks_per_beat);

    notes.push(Note {
        id: NoteId::new(track_index, ordinal),
        pitch: pitch as u8,
        start_time: start_time * tempo_multiplier,
        duration: (raw_duration * tempo_multiplier).max(MIN_NOTE_DURATION),
        velocity: velocity as f32 / 127.0,
        track_index,
    });
}

fn collect_tempo_changes(smf: &Smf) -> Vec<TempoChange> {
    let mut tempo_changes = Vec::new();

    for track in smf.tracks.iter() {
        let mut current_time = 0;
        for event in track.iter() {
            current_time += event.delta.as_int();
            if let TrackEventKind::Meta(midly::MetaMessage::Tempo(tempo)) = event.kind {
                tempo_changes.push(TempoChange {
                    time: current_time,
                    tempo: tempo.as_int(),
                });
            }
        }
    }

    tempo_changes.sort_by_key(|tc| tc.time);
    tempo_changes.dedup_by_key(|tc| tc.time);
    // Files with no tempo event before the first note fall back to 120 BPM
    if tempo_changes.first().map_or(true, |tc| tc.time != 0) {
        tempo_changes.insert(
            0,
            TempoChange {
                time: 0,
                tempo: DEFAULT_TEMPO,
            },
        );
    }
    tempo_changes
}

fn ticks_to_seconds(
    start_tick: u32,
    end_tick: u32,
    tempo_changes: &[TempoChange],
    ticks_per_beat: f64,
) -> f64 {
    let mut total_micros = 0.0;
    let mut current_tick = start_tick;

    for (idx, change) in tempo_changes.iter().enumerate() {
        if current_tick >= end_tick {
            break;
        }
        let segment_end = tempo_changes
            .get(idx + 1)
            .map(|next| next.time)
            .unwrap_or(u32::MAX)
            .min(end_tick);
        if segment_end <= current_tick {
            continue;
        }

        let ticks_in_segment = (segment_end - current_tick) as f64;
        total_micros += ticks_in_segment * change.tempo as f64 / ticks_per_beat;
        current_tick = segment_end;
    }

    total_micros / 1_000_000.0
}

/// Splits a sorted note list into melody and harmony. A group anchors
/// at its first note's start time and absorbs following notes while
/// they stay within GROUP_EPSILON of that anchor; the highest pitch in
/// each group is melody, first occurrence winning ties. Groups anchor
/// to their first member, so a slow quasi-simultaneous drift can break
/// into several groups once it leaves the anchor's window.
fn split_melody_harmony(notes: &[Note]) -> (Vec<Note>, Vec<Note>) {
    let mut melody = Vec::new();
    let mut harmony = Vec::new();

    let mut group_start = 0;
    while group_start < notes.len() {
        let anchor_time = notes[group_start].start_time;
        let mut group_end = group_start + 1;
        while group_end < notes.len()
            && notes[group_end].start_time - anchor_time <= GROUP_EPSILON
        {
            group_end += 1;
        }

        let group = &notes[group_start..group_end];
        let best = group
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                a.pitch.cmp(&b.pitch).then(ib.cmp(ia)) // first occurrence wins ties
            })
            .map(|(i, _)| i)
            .unwrap();

        for (i, note) in group.iter().enumerate() {
            if i == best {
                melody.push(note.clone());
            } else {
                harmony.push(note.clone());
            }
        }

        group_start = group_end;
    }

    (melody, harmony)
}
