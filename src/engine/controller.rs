use crate::audio::AudioBackend;
use crate::engine::events::EngineEvent;
use crate::engine::hit::{find_touched_note, HandPoint, HitGeometry};
use crate::engine::state::{PlayMode, PlaybackState};
use crate::engine::stats::Stats;
use crate::keyboard::KeyboardLayout;
use crate::score::note::{Note, GROUP_EPSILON};
use crate::score::parse::{Score, ScoreError};
use crate::score::rules::RuleTable;
use std::time::{Duration, Instant};

/// A melody note this far behind the clock has fully left its window:
/// it gets marked seen (uncredited) so it stops being a gate candidate.
/// Seeking applies the same margin.
const AUTO_MARK_MARGIN: f64 = 0.1;

const COUNTDOWN_STEPS: [&str; 4] = ["3", "2", "1", "GO!"];
const COUNTDOWN_STEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Countdown {
    started_at: Instant,
    next_step: usize,
}

/// Owns the shared timeline and every piece of playback state. The
/// renderer and the hit detector only read from it; all transitions
/// happen synchronously inside `tick` and the control calls.
pub struct GameController<A: AudioBackend> {
    audio: A,
    rules: RuleTable,
    raw_midi: Vec<u8>,
    score: Score,
    layout: KeyboardLayout,
    geometry: HitGeometry,
    state: PlaybackState,
    stats: Stats,
    /// Hold for the player's first touch after the countdown instead of
    /// letting time advance immediately.
    gate_at_start: bool,
    countdown: Option<Countdown>,
    /// Wall instant paired with the musical time it corresponds to.
    anchor: Option<(Instant, f64)>,
}

impl<A: AudioBackend> GameController<A> {
    pub fn new(
        audio: A,
        midi_data: Vec<u8>,
        song_id: &str,
        speed: f64,
        rules: RuleTable,
    ) -> Result<Self, ScoreError> {
        let score = Score::load(&midi_data, song_id, speed, &rules)?;
        let layout = KeyboardLayout::for_score(&score);

        Ok(Self {
            audio,
            rules,
            raw_midi: midi_data,
            score,
            layout,
            geometry: HitGeometry::default(),
            state: PlaybackState::default(),
            stats: Stats::new(),
            gate_at_start: false,
            countdown: None,
            anchor: None,
        })
    }

    pub fn set_gate_at_start(&mut self, gate: bool) {
        self.gate_at_start = gate;
    }

    pub fn set_geometry(&mut self, geometry: HitGeometry) {
        self.geometry = geometry;
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> PlayMode {
        self.state.mode
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Same query the gate runs, exposed for display highlighting.
    pub fn touched_note(&self, hand_points: &[HandPoint]) -> Option<&Note> {
        find_touched_note(
            hand_points,
            &self.score.melody,
            self.stats.played(),
            self.state.current_time,
            &self.layout,
            &self.geometry,
        )
    }

    /// Begin a session: kicks off the countdown. No-op unless stopped.
    pub fn play(&mut self, now: Instant) {
        if self.state.mode != PlayMode::Stopped {
            return;
        }
        self.state.mode = PlayMode::CountingDown;
        self.countdown = Some(Countdown {
            started_at: now,
            next_step: 0,
        });
    }

    /// Stop advancing time. Cancels the countdown and every scheduled
    /// harmony trigger; `current_time` is kept for resume.
    pub fn pause(&mut self) {
        self.countdown = None;
        self.anchor = None;
        self.audio.cancel_all_scheduled();
        self.state.mode = PlayMode::Stopped;
    }

    /// One frame of the game loop. Drives the countdown, advances the
    /// clock, auto-marks stale melody notes and runs the melody gate.
    pub fn tick(&mut self, now: Instant, hand_points: &[HandPoint]) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        match self.state.mode {
            PlayMode::Stopped => {}
            PlayMode::CountingDown => self.tick_countdown(now, &mut events),
            PlayMode::Playing => {
                if let Some((anchor_at, anchor_time)) = self.anchor {
                    self.state.current_time =
                        anchor_time + now.duration_since(anchor_at).as_secs_f64();
                }

                if self.state.current_time >= self.score.duration {
                    self.finish(&mut events);
                    return events;
                }

                self.auto_mark_stale();
                self.run_gate(now, hand_points, &mut events);
            }
            PlayMode::GatedPaused => {
                // Time frozen; only a touch can move things along
                self.run_gate(now, hand_points, &mut events);
            }
        }

        events
    }

    /// Jump to `target` seconds. Notes skipped over are marked seen
    /// without credit; the touch counter starts over.
    pub fn seek(&mut self, target: f64, now: Instant) {
        let target = target.clamp(0.0, self.score.duration);
        self.state.current_time = target;

        self.stats.reset();
        let cutoff = target - AUTO_MARK_MARGIN;
        for note in &self.score.melody {
            if note.start_time < cutoff {
                self.stats.mark_passed(note.id);
            }
        }

        if self.state.mode == PlayMode::Playing {
            // Pause-and-resume in one synchronous step: drop the old
            // schedule, re-anchor the clock, reschedule from here.
            self.audio.cancel_all_scheduled();
            self.anchor = Some((now, target));
            self.schedule_harmony_from(target);
        }
    }

    /// Reload the current song at a new speed. Timing is baked into the
    /// note list, so the whole score is rebuilt, not rescaled.
    pub fn change_speed(&mut self, speed: f64, now: Instant) -> Result<(), ScoreError> {
        let song_id = self.score.song_id.clone();
        let score = Score::load(&self.raw_midi, &song_id, speed, &self.rules)?;
        self.replace_score(score, now);
        Ok(())
    }

    /// Swap in a different song, keeping the current speed. A failed
    /// load leaves the running score and playback state untouched.
    pub fn change_song(
        &mut self,
        song_id: &str,
        midi_data: Vec<u8>,
        now: Instant,
    ) -> Result<(), ScoreError> {
        let score = Score::load(&midi_data, song_id, self.score.speed, &self.rules)?;
        self.raw_midi = midi_data;
        self.replace_score(score, now);
        Ok(())
    }

    pub fn change_instrument(&mut self, name: &str) {
        self.audio.set_instrument(name);
    }

    fn replace_score(&mut self, score: Score, now: Instant) {
        let was_active = self.state.mode != PlayMode::Stopped;
        self.pause();

        self.layout = KeyboardLayout::for_score(&score);
        self.score = score;
        self.state.current_time = 0.0;
        self.stats.reset();

        if was_active {
            self.play(now);
        }
    }

    fn tick_countdown(&mut self, now: Instant, events: &mut Vec<EngineEvent>) {
        let Some(countdown) = self.countdown.as_mut() else {
            self.state.mode = PlayMode::Stopped;
            return;
        };

        let elapsed = now.duration_since(countdown.started_at);
        while countdown.next_step < COUNTDOWN_STEPS.len()
            && elapsed >= COUNTDOWN_STEP_INTERVAL * countdown.next_step as u32
        {
            events.push(EngineEvent::CountdownStep(COUNTDOWN_STEPS[countdown.next_step]));
            countdown.next_step += 1;
        }

        if countdown.next_step >= COUNTDOWN_STEPS.len() {
            self.countdown = None;
            if self.gate_at_start {
                self.state.mode = PlayMode::GatedPaused;
            } else {
                self.start_clock(now);
                events.push(EngineEvent::Started);
            }
        }
    }

    /// Anchor wall time to the current musical time and (re)schedule
    /// the remaining harmony.
    fn start_clock(&mut self, now: Instant) {
        self.anchor = Some((now, self.state.current_time));
        self.state.mode = PlayMode::Playing;
        self.schedule_harmony_from(self.state.current_time);
    }

    fn schedule_harmony_from(&mut self, from_time: f64) {
        for note in &self.score.harmony {
            if note.start_time >= from_time {
                let offset = Duration::from_secs_f64(note.start_time - from_time);
                self.audio.schedule_harmony(note, offset);
            }
        }
    }

    fn finish(&mut self, events: &mut Vec<EngineEvent>) {
        self.state.current_time = self.score.duration;
        self.state.mode = PlayMode::Stopped;
        self.anchor = None;
        self.audio.cancel_all_scheduled();

        let total = self.score.melody.len();
        events.push(EngineEvent::SongComplete {
            percent: self.stats.final_percent(total),
            hit: self.stats.touched_count(),
            total,
        });
    }

    fn auto_mark_stale(&mut self) {
        let cutoff = self.state.current_time - AUTO_MARK_MARGIN;
        for note in &self.score.melody {
            if note.start_time < cutoff && !self.stats.is_played(note.id) {
                self.stats.mark_passed(note.id);
            }
        }
    }

    fn run_gate(&mut self, now: Instant, hand_points: &[HandPoint], events: &mut Vec<EngineEvent>) {
        let Some(touched) = find_touched_note(
            hand_points,
            &self.score.melody,
            self.stats.played(),
            self.state.current_time,
            &self.layout,
            &self.geometry,
        ) else {
            return;
        };
        let touched_start = touched.start_time;

        // A chord: every unplayed melody note at (nearly) the same time
        // is satisfied by the one touch.
        let chord: Vec<Note> = self
            .score
            .melody
            .iter()
            .filter(|n| {
                !self.stats.is_played(n.id)
                    && (n.start_time - touched_start).abs() <= GROUP_EPSILON
            })
            .cloned()
            .collect();

        for note in &chord {
            if self.stats.mark_touched(note.id) {
                self.audio.trigger_melody(note);
                events.push(EngineEvent::NoteHit {
                    id: note.id,
                    pitch: note.pitch,
                });
            }
        }

        if self.state.mode == PlayMode::GatedPaused {
            self.start_clock(now);
            events.push(EngineEvent::GateReleased);
            events.push(EngineEvent::Started);
        }
    }
}
