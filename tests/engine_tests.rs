use midly::{Format, Header, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use mockall::mock;
use mockall::Sequence;
use piano_fall::audio::AudioBackend;
use piano_fall::engine::hit::note_rect;
use piano_fall::engine::{EngineEvent, GameController, HandPoint, HitGeometry, PlayMode};
use piano_fall::score::{Note, RuleTable};
use std::time::{Duration, Instant};

mock! {
    pub Audio {}

    impl AudioBackend for Audio {
        fn schedule_harmony(&mut self, note: &Note, at: Duration);
        fn cancel_all_scheduled(&mut self);
        fn trigger_melody(&mut self, note: &Note);
        fn set_instrument(&mut self, name: &str);
    }
}

fn create_test_midi(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let header = Header::new(Format::Parallel, Timing::Metrical(480.into()));
    let smf = Smf { header, tracks };
    let mut buffer = Vec::new();
    smf.write(&mut buffer).expect("Failed to write MIDI data");
    buffer
}

fn note_on(delta: u32, key: u8, velocity: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Midi {
            channel: 0.into(),
            message: MidiMessage::NoteOn {
                key: key.into(),
                vel: velocity.into(),
            },
        },
    }
}

fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Midi {
            channel: 0.into(),
            message: MidiMessage::NoteOff {
                key: key.into(),
                vel: 0.into(),
            },
        },
    }
}

/// Melody 72 + harmony 60 at t=0, melody 74 at t=0.5. Duration 1s.
fn gate_song() -> Vec<u8> {
    create_test_midi(vec![vec![
        note_on(0, 72, 100),
        note_on(0, 60, 80),
        note_off(480, 72),
        note_off(0, 60),
        note_on(0, 74, 100),
        note_off(480, 74),
    ]])
}

/// Melody 72 + harmony 60 at t=0, melody 74 + harmony 62 at t=1.0.
fn long_song() -> Vec<u8> {
    create_test_midi(vec![vec![
        note_on(0, 72, 100),
        note_on(0, 60, 80),
        note_off(480, 72),
        note_off(0, 60),
        note_on(480, 74, 100),
        note_on(0, 62, 80),
        note_off(960, 74),
        note_off(0, 62),
    ]])
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[test]
fn test_harmony_schedule_and_cancel_contract() {
    let mut seq = Sequence::new();
    let mut audio = MockAudio::new();
    audio
        .expect_schedule_harmony()
        .withf(|n: &Note, at: &Duration| n.pitch == 60 && at.as_secs_f64() < 1e-6)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    audio
        .expect_schedule_harmony()
        .withf(|n: &Note, at: &Duration| n.pitch == 62 && (at.as_secs_f64() - 1.0).abs() < 1e-3)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    audio
        .expect_cancel_all_scheduled()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    // After resume, only the note still ahead, offset from mid-song
    audio
        .expect_schedule_harmony()
        .withf(|n: &Note, at: &Duration| n.pitch == 62 && (at.as_secs_f64() - 0.5).abs() < 1e-3)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let mut controller =
        GameController::new(audio, long_song(), "test-song", 1.0, RuleTable::new())
            .expect("Failed to load test score");
    let t0 = Instant::now();

    controller.play(t0);
    controller.tick(t0 + secs(3.0), &[]); // countdown done, schedules both
    controller.tick(t0 + secs(3.5), &[]); // advance to 0.5s
    controller.pause(); // cancels the outstanding schedule

    controller.play(t0 + secs(10.0));
    controller.tick(t0 + secs(13.0), &[]); // resumes at 0.5s
}

#[test]
fn test_gated_touch_triggers_melody_immediately() {
    let mut audio = MockAudio::new();
    audio.expect_schedule_harmony().return_const(());
    audio
        .expect_trigger_melody()
        .withf(|n: &Note| n.pitch == 72)
        .times(1)
        .return_const(());

    let mut controller =
        GameController::new(audio, gate_song(), "test-song", 1.0, RuleTable::new())
            .expect("Failed to load test score");
    controller.set_gate_at_start(true);
    let t0 = Instant::now();

    controller.play(t0);
    controller.tick(t0 + secs(3.0), &[]);
    assert_eq!(controller.mode(), PlayMode::GatedPaused);

    let key = controller.layout().key(72).expect("no key for pitch 72");
    let touch = HandPoint {
        x: key.center_x(),
        y: 495.0,
    };
    controller.tick(t0 + secs(4.0), &[touch]);
    assert_eq!(controller.mode(), PlayMode::Playing);
}

#[test]
fn test_no_audio_commands_while_stopped() {
    // No expectations set: any backend call would panic the test
    let audio = MockAudio::new();
    let mut controller =
        GameController::new(audio, gate_song(), "test-song", 1.0, RuleTable::new())
            .expect("Failed to load test score");
    let t0 = Instant::now();

    for i in 0..10 {
        let events = controller.tick(t0 + secs(i as f64), &[]);
        assert!(events.is_empty());
    }
    assert_eq!(controller.mode(), PlayMode::Stopped);
}

#[test]
fn test_instrument_change_forwarded() {
    let mut audio = MockAudio::new();
    audio
        .expect_set_instrument()
        .withf(|name: &str| name == "organ")
        .times(1)
        .return_const(());

    let mut controller =
        GameController::new(audio, gate_song(), "test-song", 1.0, RuleTable::new())
            .expect("Failed to load test score");
    controller.change_instrument("organ");
}

/// Drives the whole game loop the way the binary does, with a
/// synthesized perfect player, and checks the final score.
#[tokio::test(start_paused = true)]
async fn test_perfect_playthrough_scores_full_marks() {
    let mut audio = MockAudio::new();
    audio.expect_schedule_harmony().return_const(());
    audio.expect_cancel_all_scheduled().return_const(());
    audio.expect_trigger_melody().times(2).return_const(());

    let mut controller =
        GameController::new(audio, gate_song(), "test-song", 1.0, RuleTable::new())
            .expect("Failed to load test score");
    let geometry = HitGeometry::default();
    let t0 = Instant::now();
    controller.play(t0);

    let mut interval = tokio::time::interval(Duration::from_millis(16));
    let mut complete = None;

    for frame in 0..600 {
        interval.tick().await;
        let now = t0 + secs(frame as f64 * 0.016);

        // Perfect player: touch the next unplayed melody note once it
        // nears the hit line
        let points: Vec<HandPoint> = if controller.mode() == PlayMode::Playing {
            let t = controller.current_time();
            controller
                .score()
                .melody
                .iter()
                .filter(|n| !controller.stats().is_played(n.id))
                .find(|n| (n.start_time - t).abs() <= 0.3)
                .and_then(|n| note_rect(n, t, controller.layout(), &geometry))
                .map(|rect| {
                    vec![HandPoint {
                        x: (rect.left + rect.right) / 2.0,
                        y: (rect.top + rect.bottom) / 2.0,
                    }]
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        for event in controller.tick(now, &points) {
            if let EngineEvent::SongComplete { percent, hit, total } = event {
                complete = Some((percent, hit, total));
            }
        }
        if complete.is_some() {
            break;
        }
    }

    let (percent, hit, total) = complete.expect("song never completed");
    assert_eq!(hit, 2);
    assert_eq!(total, 2);
    assert!((percent - 100.0).abs() < 1e-9);
}
