use clap::Parser;
use piano_fall::audio::{AudioBackend, NullAudio, SineSynth};
use piano_fall::engine::hit::note_rect;
use piano_fall::engine::{EngineEvent, GameController, HandPoint, HitGeometry, PlayMode};
use piano_fall::score::{RuleTable, ScoreError};
use piano_fall::tracking::{HandTracker, NullTracker, PlayStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

const TICK_INTERVAL: Duration = Duration::from_millis(16);
/// How close to its start time the autoplayer touches a melody note.
const AUTOPLAY_WINDOW: f64 = 0.3;

#[derive(Parser)]
#[command(name = "pianoFall", about = "Falling-notes piano game engine")]
struct Args {
    /// Path to the MIDI file to play
    midi: PathBuf,

    /// Song id for the per-song rule table (defaults to the file stem)
    #[arg(long)]
    song_id: Option<String>,

    /// Speed multiplier; 2.0 plays twice as fast
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Instrument for the synth backend (piano, organ, sine)
    #[arg(long, default_value = "piano")]
    instrument: String,

    /// Hand point style: fingertips, full-hand or solid
    #[arg(long, default_value = "fingertips")]
    style: String,

    /// Hold for the first melody touch before time advances
    #[arg(long)]
    gate: bool,

    /// Simulate a perfect player instead of reading a hand tracker
    #[arg(long)]
    autoplay: bool,
}

#[derive(Debug, Error)]
enum InitError {
    #[error("Failed to read MIDI file: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Failed to load score: {0}")]
    ScoreError(#[from] ScoreError),
}

fn parse_style(s: &str) -> PlayStyle {
    match s {
        "full-hand" => PlayStyle::FullHand,
        "solid" => PlayStyle::SolidHand,
        _ => PlayStyle::Fingertips,
    }
}

/// Stage 1: audio. Falling back to silence is fine; the game still runs.
fn init_audio() -> Box<dyn AudioBackend> {
    match SineSynth::new() {
        Ok(synth) => {
            println!("🔊 Audio backend ready");
            Box::new(synth)
        }
        Err(e) => {
            println!("⚠️ Audio unavailable ({}), continuing silent", e);
            Box::new(NullAudio)
        }
    }
}

/// Stage 2: hand tracking. A real build wires the camera adapter here;
/// failure degrades to no hands (harmony plays, gates stall).
fn init_tracker(style: PlayStyle) -> Box<dyn HandTracker> {
    let mut tracker = NullTracker;
    tracker.set_play_style(style);
    println!("🖐️ Hand tracker ready (style: {:?})", style);
    Box::new(tracker)
}

/// Synthesized "perfect player": one hand point centered on the next
/// unplayed melody note once it is close to the hit line.
fn autoplay_points(
    controller: &GameController<Box<dyn AudioBackend>>,
    geometry: &HitGeometry,
) -> Vec<HandPoint> {
    let t = controller.current_time();
    controller
        .score()
        .melody
        .iter()
        .filter(|n| !controller.stats().is_played(n.id))
        .find(|n| (n.start_time - t).abs() <= AUTOPLAY_WINDOW)
        .and_then(|n| note_rect(n, t, controller.layout(), geometry))
        .map(|rect| {
            vec![HandPoint {
                x: (rect.left + rect.right) / 2.0,
                y: (rect.top + rect.bottom) / 2.0,
            }]
        })
        .unwrap_or_default()
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::CountdownStep(step) => println!("⏱️  {}", step),
        EngineEvent::Started => println!("▶️ Playback started"),
        EngineEvent::GateReleased => println!("🖐️ Gate released!"),
        EngineEvent::NoteHit { pitch, .. } => println!("🎹 Hit note {}", pitch),
        EngineEvent::SongComplete {
            percent,
            hit,
            total,
        } => println!("✨ Song complete! Score: {:.1}% ({}/{})", percent, hit, total),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), InitError> {
    let args = Args::parse();

    println!("🎹 Piano Fall");
    println!("=============");

    let song_id = args.song_id.clone().unwrap_or_else(|| {
        args.midi
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    });

    let mut audio = init_audio();
    audio.set_instrument(&args.instrument);
    let mut tracker = init_tracker(parse_style(&args.style));

    println!("🎵 Loading MIDI file: {:?}", args.midi);
    let midi_data = std::fs::read(&args.midi)?;
    let mut controller =
        GameController::new(audio, midi_data, &song_id, args.speed, RuleTable::builtin())?;
    controller.set_gate_at_start(args.gate);

    let score = controller.score();
    println!(
        "✅ Loaded \"{}\": {} notes ({} melody, {} harmony), {:.1}s",
        score.song_id,
        score.notes.len(),
        score.melody.len(),
        score.harmony.len(),
        score.duration
    );

    let geometry = HitGeometry::default();
    controller.play(Instant::now());

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;

        let points = if args.autoplay && controller.mode() != PlayMode::CountingDown {
            autoplay_points(&controller, &geometry)
        } else {
            tracker.poll_points()
        };

        let events = controller.tick(Instant::now(), &points);
        let mut complete = false;
        for event in &events {
            print_event(event);
            if matches!(event, EngineEvent::SongComplete { .. }) {
                complete = true;
            }
        }
        if complete {
            break;
        }
    }

    Ok(())
}
