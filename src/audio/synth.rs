use super::AudioBackend;
use crate::score::note::{Note, MIN_NOTE_DURATION};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("No output device found")]
    NoDevice,
    #[error("Failed to query device config: {0}")]
    ConfigError(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build output stream: {0}")]
    BuildError(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    PlayError(#[from] cpal::PlayStreamError),
}

const A4_FREQUENCY: f32 = 440.0;
const MIDI_A4_NOTE: i32 = 69;
const MASTER_GAIN: f32 = 0.25;

fn note_to_frequency(note: i32) -> f32 {
    A4_FREQUENCY * 2.0f32.powf((note - MIDI_A4_NOTE) as f32 / 12.0)
}

/// Relative strengths of the first three harmonics per instrument.
#[derive(Debug, Clone, Copy)]
struct Timbre([f32; 3]);

impl Timbre {
    fn for_instrument(name: &str) -> Self {
        match name {
            "organ" => Timbre([0.6, 0.3, 0.1]),
            "piano" => Timbre([0.8, 0.15, 0.05]),
            _ => Timbre([1.0, 0.0, 0.0]), // plain sine
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    frequency: f32,
    amplitude: f32,
    phase: f32,
    /// Sample clock values this voice sounds during.
    start_sample: u64,
    end_sample: u64,
}

struct Mixer {
    sample_clock: u64,
    sample_rate: f32,
    voices: Vec<Voice>,
    timbre: Timbre,
}

impl Mixer {
    fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels) {
            let clock = self.sample_clock;
            let mut sample = 0.0f32;

            for voice in self.voices.iter_mut() {
                if clock < voice.start_sample || clock >= voice.end_sample {
                    continue;
                }
                // Short linear release to avoid clicks at note end
                let remaining = (voice.end_sample - clock) as f32 / self.sample_rate;
                let envelope = (remaining / 0.02).min(1.0);

                let phase = voice.phase;
                let mut tone = 0.0f32;
                for (i, strength) in self.timbre.0.iter().enumerate() {
                    tone += strength
                        * (phase * (i + 1) as f32 * std::f32::consts::TAU).sin();
                }
                sample += tone * voice.amplitude * envelope;

                voice.phase += voice.frequency / self.sample_rate;
                if voice.phase >= 1.0 {
                    voice.phase -= 1.0;
                }
            }

            let clock_now = self.sample_clock;
            self.voices.retain(|v| v.end_sample > clock_now);

            let out = sample * MASTER_GAIN;
            for channel in frame.iter_mut() {
                *channel = out;
            }
            self.sample_clock += 1;
        }
    }
}

/// Oscillator-based audio backend on the system output device. Harmony
/// notes are queued against the stream's sample clock; melody triggers
/// start at the current clock position.
pub struct SineSynth {
    // Held so the stream keeps running; dropped on drop.
    _stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: f32,
}

impl SineSynth {
    pub fn new() -> Result<Self, SynthError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(SynthError::NoDevice)?;
        let default_format = device.default_output_config()?.config();

        let stream_config = StreamConfig {
            channels: default_format.channels,
            sample_rate: default_format.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_rate = default_format.sample_rate.0 as f32;
        let channels = default_format.channels as usize;

        let mixer = Arc::new(Mutex::new(Mixer {
            sample_clock: 0,
            sample_rate,
            voices: Vec::new(),
            timbre: Timbre::for_instrument("piano"),
        }));

        let mixer_clone = Arc::clone(&mixer);
        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut mixer) = mixer_clone.lock() {
                    mixer.render(data, channels);
                } else {
                    data.fill(0.0);
                }
            },
            move |err| eprintln!("Error in output stream: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            mixer,
            sample_rate,
        })
    }

    fn push_voice(&mut self, note: &Note, delay: Duration) {
        let Ok(mut mixer) = self.mixer.lock() else {
            return;
        };
        let start_sample =
            mixer.sample_clock + (delay.as_secs_f64() * self.sample_rate as f64) as u64;
        let audible = note.duration.max(MIN_NOTE_DURATION);
        let end_sample = start_sample + (audible * self.sample_rate as f64) as u64;

        mixer.voices.push(Voice {
            frequency: note_to_frequency(note.pitch as i32),
            amplitude: note.velocity,
            phase: 0.0,
            start_sample,
            end_sample,
        });
    }
}

impl AudioBackend for SineSynth {
    fn schedule_harmony(&mut self, note: &Note, at: Duration) {
        self.push_voice(note, at);
    }

    fn cancel_all_scheduled(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            // Cut everything, sounding or pending: stop means silence
            mixer.voices.clear();
        }
    }

    fn trigger_melody(&mut self, note: &Note) {
        self.push_voice(note, Duration::ZERO);
    }

    fn set_instrument(&mut self, name: &str) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.timbre = Timbre::for_instrument(name);
        }
    }
}
