use crate::score::parse::Score;
use crate::score::note::{PITCH_MAX, PITCH_MIN};

pub const WHITE_KEY_WIDTH: f32 = 40.0;
pub const BLACK_KEY_WIDTH: f32 = 24.0;
/// Keys added on each side of the score's pitch range.
const RANGE_PADDING: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub pitch: u8,
    pub is_black: bool,
    /// Left edge in screen pixels.
    pub x: f32,
    pub width: f32,
}

impl Key {
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Screen geometry for the visible keyboard, derived from a score's
/// pitch range. Rebuilt whenever the range changes; the hit detector
/// queries it for a falling note's column.
#[derive(Debug, Clone, Default)]
pub struct KeyboardLayout {
    keys: Vec<Key>,
}

impl KeyboardLayout {
    pub fn for_score(score: &Score) -> Self {
        let (min, max) = score.pitch_range();
        let low = min.saturating_sub(RANGE_PADDING).max(PITCH_MIN);
        let high = max.saturating_add(RANGE_PADDING).min(PITCH_MAX);
        Self::for_range(low, high)
    }

    pub fn for_range(low: u8, high: u8) -> Self {
        let mut keys = Vec::new();
        let mut white_count = 0u32;

        for pitch in low..=high {
            if is_black_key(pitch) {
                // Straddles the boundary between the surrounding whites
                keys.push(Key {
                    pitch,
                    is_black: true,
                    x: white_count as f32 * WHITE_KEY_WIDTH - BLACK_KEY_WIDTH / 2.0,
                    width: BLACK_KEY_WIDTH,
                });
            } else {
                keys.push(Key {
                    pitch,
                    is_black: false,
                    x: white_count as f32 * WHITE_KEY_WIDTH,
                    width: WHITE_KEY_WIDTH,
                });
                white_count += 1;
            }
        }

        Self { keys }
    }

    pub fn key(&self, pitch: u8) -> Option<&Key> {
        self.keys.iter().find(|k| k.pitch == pitch)
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total width in pixels, for the renderer's viewport.
    pub fn width(&self) -> f32 {
        self.keys
            .iter()
            .map(|k| k.x + k.width)
            .fold(0.0f32, f32::max)
    }
}

fn is_black_key(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}
