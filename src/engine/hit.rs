use crate::keyboard::KeyboardLayout;
use crate::score::note::{Note, NoteId};
use std::collections::HashSet;

/// Seconds before its start time a note becomes a valid touch target.
pub const LOOK_AHEAD: f64 = 3.0;
/// Seconds after its start time a note stays catchable.
pub const LOOK_BEHIND: f64 = 0.5;

/// A single tracked hand position, already mapped into keyboard screen
/// space by the tracking adapter. No identity across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPoint {
    pub x: f32,
    pub y: f32,
}

/// Screen-space constants for hit testing. `hit_zone_y` is the "now"
/// line the falling notes cross; `tolerance` widens it into a band.
#[derive(Debug, Clone, Copy)]
pub struct HitGeometry {
    pub hit_zone_y: f32,
    pub tolerance: f32,
    pub pixels_per_second: f32,
}

impl Default for HitGeometry {
    fn default() -> Self {
        Self {
            hit_zone_y: 500.0,
            tolerance: 50.0,
            pixels_per_second: 100.0,
        }
    }
}

/// Axis-aligned screen rectangle, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl NoteRect {
    pub fn contains(&self, point: HandPoint) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }
}

/// Where a note's falling rectangle sits at `current_time`. The bottom
/// edge reaches the hit line exactly at the note's start time. None if
/// the note's pitch has no key on the current layout.
pub fn note_rect(
    note: &Note,
    current_time: f64,
    layout: &KeyboardLayout,
    geometry: &HitGeometry,
) -> Option<NoteRect> {
    let key = layout.key(note.pitch)?;
    let time_diff = note.start_time - current_time;
    let bottom = geometry.hit_zone_y - time_diff as f32 * geometry.pixels_per_second;
    let height = note.duration as f32 * geometry.pixels_per_second;

    Some(NoteRect {
        left: key.x,
        right: key.x + key.width,
        top: bottom - height,
        bottom,
    })
}

fn in_hit_zone(rect: &NoteRect, geometry: &HitGeometry) -> bool {
    // Inclusive on both edges of the band
    rect.top <= geometry.hit_zone_y + geometry.tolerance
        && rect.bottom >= geometry.hit_zone_y - geometry.tolerance
}

/// Per-frame touch query. Pure: safe to call from both the gate and the
/// renderer. Candidates are unplayed melody notes inside the
/// lookahead/lookbehind window whose rectangle overlaps the hit band;
/// hand points are scanned outer and notes inner, both in insertion
/// order, and the first containment wins.
pub fn find_touched_note<'a>(
    hand_points: &[HandPoint],
    melody: &'a [Note],
    played: &HashSet<NoteId>,
    current_time: f64,
    layout: &KeyboardLayout,
    geometry: &HitGeometry,
) -> Option<&'a Note> {
    if hand_points.is_empty() || layout.is_empty() {
        return None;
    }

    let candidates: Vec<(&Note, NoteRect)> = melody
        .iter()
        .filter(|note| !played.contains(&note.id))
        .filter(|note| {
            let time_diff = note.start_time - current_time;
            time_diff > -LOOK_BEHIND && time_diff < LOOK_AHEAD
        })
        .filter_map(|note| {
            let rect = note_rect(note, current_time, layout, geometry)?;
            in_hit_zone(&rect, geometry).then_some((note, rect))
        })
        .collect();

    for point in hand_points {
        for (note, rect) in &candidates {
            if rect.contains(*point) {
                return Some(*note);
            }
        }
    }

    None
}
