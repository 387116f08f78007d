use crate::score::note::NoteId;
use std::collections::HashSet;

/// Bookkeeping for one playthrough: which melody notes are satisfied
/// and how many the player actually touched. Notes that scroll past
/// untouched are marked played so they stop being gate candidates, but
/// they never count toward the score.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    played: HashSet<NoteId>,
    touched_count: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.played.clear();
        self.touched_count = 0;
    }

    /// Credit a touch. Returns false if the note was already satisfied
    /// (no double credit).
    pub fn mark_touched(&mut self, id: NoteId) -> bool {
        let newly = self.played.insert(id);
        if newly {
            self.touched_count += 1;
        }
        newly
    }

    /// Mark a note satisfied without crediting it.
    pub fn mark_passed(&mut self, id: NoteId) {
        self.played.insert(id);
    }

    pub fn is_played(&self, id: NoteId) -> bool {
        self.played.contains(&id)
    }

    pub fn played(&self) -> &HashSet<NoteId> {
        &self.played
    }

    pub fn touched_count(&self) -> usize {
        self.touched_count
    }

    /// Final accuracy in percent. Defined as 0 for an empty melody.
    pub fn final_percent(&self, melody_len: usize) -> f64 {
        if melody_len == 0 {
            0.0
        } else {
            self.touched_count as f64 / melody_len as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_credits_once() {
        let mut stats = Stats::new();
        let id = NoteId::new(0, 0);
        assert!(stats.mark_touched(id));
        assert!(!stats.mark_touched(id));
        assert_eq!(stats.touched_count(), 1);
    }

    #[test]
    fn test_passed_notes_get_no_credit() {
        let mut stats = Stats::new();
        stats.mark_passed(NoteId::new(0, 0));
        stats.mark_passed(NoteId::new(0, 1));
        assert_eq!(stats.touched_count(), 0);
        assert!(stats.is_played(NoteId::new(0, 0)));
    }

    #[test]
    fn test_touch_after_pass_gets_no_credit() {
        let mut stats = Stats::new();
        let id = NoteId::new(0, 0);
        stats.mark_passed(id);
        assert!(!stats.mark_touched(id));
        assert_eq!(stats.touched_count(), 0);
    }

    #[test]
    fn test_empty_melody_scores_zero() {
        let stats = Stats::new();
        assert_eq!(stats.final_percent(0), 0.0);
    }

    #[test]
    fn test_percent() {
        let mut stats = Stats::new();
        stats.mark_touched(NoteId::new(0, 0));
        stats.mark_touched(NoteId::new(0, 1));
        stats.mark_passed(NoteId::new(0, 2));
        assert!((stats.final_percent(4) - 50.0).abs() < 1e-9);
    }
}
