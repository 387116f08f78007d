use std::collections::HashMap;

/// Per-song load adjustments, keyed by song id. Replaces ad hoc
/// filename matching: a song either has an entry here or loads as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SongRule {
    /// Added to every note's pitch; notes shifted outside the piano
    /// range are dropped.
    pub transpose_semitones: i8,
    /// Discard the harmony partition entirely after the split.
    pub suppress_harmony: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, SongRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table shipped with the game. "clair-de-lune" keeps the observable
    /// behavior of the original arrangement: down an octave, melody only.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "clair-de-lune",
            SongRule {
                transpose_semitones: -12,
                suppress_harmony: true,
            },
        );
        table
    }

    pub fn insert(&mut self, song_id: &str, rule: SongRule) {
        self.rules.insert(song_id.to_string(), rule);
    }

    pub fn lookup(&self, song_id: &str) -> SongRule {
        self.rules.get(song_id).copied().unwrap_or_default()
    }
}
