pub mod note;
pub mod parse;
pub mod rules;

pub use self::note::{Note, NoteId};
pub use self::parse::{Score, ScoreError};
pub use self::rules::{RuleTable, SongRule};
