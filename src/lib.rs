pub mod audio;
pub mod engine;
pub mod keyboard;
pub mod score;
pub mod tracking;
