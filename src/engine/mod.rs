pub mod controller;
pub mod events;
pub mod hit;
pub mod state;
pub mod stats;

pub use self::controller::GameController;
pub use self::events::EngineEvent;
pub use self::hit::{find_touched_note, HandPoint, HitGeometry};
pub use self::state::{PlayMode, PlaybackState};
pub use self::stats::Stats;
