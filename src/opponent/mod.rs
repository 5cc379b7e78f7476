//! Opponent modeling: running statistics per opponent, a rule based
//! classification and the exploit templates derived from it.
mod exploit;
mod profile;
mod profiler;

pub use exploit::{ExploitAdjustment, ExploitConfig, HandClass};
pub use profile::{HandObservation, OpponentProfile, PlayerType};
pub use profiler::OpponentProfiler;
