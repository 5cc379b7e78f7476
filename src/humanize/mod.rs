//! Bounded, probabilistic deviations applied to a chosen action so play is
//! not purely solver shaped.
mod anti_pattern;

pub use anti_pattern::{
    AntiPatternConfig, AntiPatternContext, AntiPatternEffect, AntiPatternState, Humanized, apply,
};
