//! The inference side: a serving request goes in, one action comes out.
mod request;
mod router;
mod style;
mod trace;

pub use request::{GameStateRequest, RequestError, card_from_pair};
pub use router::{Decision, DecisionOutcome, DecisionRouter, mix};
pub use style::{Band, StyleCorrectionConfig, StyleNudge, StyleTarget, StyleTracker};
pub use trace::{DecisionStage, DecisionTrace};
