//! A decision engine for six-max no-limit hold'em.
//!
//! The crate is split into the pieces a live agent needs:
//!
//! - [`core`] cards, a deck and a deterministic hand evaluator.
//! - [`game`] the abstracted hand state, its legal actions and a validator.
//! - [`cfr`] an information-set store and an external-sampling MCCFR trainer
//!   that writes checkpoints.
//! - [`strategy`] a cache serving trained average strategies per game format.
//! - [`opponent`] running opponent statistics and exploit templates.
//! - [`decision`] the router that mixes all of the above into one action.
//! - [`humanize`] bounded perturbations applied to the chosen action.
//!
//! Training happens offline and only talks to serving through checkpoints
//! loaded into the [`strategy::StrategyCache`].

pub mod cfr;
pub mod config;
pub mod core;
pub mod decision;
pub mod game;
pub mod humanize;
pub mod opponent;
pub mod strategy;
