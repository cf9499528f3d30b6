//! # ztna-policy
//!
//! Policy Decision Point.
//!
//! [`PolicyEvaluator`] is a pure function from a request-scoped
//! [`DecisionInput`] to a [`PolicyDecision`]. [`PolicyDecisionPoint`] gathers
//! that input from the device registry and the challenge verifier. Denials
//! are decisions with a reason, never errors.

#![warn(clippy::all)]

pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod types;

pub use engine::{DecisionPoint, PolicyDecisionPoint};
pub use errors::{PolicyError, Result};
pub use evaluator::PolicyEvaluator;
pub use types::*;
