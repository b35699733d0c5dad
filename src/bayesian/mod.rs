//! Bayesian-network engine.
//!
//! This is the statistical core of the crate: a compressed conditional
//! probability representation ([`cpt`]), categorical nodes with weighted and
//! restricted sampling ([`node`]), and the network itself with unconditional
//! sampling, backtracking constrained sampling, and whitelist propagation
//! ([`network`]).
//!
//! Networks are loaded once through the [`crate::model`] module and shared
//! immutably; every sampling call takes its PRNG as an argument so callers
//! control determinism.

pub mod cpt;
pub mod network;
pub mod node;

pub use cpt::{CptTree, Distribution};
pub use network::{Constraints, Network};
pub use node::{Assignment, Node};
