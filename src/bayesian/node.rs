//! A single categorical random variable with a compressed CPT.
//!
//! Sampling never panics: a missing parent value, an unknown value, or an
//! empty conditional distribution all degrade to "no value", which the
//! network layer turns into backtracking.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::bayesian::cpt::CptTree;

/// A mapping from node name to its chosen string value. A *partial*
/// assignment binds a prefix of the network's sampling order; a *complete*
/// one binds every node.
pub type Assignment = HashMap<String, String>;

/// A categorical node in a Bayesian network.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent_names: Vec<String>,
    possible_values: HashSet<String>,
    cpt: CptTree,
}

impl Node {
    /// Creates a node. Structural validation (duplicate parents, CPT depth,
    /// leaf support) happens when the node is assembled into a
    /// [`Network`](crate::bayesian::Network) by the model loader.
    pub fn new(
        name: impl Into<String>,
        parent_names: Vec<String>,
        possible_values: HashSet<String>,
        cpt: CptTree,
    ) -> Self {
        Self {
            name: name.into(),
            parent_names,
            possible_values,
            cpt,
        }
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent names, in CPT nesting order.
    pub fn parent_names(&self) -> &[String] {
        &self.parent_names
    }

    /// Every value this node can take.
    pub fn possible_values(&self) -> &HashSet<String> {
        &self.possible_values
    }

    pub(crate) fn cpt(&self) -> &CptTree {
        &self.cpt
    }

    /// The conditional distribution of this node given `assignment`.
    ///
    /// Parents missing from the assignment resolve through `skip` edges where
    /// the CPT has them; otherwise the result is the empty distribution.
    pub fn probabilities_given<'a>(&'a self, assignment: &Assignment) -> &'a [(String, f64)] {
        let path: Vec<Option<&str>> = self
            .parent_names
            .iter()
            .map(|parent| assignment.get(parent).map(String::as_str))
            .collect();
        self.cpt.resolve(&path)
    }

    /// Draws a value from the conditional distribution given `assignment`.
    ///
    /// Returns `None` when the distribution is empty. The draw walks the
    /// distribution in its own order, so two equally seeded RNGs produce
    /// identical picks.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, assignment: &Assignment) -> Option<String> {
        weighted_choice(
            rng,
            self.probabilities_given(assignment)
                .iter()
                .map(|(value, p)| (value.as_str(), *p)),
        )
    }

    /// Draws a value like [`Node::sample`], but only from `allowed` minus
    /// `banned`.
    ///
    /// The surviving candidates keep their conditional weights relative to
    /// one another (the draw renormalises), so a non-empty candidate set
    /// always yields a value. An empty intersection returns `None`; it is
    /// the backtracking signal, not an error.
    pub fn sample_restricted<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        assignment: &Assignment,
        allowed: &HashSet<String>,
        banned: &HashSet<String>,
    ) -> Option<String> {
        weighted_choice(
            rng,
            self.probabilities_given(assignment)
                .iter()
                .filter(|(value, _)| allowed.contains(value) && !banned.contains(value))
                .map(|(value, p)| (value.as_str(), *p)),
        )
    }

    /// Per-parent support of the given value whitelist. Delegates to the CPT
    /// so that propagation never has to reach into the raw table.
    pub fn support_of(&self, valid: &HashSet<String>) -> Vec<HashSet<String>> {
        self.cpt.support(valid, self.parent_names.len())
    }
}

/// Weighted categorical draw over `(value, weight)` candidates.
///
/// A uniform `u` is scaled by the total candidate mass and the first value
/// whose cumulative mass strictly exceeds it wins. Zero and negative weights
/// never win. Returns `None` when no candidate carries positive mass.
fn weighted_choice<'a, R: Rng + ?Sized>(
    rng: &mut R,
    candidates: impl Iterator<Item = (&'a str, f64)>,
) -> Option<String> {
    let candidates: Vec<(&str, f64)> = candidates.filter(|(_, p)| *p > 0.0).collect();
    let total: f64 = candidates.iter().map(|(_, p)| *p).sum();
    if total <= 0.0 {
        return None;
    }

    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (value, p) in &candidates {
        cumulative += *p;
        if cumulative > target {
            return Some((*value).to_string());
        }
    }
    // Float slop can leave the accumulated mass a hair below the target;
    // the last positive candidate is the correct pick in that case.
    candidates.last().map(|(value, _)| (*value).to_string())
}
