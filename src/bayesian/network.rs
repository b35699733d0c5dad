//! Bayesian network over string-valued categorical nodes.
//!
//! The network is an ordered node list (every parent precedes its children)
//! plus a name index. Three operations share that structure: unconditional
//! forward sampling, constrained sampling with backtracking, and closed-form
//! whitelist propagation. A loaded network is immutable and can be shared
//! freely across concurrent requests; all per-call state lives on the stack.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::trace;

use crate::bayesian::node::{Assignment, Node};
use crate::model::ModelError;

/// Per-node value whitelists. Names that are absent are unconstrained.
pub type Constraints = HashMap<String, HashSet<String>>;

/// An immutable Bayesian network in sampling order.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Network {
    /// Assembles a network from nodes already in sampling order.
    ///
    /// Fails with [`ModelError::Malformed`] when names collide, a parent is
    /// unknown or declared after its child, a parent list holds duplicates,
    /// a CPT's depth disagrees with its parent count, or a leaf assigns
    /// probability to a value outside the node's domain.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.name().to_string(), position).is_some() {
                return Err(ModelError::Malformed(format!(
                    "duplicate node name '{}'",
                    node.name()
                )));
            }

            let mut seen_parents = HashSet::new();
            for parent in node.parent_names() {
                if !seen_parents.insert(parent.as_str()) {
                    return Err(ModelError::Malformed(format!(
                        "node '{}' lists parent '{}' twice",
                        node.name(),
                        parent
                    )));
                }
                match index.get(parent) {
                    Some(parent_position) if *parent_position < position => {}
                    _ => {
                        return Err(ModelError::Malformed(format!(
                            "node '{}' depends on '{}', which does not precede it",
                            node.name(),
                            parent
                        )))
                    }
                }
            }

            match node.cpt().uniform_depth() {
                Some(depth) if depth == node.parent_names().len() => {}
                Some(depth) => {
                    return Err(ModelError::Malformed(format!(
                        "node '{}' has {} parents but its CPT is {} levels deep",
                        node.name(),
                        node.parent_names().len(),
                        depth
                    )))
                }
                None => {
                    return Err(ModelError::Malformed(format!(
                        "node '{}' has a CPT with uneven depth",
                        node.name()
                    )))
                }
            }

            let mut bad_leaf: Option<String> = None;
            node.cpt().for_each_leaf(&mut |distribution| {
                for (value, p) in distribution {
                    if *p < 0.0 || !p.is_finite() {
                        bad_leaf.get_or_insert_with(|| {
                            format!("value '{value}' carries probability {p}")
                        });
                    }
                    if !node.possible_values().contains(value) {
                        bad_leaf.get_or_insert_with(|| {
                            format!("leaf value '{value}' is outside the declared domain")
                        });
                    }
                }
            });
            if let Some(reason) = bad_leaf {
                return Err(ModelError::Malformed(format!(
                    "node '{}': {reason}",
                    node.name()
                )));
            }
        }

        Ok(Self { nodes, index })
    }

    /// Nodes in sampling order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Looks a node up by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|position| &self.nodes[*position])
    }

    /// Unconditional forward sampling.
    ///
    /// Nodes already bound in `fixed` are never resampled, even when the
    /// binding is inconsistent with the CPTs; the caller owns that
    /// contract. Nodes whose conditional distribution resolves empty are
    /// left unbound.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, fixed: &Assignment) -> Assignment {
        let mut assignment = fixed.clone();
        for node in &self.nodes {
            if assignment.contains_key(node.name()) {
                continue;
            }
            if let Some(value) = node.sample(rng, &assignment) {
                assignment.insert(node.name().to_string(), value);
            }
        }
        assignment
    }

    /// Constrained sampling with backtracking.
    ///
    /// Walks the sampling order depth-first, drawing each node from the
    /// intersection of its whitelist (or full domain) with the conditional
    /// support, banning failed values per level. Returns `None` when no
    /// complete consistent assignment exists under `constraints`.
    ///
    /// The search carries an explicit frame stack rather than recursing, so
    /// network depth never threatens the call stack. Within a level the draw
    /// is the same weighted mechanism as unconditional sampling, which makes
    /// repeated calls randomised but exhaustive.
    pub fn sample_consistent<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        constraints: &Constraints,
    ) -> Option<Assignment> {
        let mut assignment = Assignment::new();
        // banned[d] holds values already refuted at depth d;
        // chosen[d] is the binding currently under trial there.
        let mut banned: Vec<HashSet<String>> = vec![HashSet::new()];
        let mut chosen: Vec<String> = Vec::new();

        loop {
            let depth = chosen.len();
            if depth == self.nodes.len() {
                return Some(assignment);
            }
            let node = &self.nodes[depth];
            let allowed = constraints
                .get(node.name())
                .unwrap_or_else(|| node.possible_values());

            match node.sample_restricted(rng, &assignment, allowed, &banned[depth]) {
                Some(value) => {
                    trace!(node = node.name(), %value, depth, "bound");
                    assignment.insert(node.name().to_string(), value.clone());
                    chosen.push(value);
                    banned.push(HashSet::new());
                }
                None => {
                    if depth == 0 {
                        return None;
                    }
                    banned.pop();
                    let Some(refuted) = chosen.pop() else {
                        return None;
                    };
                    let parent_node = &self.nodes[depth - 1];
                    trace!(node = parent_node.name(), value = %refuted, "backtracking");
                    assignment.remove(parent_node.name());
                    banned[depth - 1].insert(refuted);
                }
            }
        }
    }

    /// Propagates whitelists through local CPT support.
    ///
    /// For every constrained node the per-parent support of its whitelist is
    /// computed, and everything derived for the same name is intersected.
    /// Returns the tightened constraint set, or `None` when the constraints
    /// are provably unsatisfiable under the local model (an empty whitelist
    /// on input, or an intersection that ran dry).
    ///
    /// Unknown node names are ignored; the constraint is dropped. This is
    /// local propagation only: it rules out parent values that zero a
    /// child's mass, but residual cross-cousin inconsistency is left for
    /// [`Network::sample_consistent`] to catch.
    pub fn possible_values(&self, constraints: &Constraints) -> Option<Constraints> {
        let mut tightened = Constraints::new();

        for (name, whitelist) in constraints {
            if whitelist.is_empty() {
                trace!(node = name.as_str(), "empty whitelist, propagation fails");
                return None;
            }
            let Some(node) = self.node(name) else {
                trace!(node = name.as_str(), "unknown node ignored by propagation");
                continue;
            };

            if !intersect_into(&mut tightened, name, whitelist.clone()) {
                return None;
            }
            let levels = node.support_of(whitelist);
            for (parent, support) in node.parent_names().iter().zip(levels) {
                if support.is_empty() {
                    continue;
                }
                if !intersect_into(&mut tightened, parent, support) {
                    return None;
                }
            }
        }

        Some(tightened)
    }
}

/// Intersects `incoming` into `target[name]`; a first binding is taken as-is.
/// Returns `false` when the intersection runs dry.
fn intersect_into(target: &mut Constraints, name: &str, incoming: HashSet<String>) -> bool {
    match target.get_mut(name) {
        None => {
            target.insert(name.to_string(), incoming);
            true
        }
        Some(existing) => {
            existing.retain(|value| incoming.contains(value));
            !existing.is_empty()
        }
    }
}
