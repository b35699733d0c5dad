//! Compressed conditional-probability trees.
//!
//! A node's conditional probability table is stored as a recursive tree with
//! one level per parent. At every level the tree either descends through a
//! `deeper` branch keyed by the parent's value, or takes the `skip` edge,
//! which declares that the parent's value is irrelevant on that branch.
//! Leaves carry the conditional distribution of the node's own value.
//!
//! Two operations are defined over the same structure: [`CptTree::resolve`]
//! walks a single parent assignment down to its leaf distribution, and
//! [`CptTree::support`] enumerates every path that can still produce a value
//! from a given whitelist, which drives constraint propagation.

use std::collections::{HashMap, HashSet};

/// An ordered conditional distribution: `(value, probability)` pairs in the
/// order they appeared in the source document.
///
/// The order matters: weighted draws accumulate mass in iteration order, so
/// keeping document order makes sampling reproducible for a fixed seed.
pub type Distribution = Vec<(String, f64)>;

/// One level of a parent-value path recorded during support enumeration.
/// `None` marks a `skip` edge.
type PathStep<'a> = Option<&'a str>;

/// The compressed CPT for a single node.
#[derive(Debug, Clone)]
pub enum CptTree {
    /// Interior level: descend by the next parent's value, or skip it.
    Branch {
        /// Sub-trees keyed by the parent's value at this level.
        deeper: HashMap<String, CptTree>,
        /// Sub-tree used when the parent's value does not matter here.
        skip: Option<Box<CptTree>>,
    },
    /// Terminal level: the conditional distribution of the node's own value.
    Leaf {
        /// Values and their probabilities, in document order.
        distribution: Distribution,
    },
}

impl CptTree {
    /// Resolves a parent assignment to its leaf distribution.
    ///
    /// `path` holds the assigned value of each parent in declaration order;
    /// `None` stands for a parent that is unbound. At every level the `deeper`
    /// edge for the parent's value is preferred, then the `skip` edge. A
    /// missing edge, an unbound parent with no `skip`, or a structurally
    /// short path all resolve to the empty distribution; callers treat that
    /// as "no defined conditional here", never as an error.
    pub fn resolve<'a>(&'a self, path: &[PathStep<'_>]) -> &'a [(String, f64)] {
        let mut tree = self;
        for step in path {
            match tree {
                CptTree::Leaf { .. } => return &[],
                CptTree::Branch { deeper, skip } => {
                    let by_value = step.and_then(|value| deeper.get(value));
                    tree = match (by_value, skip) {
                        (Some(sub), _) => sub,
                        (None, Some(sub)) => sub,
                        (None, None) => return &[],
                    };
                }
            }
        }
        match tree {
            CptTree::Leaf { distribution } => distribution,
            CptTree::Branch { .. } => &[],
        }
    }

    /// Enumerates the parent values that can co-occur with any value in
    /// `valid` and aggregates them per parent level.
    ///
    /// A depth-first walk visits every root-to-leaf path whose leaf assigns
    /// positive probability to at least one whitelisted value. For each such
    /// path the parent value chosen at each level is recorded; a `skip` edge
    /// records that the level is unconstrained on that path.
    ///
    /// The returned vector has `levels` entries. An empty set at level `i`
    /// means the parent imposes no constraint there: either every qualifying
    /// path skipped the level, or at least one did (a single skip path
    /// already admits any parent value, so the level cannot constrain). A
    /// non-empty set is exact: any parent value outside it provably drives
    /// the node's mass over `valid` to zero.
    pub fn support(&self, valid: &HashSet<String>, levels: usize) -> Vec<HashSet<String>> {
        let mut values: Vec<HashSet<String>> = vec![HashSet::new(); levels];
        let mut saw_skip = vec![false; levels];
        let mut path: Vec<PathStep<'_>> = Vec::with_capacity(levels);
        self.walk_support(valid, &mut path, &mut values, &mut saw_skip);

        for (level, skipped) in saw_skip.into_iter().enumerate() {
            if skipped {
                values[level].clear();
            }
        }
        values
    }

    fn walk_support<'a>(
        &'a self,
        valid: &HashSet<String>,
        path: &mut Vec<PathStep<'a>>,
        values: &mut [HashSet<String>],
        saw_skip: &mut [bool],
    ) {
        match self {
            CptTree::Leaf { distribution } => {
                let qualifies = distribution
                    .iter()
                    .any(|(value, p)| *p > 0.0 && valid.contains(value));
                if !qualifies {
                    return;
                }
                for (level, step) in path.iter().enumerate() {
                    if level >= values.len() {
                        break;
                    }
                    match step {
                        Some(value) => {
                            values[level].insert((*value).to_string());
                        }
                        None => saw_skip[level] = true,
                    }
                }
            }
            CptTree::Branch { deeper, skip } => {
                for (value, sub) in deeper {
                    path.push(Some(value.as_str()));
                    sub.walk_support(valid, path, values, saw_skip);
                    path.pop();
                }
                if let Some(sub) = skip {
                    path.push(None);
                    sub.walk_support(valid, path, values, saw_skip);
                    path.pop();
                }
            }
        }
    }

    /// Depth of every root-to-leaf path, or `None` when paths disagree.
    /// A well-formed CPT for a node with `k` parents is uniformly `k` deep.
    pub(crate) fn uniform_depth(&self) -> Option<usize> {
        match self {
            CptTree::Leaf { .. } => Some(0),
            CptTree::Branch { deeper, skip } => {
                let mut depth = None;
                let children = deeper
                    .values()
                    .chain(skip.iter().map(|boxed| boxed.as_ref()));
                for child in children {
                    let child_depth = child.uniform_depth()?;
                    match depth {
                        None => depth = Some(child_depth),
                        Some(d) if d != child_depth => return None,
                        Some(_) => {}
                    }
                }
                depth.map(|d| d + 1)
            }
        }
    }

    /// Visits every leaf distribution.
    pub(crate) fn for_each_leaf(&self, f: &mut impl FnMut(&Distribution)) {
        match self {
            CptTree::Leaf { distribution } => f(distribution),
            CptTree::Branch { deeper, skip } => {
                for sub in deeper.values() {
                    sub.for_each_leaf(f);
                }
                if let Some(sub) = skip {
                    sub.for_each_leaf(f);
                }
            }
        }
    }
}
