//! Matching of neighbour edges against triple constraints.

use crate::graph::NeighborEdge;
use crate::model::TripleConstraint;
use crate::typing::Typing;

/// Decides if an edge may be assigned to a triple constraint.
pub trait Matcher {
    /// Returns true if `edge` can be matched by `constraint`.
    fn matches(&self, edge: &NeighborEdge, constraint: &TripleConstraint) -> bool;
}

/// Compares predicate and direction only.
///
/// Used to find which value validations have to run before the precise pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateOnlyMatcher;

impl Matcher for PredicateOnlyMatcher {
    fn matches(&self, edge: &NeighborEdge, constraint: &TripleConstraint) -> bool {
        edge.predicate == constraint.predicate && edge.is_inverse() == constraint.inverse
    }
}

/// Compares predicate and direction, then requires the other end of the edge to be
/// in the typing for the constraint value shape.
#[derive(Debug, Clone, Copy)]
pub struct PredicateAndValueMatcher<'a> {
    typing: &'a Typing,
}

impl<'a> PredicateAndValueMatcher<'a> {
    /// Creates a matcher reading the given typing.
    pub fn new(typing: &'a Typing) -> Self {
        Self { typing }
    }
}

impl Matcher for PredicateAndValueMatcher<'_> {
    fn matches(&self, edge: &NeighborEdge, constraint: &TripleConstraint) -> bool {
        PredicateOnlyMatcher.matches(edge, constraint)
            && constraint
                .value_label()
                .is_none_or(|label| self.typing.contains(&edge.other, label))
    }
}

/// Lists, for each edge in order, the indices of the constraints it matches.
pub fn collect_matching_constraints(
    edges: &[NeighborEdge],
    constraints: &[TripleConstraint],
    matcher: &impl Matcher,
) -> Vec<Vec<usize>> {
    edges
        .iter()
        .map(|edge| {
            constraints
                .iter()
                .enumerate()
                .filter(|(_, constraint)| matcher.matches(edge, constraint))
                .map(|(i, _)| i)
                .collect()
        })
        .collect()
}
