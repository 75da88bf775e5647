//! Read-only access to the neighbourhood of a node.

use oxrdf::{Graph, NamedNode, Term, TripleRef};
use rustc_hash::FxHashSet;

/// Orientation of an edge relative to the focus node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The focus node is the subject.
    Forward,
    /// The focus node is the object.
    Inverse,
}

/// A triple seen from one of its ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighborEdge {
    /// The node whose neighbourhood is listed.
    pub focus: Term,
    /// The triple predicate.
    pub predicate: NamedNode,
    /// Whether the focus node is the subject or the object of the triple.
    pub direction: Direction,
    /// The other end of the triple.
    pub other: Term,
}

impl NeighborEdge {
    /// Returns true if the focus node is the object of the triple.
    pub fn is_inverse(&self) -> bool {
        self.direction == Direction::Inverse
    }

    /// The subject of the underlying triple.
    pub fn subject(&self) -> &Term {
        match self.direction {
            Direction::Forward => &self.focus,
            Direction::Inverse => &self.other,
        }
    }

    /// The object of the underlying triple.
    pub fn object(&self) -> &Term {
        match self.direction {
            Direction::Forward => &self.other,
            Direction::Inverse => &self.focus,
        }
    }

    /// The same triple seen from its other end.
    #[must_use]
    pub fn opposite(&self) -> Self {
        Self {
            focus: self.other.clone(),
            predicate: self.predicate.clone(),
            direction: match self.direction {
                Direction::Forward => Direction::Inverse,
                Direction::Inverse => Direction::Forward,
            },
            other: self.focus.clone(),
        }
    }
}

/// Graph collaborator of the validator.
///
/// Implementations must list edges in the same order for the same graph and must not
/// change while a validation runs.
pub trait NeighborGraph {
    /// Edges whose subject is `node`.
    fn out_neighbors(&self, node: &Term) -> Vec<NeighborEdge>;

    /// Edges whose subject is `node` and whose predicate is in `predicates`.
    fn out_neighbors_with_predicates(
        &self,
        node: &Term,
        predicates: &FxHashSet<NamedNode>,
    ) -> Vec<NeighborEdge> {
        let mut edges = self.out_neighbors(node);
        edges.retain(|edge| predicates.contains(&edge.predicate));
        edges
    }

    /// Edges whose object is `node` and whose predicate is in `predicates`.
    fn in_neighbors_with_predicates(
        &self,
        node: &Term,
        predicates: &FxHashSet<NamedNode>,
    ) -> Vec<NeighborEdge>;
}

impl NeighborGraph for Graph {
    fn out_neighbors(&self, node: &Term) -> Vec<NeighborEdge> {
        out_neighbors_filtered(self, node, |_| true)
    }

    fn out_neighbors_with_predicates(
        &self,
        node: &Term,
        predicates: &FxHashSet<NamedNode>,
    ) -> Vec<NeighborEdge> {
        if predicates.is_empty() {
            return Vec::new();
        }
        out_neighbors_filtered(self, node, |p| predicates.contains(p))
    }

    fn in_neighbors_with_predicates(
        &self,
        node: &Term,
        predicates: &FxHashSet<NamedNode>,
    ) -> Vec<NeighborEdge> {
        if predicates.is_empty() {
            return Vec::new();
        }
        self.triples_for_object(node)
            .filter(|t| predicates.contains(&t.predicate.into_owned()))
            .map(|t| NeighborEdge {
                focus: node.clone(),
                predicate: t.predicate.into_owned(),
                direction: Direction::Inverse,
                other: Term::from(t.subject.into_owned()),
            })
            .collect()
    }
}

fn out_neighbors_filtered(
    graph: &Graph,
    node: &Term,
    keep: impl Fn(&NamedNode) -> bool,
) -> Vec<NeighborEdge> {
    let triples: Vec<TripleRef<'_>> = match node {
        Term::NamedNode(n) => graph.triples_for_subject(n).collect(),
        Term::BlankNode(b) => graph.triples_for_subject(b).collect(),
        Term::Literal(_) => return Vec::new(),
        #[cfg(feature = "rdf-12")]
        Term::Triple(_) => return Vec::new(),
    };
    triples
        .into_iter()
        .map(|t| (t.predicate.into_owned(), t.object.into_owned()))
        .filter(|(predicate, _)| keep(predicate))
        .map(|(predicate, other)| NeighborEdge {
            focus: node.clone(),
            predicate,
            direction: Direction::Forward,
            other,
        })
        .collect()
}
