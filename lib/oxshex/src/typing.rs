//! Memo table of (node, shape label) verdicts.

use oxrdf::{NamedNode, Term};
use rustc_hash::FxHashMap;

use crate::model::{ShapeLabel, TripleExprLabel};

/// State of a (node, shape label) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The node conforms to the shape.
    Conforms,
    /// The node does not conform to the shape.
    DoesNotConform,
    /// The pair is being validated and is assumed to conform meanwhile.
    Hypothesis,
}

/// A triple that has been matched to a labeled triple constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchedTriple {
    /// The triple subject.
    pub subject: Term,
    /// The triple predicate.
    pub predicate: NamedNode,
    /// The triple object.
    pub object: Term,
    /// Label of the constraint the triple was matched to.
    pub label: TripleExprLabel,
}

/// Position in the resolution log, taken when a hypothesis is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

/// Verdicts computed by a validator.
///
/// A missing pair and a [`Verdict::DoesNotConform`] pair are both reported as not contained.
#[derive(Debug, Clone, Default)]
pub struct Typing {
    verdicts: FxHashMap<Term, FxHashMap<ShapeLabel, Verdict>>,
    /// Pairs hypothesized since the last commit, in order.
    log: Vec<(Term, ShapeLabel)>,
    matches: FxHashMap<(Term, ShapeLabel), Vec<MatchedTriple>>,
}

impl Typing {
    /// Creates an empty typing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the verdict of a pair, if it has one.
    pub fn verdict(&self, node: &Term, label: &ShapeLabel) -> Option<Verdict> {
        self.verdicts.get(node)?.get(label).copied()
    }

    /// Returns true if the pair conforms or is hypothesized to conform.
    pub fn contains(&self, node: &Term, label: &ShapeLabel) -> bool {
        matches!(
            self.verdict(node, label),
            Some(Verdict::Conforms | Verdict::Hypothesis)
        )
    }

    /// Returns true if the pair has been proven to conform.
    pub fn conforms(&self, node: &Term, label: &ShapeLabel) -> bool {
        self.verdict(node, label) == Some(Verdict::Conforms)
    }

    /// Iterates over every pair with its verdict.
    pub fn iter(&self) -> impl Iterator<Item = (&Term, &ShapeLabel, Verdict)> {
        self.verdicts.iter().flat_map(|(node, labels)| {
            labels
                .iter()
                .map(move |(label, verdict)| (node, label, *verdict))
        })
    }

    /// Iterates over the pairs that conform.
    pub fn shape_facts(&self) -> impl Iterator<Item = (&Term, &ShapeLabel)> {
        self.iter()
            .filter(|(_, _, verdict)| *verdict == Verdict::Conforms)
            .map(|(node, label, _)| (node, label))
    }

    /// Iterates over the triples matched to labeled constraints by conforming pairs.
    pub fn triple_facts(&self) -> impl Iterator<Item = &MatchedTriple> {
        self.matches.values().flatten()
    }

    /// Triples matched to labeled constraints when `node` was checked against `label`.
    pub fn matched_triples(&self, node: &Term, label: &ShapeLabel) -> &[MatchedTriple] {
        self.matches
            .get(&(node.clone(), label.clone()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of pairs with a verdict.
    pub fn len(&self) -> usize {
        self.verdicts.values().map(FxHashMap::len).sum()
    }

    /// Returns true if no pair has a verdict.
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Forgets every verdict.
    pub fn clear(&mut self) {
        self.verdicts.clear();
        self.log.clear();
        self.matches.clear();
    }

    pub(crate) fn hypothesize(&mut self, node: &Term, label: &ShapeLabel) -> Checkpoint {
        self.set(node, label, Verdict::Hypothesis);
        self.log.push((node.clone(), label.clone()));
        Checkpoint(self.log.len())
    }

    pub(crate) fn confirm(&mut self, node: &Term, label: &ShapeLabel, matches: Vec<MatchedTriple>) {
        self.set(node, label, Verdict::Conforms);
        if !matches.is_empty() {
            self.matches.insert((node.clone(), label.clone()), matches);
        }
    }

    /// Marks the pair as failed and drops every positive verdict concluded since `checkpoint`,
    /// as they may rely on the failed hypothesis.
    pub(crate) fn refute(&mut self, node: &Term, label: &ShapeLabel, checkpoint: Checkpoint) {
        let start = checkpoint.0.min(self.log.len());
        for (other_node, other_label) in self.log.drain(start..) {
            let Some(labels) = self.verdicts.get_mut(&other_node) else {
                continue;
            };
            if matches!(
                labels.get(&other_label),
                Some(Verdict::Conforms | Verdict::Hypothesis)
            ) {
                labels.remove(&other_label);
                if labels.is_empty() {
                    self.verdicts.remove(&other_node);
                }
                self.matches.remove(&(other_node, other_label));
            }
        }
        self.matches.remove(&(node.clone(), label.clone()));
        self.set(node, label, Verdict::DoesNotConform);
    }

    /// Forgets the resolution log once no hypothesis is pending anymore.
    pub(crate) fn commit(&mut self) {
        self.log.clear();
    }

    fn set(&mut self, node: &Term, label: &ShapeLabel, verdict: Verdict) {
        self.verdicts
            .entry(node.clone())
            .or_default()
            .insert(label.clone(), verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(name: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn label(name: &str) -> ShapeLabel {
        ShapeLabel::iri_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn test_hypothesis_is_contained() {
        let mut typing = Typing::new();
        typing.hypothesize(&term("n"), &label("S"));
        assert!(typing.contains(&term("n"), &label("S")));
        assert!(!typing.conforms(&term("n"), &label("S")));
        assert!(!typing.contains(&term("n"), &label("T")));
        assert_eq!(typing.verdict(&term("m"), &label("S")), None);
    }

    #[test]
    fn test_confirm_records_matches() {
        let mut typing = Typing::new();
        typing.hypothesize(&term("n"), &label("S"));
        let matched = MatchedTriple {
            subject: term("n"),
            predicate: NamedNode::new_unchecked("http://example.org/p"),
            object: term("m"),
            label: label("tc"),
        };
        typing.confirm(&term("n"), &label("S"), vec![matched.clone()]);
        typing.commit();
        assert!(typing.conforms(&term("n"), &label("S")));
        assert_eq!(typing.matched_triples(&term("n"), &label("S")), &[matched]);
        assert_eq!(typing.triple_facts().count(), 1);
        assert_eq!(typing.shape_facts().count(), 1);
    }

    #[test]
    fn test_refute_rolls_back_later_conclusions() {
        let mut typing = Typing::new();
        typing.hypothesize(&term("a"), &label("S"));
        typing.confirm(&term("a"), &label("S"), Vec::new());

        let checkpoint = typing.hypothesize(&term("n"), &label("S"));
        typing.hypothesize(&term("m"), &label("S"));
        typing.confirm(&term("m"), &label("S"), Vec::new());
        typing.hypothesize(&term("m"), &label("T"));
        typing.refute(&term("m"), &label("T"), Checkpoint(typing.log.len()));
        typing.refute(&term("n"), &label("S"), checkpoint);

        assert_eq!(
            typing.verdict(&term("n"), &label("S")),
            Some(Verdict::DoesNotConform)
        );
        assert_eq!(typing.verdict(&term("m"), &label("S")), None);
        assert_eq!(
            typing.verdict(&term("m"), &label("T")),
            Some(Verdict::DoesNotConform)
        );
        assert!(typing.conforms(&term("a"), &label("S")));
        assert_eq!(typing.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut typing = Typing::new();
        typing.hypothesize(&term("n"), &label("S"));
        typing.clear();
        assert!(typing.is_empty());
    }
}
