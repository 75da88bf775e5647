//! Recursive ShEx validation.
//!
//! The validator decides if a node conforms to a shape by assuming it does, evaluating the
//! shape definition and then confirming or refuting the assumption. Verdicts are memoized
//! in a [`Typing`] so that every (node, label) pair is evaluated at most once per run, and
//! recursive references terminate on the pending hypothesis.

use std::rc::Rc;

use oxrdf::{Graph, Term};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use crate::bag::BagIterator;
use crate::error::{FormulaError, ShexValidationError};
use crate::formula::Formula;
use crate::graph::{NeighborEdge, NeighborGraph};
use crate::interval::is_satisfied;
use crate::limits::ValidationLimits;
use crate::matcher::{PredicateAndValueMatcher, PredicateOnlyMatcher, collect_matching_constraints};
use crate::model::{Shape, ShapeExpression, ShapeLabel};
use crate::node_constraint::{RegexCache, satisfies_node_constraint};
use crate::schema::ShexSchema;
use crate::sorbe::SorbeTripleExpr;
use crate::typing::{MatchedTriple, Typing, Verdict};

/// ShEx validator for validating RDF graphs against ShEx shapes.
///
/// A validator borrows a schema and a graph and keeps the [`Typing`] computed by successive
/// calls to [`validate`](Self::validate), so later calls reuse earlier verdicts.
///
/// ```
/// use oxrdf::{Graph, NamedNode, Term, Triple};
/// use oxshex::{
///     SchemaBuilder, Shape, ShapeExpression, ShapeLabel, ShexValidator, TripleConstraint,
/// };
///
/// let person = ShapeLabel::iri_unchecked("http://example.org/Person");
/// let knows = NamedNode::new_unchecked("http://example.org/knows");
/// let mut builder = SchemaBuilder::new();
/// builder.add_shape(
///     person.clone(),
///     ShapeExpression::Shape(Shape::new(
///         TripleConstraint::with_shape(knows.clone(), person.clone()).into(),
///     )),
/// );
/// let schema = builder.build()?;
///
/// let alice = NamedNode::new_unchecked("http://example.org/alice");
/// let bob = NamedNode::new_unchecked("http://example.org/bob");
/// let mut graph = Graph::new();
/// graph.insert(&Triple::new(alice.clone(), knows.clone(), bob.clone()));
/// graph.insert(&Triple::new(bob.clone(), knows, alice.clone()));
///
/// let mut validator = ShexValidator::new(&schema, &graph);
/// assert!(validator.validate(&Term::from(alice), &person)?);
/// assert!(validator.typing().conforms(&Term::from(bob), &person));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub struct ShexValidator<'a, G: NeighborGraph + ?Sized = Graph> {
    schema: &'a ShexSchema,
    graph: &'a G,
    limits: ValidationLimits,
    typing: Typing,
    /// Normalized triple expressions, indexed by shape index.
    sorbe: Vec<Option<Rc<SorbeTripleExpr>>>,
    regexes: RegexCache,
    /// Errors raised since the current top-level call started.
    errors: Vec<ShexValidationError>,
    depth: usize,
}

impl<'a, G: NeighborGraph + ?Sized> ShexValidator<'a, G> {
    /// Creates a new validator with the default [`ValidationLimits`].
    pub fn new(schema: &'a ShexSchema, graph: &'a G) -> Self {
        Self {
            schema,
            graph,
            limits: ValidationLimits::default(),
            typing: Typing::new(),
            sorbe: vec![None; schema.shape_count()],
            regexes: RegexCache::default(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Sets the resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns a reference to the shapes schema.
    pub fn schema(&self) -> &'a ShexSchema {
        self.schema
    }

    /// Returns the resource limits.
    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// The verdicts computed so far.
    pub fn typing(&self) -> &Typing {
        &self.typing
    }

    /// Forgets every verdict.
    pub fn reset(&mut self) {
        self.typing.clear();
        self.errors.clear();
        self.depth = 0;
    }

    /// Validates `node` against the shape `label`.
    ///
    /// Returns `Ok(true)` if the node conforms and `Ok(false)` if it does not. If an error
    /// is raised while resolving any (node, label) pair, that pair is considered as not
    /// conforming, the validation goes on and the first error is returned at the end. The
    /// typing is updated either way.
    pub fn validate(
        &mut self,
        node: &Term,
        label: &ShapeLabel,
    ) -> Result<bool, ShexValidationError> {
        if !self.schema.contains(label) {
            return Err(ShexValidationError::unknown_shape(label.clone()));
        }
        self.errors.clear();
        self.depth = 0;
        let conforms = self.recursive_validation(node, label);
        self.typing.commit();

        let mut errors = self.errors.drain(..);
        if let Some(error) = errors.next() {
            for other in errors {
                warn!(%node, %label, error = %other, "Additional validation error");
            }
            return Err(error);
        }
        Ok(conforms)
    }

    /// Evaluates a formula over the facts of the current typing.
    ///
    /// The shape facts are the conforming (node, label) pairs and the triple facts are the
    /// triples matched to labeled triple constraints by conforming shapes.
    pub fn evaluate_formula(
        &self,
        formula: &mut Formula,
        candidates: &[Term],
    ) -> Result<bool, FormulaError> {
        let shape_facts: FxHashSet<_> = self
            .typing
            .shape_facts()
            .map(|(node, label)| (node.clone(), label.clone()))
            .collect();
        let triple_facts: FxHashSet<_> = self
            .typing
            .triple_facts()
            .map(|t| (t.subject.clone(), t.object.clone(), t.label.clone()))
            .collect();
        formula.evaluate(candidates, &shape_facts, &triple_facts)
    }

    /// Decides a (node, label) pair, reusing or updating the typing.
    fn recursive_validation(&mut self, node: &Term, label: &ShapeLabel) -> bool {
        if let Some(verdict) = self.typing.verdict(node, label) {
            return verdict != Verdict::DoesNotConform;
        }
        let schema = self.schema;
        let Some(expr) = schema.get_shape(label) else {
            self.errors
                .push(ShexValidationError::unknown_shape(label.clone()));
            return false;
        };

        let checkpoint = self.typing.hypothesize(node, label);
        trace!(%node, %label, depth = self.depth, "hypothesis");
        self.depth += 1;
        let mut matches = Vec::new();
        let result = self
            .limits
            .check_recursion_depth(self.depth)
            .and_then(|()| self.satisfies(node, expr, &mut matches));
        self.depth -= 1;

        let conforms = match result {
            Ok(conforms) => conforms,
            Err(error) => {
                debug!(%node, %label, %error, "validation error");
                self.errors.push(error);
                false
            }
        };
        if conforms {
            self.typing.confirm(node, label, matches);
        } else {
            self.typing.refute(node, label, checkpoint);
        }
        trace!(%node, %label, conforms, "hypothesis resolved");
        conforms
    }

    fn satisfies(
        &mut self,
        node: &Term,
        expr: &ShapeExpression,
        matches: &mut Vec<MatchedTriple>,
    ) -> Result<bool, ShexValidationError> {
        match expr {
            ShapeExpression::ShapeAnd(children) => {
                let mut conjunct_matches = Vec::new();
                for child in children {
                    if !self.satisfies(node, child, &mut conjunct_matches)? {
                        return Ok(false);
                    }
                }
                matches.append(&mut conjunct_matches);
                Ok(true)
            }
            ShapeExpression::ShapeOr(children) => {
                for child in children {
                    let mut branch_matches = Vec::new();
                    if self.satisfies(node, child, &mut branch_matches)? {
                        matches.append(&mut branch_matches);
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ShapeExpression::ShapeNot(child) => Ok(!self.satisfies(node, child, &mut Vec::new())?),
            ShapeExpression::NodeConstraint(constraint) => {
                satisfies_node_constraint(node, constraint, &mut self.regexes, &self.limits)
            }
            ShapeExpression::Shape(shape) => self.is_locally_valid(node, shape, matches),
            ShapeExpression::ShapeExternal => Err(ShexValidationError::unsupported_construct(
                "EXTERNAL shapes are not supported",
            )),
            ShapeExpression::ShapeRef(label) => Ok(self.recursive_validation(node, label)),
        }
    }

    /// Checks the neighbourhood of `node` against a shape.
    fn is_locally_valid(
        &mut self,
        node: &Term,
        shape: &Shape,
        matches: &mut Vec<MatchedTriple>,
    ) -> Result<bool, ShexValidationError> {
        let sorbe = self.sorbe(shape)?;
        let constraints = sorbe.constraints();
        if constraints.is_empty() {
            return Ok(!shape.closed || self.graph.out_neighbors(node).is_empty());
        }

        let mut edges = self
            .graph
            .in_neighbors_with_predicates(node, sorbe.inverse_predicates());
        if shape.closed {
            edges.extend(self.graph.out_neighbors(node));
        } else {
            edges.extend(
                self.graph
                    .out_neighbors_with_predicates(node, sorbe.forward_predicates()),
            );
        }

        // Runs the value validations the precise pass depends on
        let predicate_candidates =
            collect_matching_constraints(&edges, constraints, &PredicateOnlyMatcher);
        for (edge, candidates) in edges.iter().zip(&predicate_candidates) {
            if candidates.is_empty() {
                // Only a closed shape lists edges no constraint mentions
                if shape.is_extra(edge.predicate.as_ref()) {
                    continue;
                }
                return Ok(false);
            }
            for &i in candidates {
                if let Some(label) = constraints[i].value_label() {
                    if self.typing.verdict(&edge.other, label).is_none() {
                        self.recursive_validation(&edge.other, label);
                    }
                }
            }
        }

        let value_candidates = collect_matching_constraints(
            &edges,
            constraints,
            &PredicateAndValueMatcher::new(&self.typing),
        );
        let mut matched_edges = Vec::with_capacity(edges.len());
        let mut candidates = Vec::with_capacity(edges.len());
        for (edge, edge_candidates) in edges.into_iter().zip(value_candidates) {
            if !edge_candidates.is_empty() {
                matched_edges.push(edge);
                candidates.push(edge_candidates);
            } else if !shape.is_extra(edge.predicate.as_ref()) {
                return Ok(false);
            }
        }

        let bags = BagIterator::new(candidates, constraints.len());
        for (i, bag) in bags.enumerate() {
            self.limits.check_bag_count(i + 1, || node.to_string())?;
            if is_satisfied(sorbe.root(), &bag) {
                matches.extend(
                    matched_edges
                        .iter()
                        .zip(bag.assignment())
                        .filter_map(|(edge, &c)| {
                            Some(matched_triple(edge, constraints[c].label.as_ref()?))
                        }),
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the normalized triple expression of a shape, computing it on first use.
    fn sorbe(&mut self, shape: &Shape) -> Result<Rc<SorbeTripleExpr>, ShexValidationError> {
        let slot = self.sorbe.get_mut(shape.index()).ok_or_else(|| {
            ShexValidationError::internal(format!(
                "shape index {} is out of the schema bounds",
                shape.index()
            ))
        })?;
        if let Some(sorbe) = slot {
            return Ok(Rc::clone(sorbe));
        }
        let sorbe = Rc::new(
            SorbeTripleExpr::compile(&shape.expression, self.schema)
                .map_err(|e| ShexValidationError::internal(e.to_string()))?,
        );
        debug!(
            shape = shape.index(),
            constraints = sorbe.constraints().len(),
            "normalized triple expression"
        );
        *slot = Some(Rc::clone(&sorbe));
        Ok(sorbe)
    }
}

fn matched_triple(edge: &NeighborEdge, label: &ShapeLabel) -> MatchedTriple {
    MatchedTriple {
        subject: edge.subject().clone(),
        predicate: edge.predicate.clone(),
        object: edge.object().clone(),
        label: label.clone(),
    }
}
