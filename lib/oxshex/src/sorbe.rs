//! SORBE (single-occurrence regular bag expression) normalization.
//!
//! The interval algorithm requires every triple constraint of a shape to occur once in its
//! triple expression, so that one bag assignment maps each neighbour edge to a unique
//! position. Referenced triple expressions are inlined as fresh copies and group
//! repetitions other than `?`, `*` and `+` are unfolded.

use oxrdf::NamedNode;
use rustc_hash::FxHashSet;

use crate::error::ShexSchemaError;
use crate::model::{Cardinality, TripleConstraint, TripleExpression};
use crate::schema::ShexSchema;

/// A normalized triple expression with its constraints numbered.
///
/// The position of a constraint in [`constraints`](Self::constraints) identifies it in
/// bags and in the interval computation.
#[derive(Debug, Clone)]
pub struct SorbeTripleExpr {
    expression: TripleExpression,
    constraints: Vec<TripleConstraint>,
    root: SorbeNode,
    forward_predicates: FxHashSet<NamedNode>,
    inverse_predicates: FxHashSet<NamedNode>,
}

/// Triple expression tree over constraint indices, with repetitions made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SorbeNode {
    Constraint(usize),
    Repeat {
        node: Box<SorbeNode>,
        cardinality: Cardinality,
    },
    EachOf(Vec<SorbeNode>),
    OneOf(Vec<SorbeNode>),
    Empty,
}

impl SorbeTripleExpr {
    /// Rewrites a triple expression into its SORBE form.
    ///
    /// - triple expression references are replaced by copies of their definitions;
    /// - `e{n,m}` becomes `n` copies of `e` followed by `m - n` copies of `e?`;
    /// - `e{n,}` with `n >= 2` becomes `n - 1` copies of `e` followed by `e+`;
    /// - `e{0,0}` becomes [`TripleExpression::Empty`].
    ///
    /// Triple constraints keep their own cardinality. The transformation is idempotent.
    pub fn normalize(
        expr: &TripleExpression,
        schema: &ShexSchema,
    ) -> Result<TripleExpression, ShexSchemaError> {
        Ok(match expr {
            TripleExpression::TripleConstraint(tc) => {
                TripleExpression::TripleConstraint(tc.clone())
            }
            TripleExpression::EachOf {
                expressions,
                cardinality,
            } => unfold(
                TripleExpression::EachOf {
                    expressions: normalize_all(expressions, schema)?,
                    cardinality: Cardinality::default(),
                },
                *cardinality,
            ),
            TripleExpression::OneOf {
                expressions,
                cardinality,
            } => unfold(
                TripleExpression::OneOf {
                    expressions: normalize_all(expressions, schema)?,
                    cardinality: Cardinality::default(),
                },
                *cardinality,
            ),
            TripleExpression::Ref(label) => {
                let definition = schema
                    .get_triple_expr(label)
                    .ok_or_else(|| ShexSchemaError::undefined_triple_expr_ref(label.clone()))?;
                Self::normalize(definition, schema)?
            }
            TripleExpression::Empty => TripleExpression::Empty,
        })
    }

    /// Normalizes a triple expression and numbers its constraints.
    pub fn compile(expr: &TripleExpression, schema: &ShexSchema) -> Result<Self, ShexSchemaError> {
        let expression = Self::normalize(expr, schema)?;
        let mut constraints = Vec::new();
        let root = SorbeNode::build(&expression, &mut constraints);
        let mut forward_predicates = FxHashSet::default();
        let mut inverse_predicates = FxHashSet::default();
        for tc in &constraints {
            if tc.inverse {
                inverse_predicates.insert(tc.predicate.clone());
            } else {
                forward_predicates.insert(tc.predicate.clone());
            }
        }
        Ok(Self {
            expression,
            constraints,
            root,
            forward_predicates,
            inverse_predicates,
        })
    }

    /// The normalized expression.
    pub fn expression(&self) -> &TripleExpression {
        &self.expression
    }

    /// All constraint instances, in expression order.
    pub fn constraints(&self) -> &[TripleConstraint] {
        &self.constraints
    }

    /// Predicates of the forward constraints.
    pub fn forward_predicates(&self) -> &FxHashSet<NamedNode> {
        &self.forward_predicates
    }

    /// Predicates of the inverse constraints.
    pub fn inverse_predicates(&self) -> &FxHashSet<NamedNode> {
        &self.inverse_predicates
    }

    pub(crate) fn root(&self) -> &SorbeNode {
        &self.root
    }
}

fn normalize_all(
    expressions: &[TripleExpression],
    schema: &ShexSchema,
) -> Result<Vec<TripleExpression>, ShexSchemaError> {
    expressions
        .iter()
        .map(|e| SorbeTripleExpr::normalize(e, schema))
        .collect()
}

/// Applies a group cardinality to an already normalized group with cardinality `{1,1}`.
fn unfold(group: TripleExpression, cardinality: Cardinality) -> TripleExpression {
    if cardinality.is_default() || cardinality.is_standard_repetition() {
        return group.with_cardinality(cardinality);
    }
    if cardinality.is_zero() {
        return TripleExpression::Empty;
    }
    let mut copies = Vec::new();
    match cardinality.max {
        Some(max) => {
            for _ in 0..cardinality.min {
                copies.push(group.clone());
            }
            for _ in cardinality.min..max {
                copies.push(group.clone().with_cardinality(Cardinality::optional()));
            }
        }
        None => {
            for _ in 1..cardinality.min {
                copies.push(group.clone());
            }
            copies.push(group.with_cardinality(Cardinality::one_or_more()));
        }
    }
    TripleExpression::each_of(copies)
}

impl SorbeNode {
    fn build(expr: &TripleExpression, constraints: &mut Vec<TripleConstraint>) -> Self {
        let (node, cardinality) = match expr {
            TripleExpression::TripleConstraint(tc) => {
                constraints.push(tc.clone());
                (Self::Constraint(constraints.len() - 1), tc.cardinality)
            }
            TripleExpression::EachOf {
                expressions,
                cardinality,
            } => (
                Self::EachOf(
                    expressions
                        .iter()
                        .map(|e| Self::build(e, constraints))
                        .collect(),
                ),
                *cardinality,
            ),
            TripleExpression::OneOf {
                expressions,
                cardinality,
            } => (
                Self::OneOf(
                    expressions
                        .iter()
                        .map(|e| Self::build(e, constraints))
                        .collect(),
                ),
                *cardinality,
            ),
            // Normalized expressions do not contain references
            TripleExpression::Ref(_) | TripleExpression::Empty => {
                (Self::Empty, Cardinality::default())
            }
        };
        if cardinality.is_default() {
            node
        } else {
            Self::Repeat {
                node: Box::new(node),
                cardinality,
            }
        }
    }

    /// Returns true if the empty bag is in the language of this node.
    pub(crate) fn is_nullable(&self) -> bool {
        match self {
            Self::Constraint(_) => false,
            Self::Repeat { node, cardinality } => cardinality.min == 0 || node.is_nullable(),
            Self::EachOf(nodes) => nodes.iter().all(Self::is_nullable),
            Self::OneOf(nodes) => nodes.iter().any(Self::is_nullable),
            Self::Empty => true,
        }
    }
}
