//! First-order formulas over validation results, used by semantic actions.
//!
//! A [`Formula`] is a prefix of quantifiers followed by a [`Sentence`]. It is evaluated by a
//! backtracking search binding each quantified variable, in order, to one of a finite list
//! of candidate terms. Sentences are evaluated with a three-valued logic: a sentence that
//! still mentions an unbound variable may be [`Truth::Partial`].
//!
//! ```
//! use oxrdf::{Literal, Term};
//! use oxshex::{Formula, Operator, Quantifier, Sentence, Variable};
//! use rustc_hash::FxHashSet;
//!
//! let x = Variable::new("x");
//! let mut formula = Formula::new(
//!     vec![Quantifier::Forall(x.clone())],
//!     Sentence::compare(Operator::GreaterThan, x, Term::from(Literal::from(0))),
//! );
//! let candidates: Vec<Term> = [1, 2, 3].into_iter().map(|i| Literal::from(i).into()).collect();
//! assert!(formula.evaluate(&candidates, &FxHashSet::default(), &FxHashSet::default())?);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::Not;

use oxrdf::{NamedNode, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::error::FormulaError;
use crate::model::{ShapeLabel, TripleExprLabel};
use crate::value::{compare_terms, is_orderable};

/// A formula variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Creates a variable with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The variable name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// A quantifier binding one variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// The sentence must hold for every candidate value.
    Forall(Variable),
    /// The sentence must hold for at least one candidate value.
    Exists(Variable),
}

impl Quantifier {
    /// The quantified variable.
    pub fn variable(&self) -> &Variable {
        match self {
            Self::Forall(v) | Self::Exists(v) => v,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forall(v) => write!(f, "∀{v}"),
            Self::Exists(v) => write!(f, "∃{v}"),
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A variable, bound by a quantifier.
    Variable(Variable),
    /// A constant term.
    Constant(Term),
}

impl From<Variable> for Operand {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl From<Term> for Operand {
    fn from(term: Term) -> Self {
        Self::Constant(term)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => v.fmt(f),
            Self::Constant(t) => t.fmt(f),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterOrEqual,
}

impl Operator {
    /// Returns true for the operators that require both sides to have the same ordered datatype.
    pub fn is_type_restricted(self) -> bool {
        !matches!(self, Self::Equal | Self::NotEqual)
    }

    fn apply(self, left: &Term, right: &Term) -> bool {
        let ordering = compare_terms(left, right);
        match self {
            Self::Equal => left == right || ordering == Some(Ordering::Equal),
            Self::NotEqual => left != right && ordering != Some(Ordering::Equal),
            Self::LessThan => ordering == Some(Ordering::Less),
            Self::LessOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::GreaterThan => ordering == Some(Ordering::Greater),
            Self::GreaterOrEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        })
    }
}

/// The body of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sentence {
    /// Conjunction.
    And(Vec<Sentence>),
    /// Disjunction.
    Or(Vec<Sentence>),
    /// Negation.
    Not(Box<Sentence>),
    /// The value of `variable` conforms to the shape `label`.
    ShapeMembership {
        /// The tested variable.
        variable: Variable,
        /// The shape.
        label: ShapeLabel,
    },
    /// A triple from `subject` to `object` has been matched by the triple expression `label`.
    TripleMembership {
        /// Variable of the triple subject.
        subject: Variable,
        /// Variable of the triple object.
        object: Variable,
        /// The triple expression.
        label: TripleExprLabel,
    },
    /// A value comparison.
    Comparison {
        /// The operator.
        operator: Operator,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// A bare variable. Evaluating it is an error.
    Variable(Variable),
}

impl Sentence {
    /// Builds a comparison.
    pub fn compare(
        operator: Operator,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Self::Comparison {
            operator,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Builds a negation.
    pub fn negate(sentence: Self) -> Self {
        Self::Not(Box::new(sentence))
    }

    fn evaluate(
        &self,
        assignment: &FxHashMap<Variable, Term>,
        facts: &Facts<'_>,
    ) -> Result<Truth, FormulaError> {
        Ok(match self {
            Self::And(sentences) => {
                let mut result = Truth::True;
                for sentence in sentences {
                    result = result.and(sentence.evaluate(assignment, facts)?);
                    if result == Truth::False {
                        break;
                    }
                }
                result
            }
            Self::Or(sentences) => {
                let mut result = Truth::False;
                for sentence in sentences {
                    result = result.or(sentence.evaluate(assignment, facts)?);
                    if result == Truth::True {
                        break;
                    }
                }
                result
            }
            Self::Not(sentence) => !sentence.evaluate(assignment, facts)?,
            Self::ShapeMembership { variable, label } => match assignment.get(variable) {
                Some(value) => Truth::from(facts.shapes.contains(&(value.clone(), label.clone()))),
                None => Truth::Partial,
            },
            Self::TripleMembership {
                subject,
                object,
                label,
            } => match (assignment.get(subject), assignment.get(object)) {
                (Some(s), Some(o)) => Truth::from(facts.triples.contains(&(
                    s.clone(),
                    o.clone(),
                    label.clone(),
                ))),
                _ => Truth::Partial,
            },
            Self::Comparison {
                operator,
                left,
                right,
            } => match (resolve(left, assignment), resolve(right, assignment)) {
                (Some(l), Some(r)) => Truth::from(operator.apply(l, r)),
                _ => Truth::Partial,
            },
            Self::Variable(variable) => {
                return Err(FormulaError::UnboundVariable {
                    name: variable.name.clone(),
                });
            }
        })
    }

    /// Calls `f` on the variables of every type-restricted comparison.
    fn for_each_restricted_comparison(&self, f: &mut impl FnMut(Vec<&Variable>)) {
        match self {
            Self::And(sentences) | Self::Or(sentences) => {
                for sentence in sentences {
                    sentence.for_each_restricted_comparison(f);
                }
            }
            Self::Not(sentence) => sentence.for_each_restricted_comparison(f),
            Self::Comparison {
                operator,
                left,
                right,
            } if operator.is_type_restricted() => f([left, right]
                .into_iter()
                .filter_map(|operand| match operand {
                    Operand::Variable(v) => Some(v),
                    Operand::Constant(_) => None,
                })
                .collect()),
            Self::ShapeMembership { .. }
            | Self::TripleMembership { .. }
            | Self::Comparison { .. }
            | Self::Variable(_) => (),
        }
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(sentences) | Self::Or(sentences) => {
                let separator = if matches!(self, Self::And(_)) {
                    " ∧ "
                } else {
                    " ∨ "
                };
                f.write_str("(")?;
                for (i, sentence) in sentences.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    sentence.fmt(f)?;
                }
                f.write_str(")")
            }
            Self::Not(sentence) => write!(f, "¬{sentence}"),
            Self::ShapeMembership { variable, label } => write!(f, "{label}({variable})"),
            Self::TripleMembership {
                subject,
                object,
                label,
            } => write!(f, "{label}({subject}, {object})"),
            Self::Comparison {
                operator,
                left,
                right,
            } => write!(f, "{left} {operator} {right}"),
            Self::Variable(v) => v.fmt(f),
        }
    }
}

fn resolve<'a>(
    operand: &'a Operand,
    assignment: &'a FxHashMap<Variable, Term>,
) -> Option<&'a Term> {
    match operand {
        Operand::Variable(v) => assignment.get(v),
        Operand::Constant(t) => Some(t),
    }
}

/// Three-valued truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Truth {
    /// Holds.
    True,
    /// Does not hold.
    False,
    /// Cannot be decided yet because a variable is unbound.
    Partial,
}

impl Truth {
    /// Kleene conjunction.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Partial,
        }
    }

    /// Kleene disjunction.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Partial,
        }
    }
}

impl Not for Truth {
    type Output = Self;

    /// Kleene negation.
    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Partial => Self::Partial,
        }
    }
}

impl From<bool> for Truth {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

struct Facts<'a> {
    shapes: &'a FxHashSet<(Term, ShapeLabel)>,
    triples: &'a FxHashSet<(Term, Term, TripleExprLabel)>,
}

/// A quantified formula.
#[derive(Debug, Clone)]
pub struct Formula {
    quantifiers: Vec<Quantifier>,
    sentence: Sentence,
    /// For each variable used in a type-restricted comparison, the other variables of its class.
    same_type: FxHashMap<Variable, FxHashSet<Variable>>,
    last_assignment: FxHashMap<Variable, Term>,
}

impl Formula {
    /// Creates a formula and computes the classes of variables that must share a datatype.
    ///
    /// Two variables compared with `<`, `<=`, `>` or `>=` belong to the same class, and
    /// classes are closed under transitivity.
    pub fn new(quantifiers: Vec<Quantifier>, sentence: Sentence) -> Self {
        let mut classes: Vec<FxHashSet<Variable>> = Vec::new();
        sentence.for_each_restricted_comparison(&mut |variables| {
            let mut merged: FxHashSet<Variable> = variables.into_iter().cloned().collect();
            if merged.is_empty() {
                return;
            }
            classes.retain(|class| {
                if class.is_disjoint(&merged) {
                    true
                } else {
                    merged.extend(class.iter().cloned());
                    false
                }
            });
            classes.push(merged);
        });
        let mut same_type = FxHashMap::default();
        for class in classes {
            for variable in &class {
                let mut others = class.clone();
                others.remove(variable);
                same_type.insert(variable.clone(), others);
            }
        }
        Self {
            quantifiers,
            sentence,
            same_type,
            last_assignment: FxHashMap::default(),
        }
    }

    /// The quantifier prefix.
    pub fn quantifiers(&self) -> &[Quantifier] {
        &self.quantifiers
    }

    /// The sentence.
    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    /// Evaluates the formula with every quantified variable ranging over `candidates`.
    ///
    /// Returns true only if the evaluation concludes [`Truth::True`]. An evaluation that
    /// stays partial is logged and reported as false.
    pub fn evaluate(
        &mut self,
        candidates: &[Term],
        shape_facts: &FxHashSet<(Term, ShapeLabel)>,
        triple_facts: &FxHashSet<(Term, Term, TripleExprLabel)>,
    ) -> Result<bool, FormulaError> {
        let facts = Facts {
            shapes: shape_facts,
            triples: triple_facts,
        };
        let mut assignment = FxHashMap::default();
        let result = self.search(0, &mut assignment, candidates, &facts)?;
        if result == Truth::Partial {
            warn!(formula = %self, "Incomplete evaluation");
        }
        Ok(result == Truth::True)
    }

    /// The last assignment tried by [`evaluate`](Self::evaluate).
    ///
    /// When the evaluation fails, this is the assignment on which it failed.
    pub fn last_assignment(&self) -> &FxHashMap<Variable, Term> {
        &self.last_assignment
    }

    fn search(
        &mut self,
        depth: usize,
        assignment: &mut FxHashMap<Variable, Term>,
        candidates: &[Term],
        facts: &Facts<'_>,
    ) -> Result<Truth, FormulaError> {
        self.last_assignment.clone_from(assignment);
        let current = self.sentence.evaluate(assignment, facts)?;
        if current != Truth::Partial {
            return Ok(current);
        }
        let Some(quantifier) = self.quantifiers.get(depth).cloned() else {
            warn!(
                formula = %self,
                "Partial evaluation while every variable is supposed to be bound"
            );
            return Ok(Truth::Partial);
        };
        let variable = quantifier.variable();
        for candidate in candidates {
            if !self.is_admissible(variable, candidate, assignment) {
                continue;
            }
            assignment.insert(variable.clone(), candidate.clone());
            let result = self.search(depth + 1, assignment, candidates, facts)?;
            let decided = match quantifier {
                Quantifier::Forall(_) => result != Truth::True,
                Quantifier::Exists(_) => result == Truth::True,
            };
            if decided {
                assignment.remove(variable);
                return Ok(result);
            }
        }
        assignment.remove(variable);
        Ok(match quantifier {
            Quantifier::Forall(_) => Truth::True,
            Quantifier::Exists(_) => Truth::False,
        })
    }

    /// Applies the same-type rule to a candidate binding.
    fn is_admissible(
        &self,
        variable: &Variable,
        candidate: &Term,
        assignment: &FxHashMap<Variable, Term>,
    ) -> bool {
        let Some(class) = self.same_type.get(variable) else {
            return true;
        };
        let selected: Option<NamedNode> =
            class
                .iter()
                .find_map(|other| match assignment.get(other) {
                    Some(Term::Literal(l)) => Some(l.datatype().into_owned()),
                    _ => None,
                });
        match selected {
            None => is_orderable(candidate),
            Some(datatype) => {
                matches!(candidate, Term::Literal(l) if l.datatype() == datatype.as_ref())
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quantifier in &self.quantifiers {
            write!(f, "{quantifier} ")?;
        }
        self.sentence.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::xsd;
    use oxrdf::{Literal, NamedNode};

    fn int(i: i64) -> Term {
        Literal::from(i).into()
    }

    fn ints(values: &[i64]) -> Vec<Term> {
        values.iter().map(|i| int(*i)).collect()
    }

    fn no_facts() -> (
        FxHashSet<(Term, ShapeLabel)>,
        FxHashSet<(Term, Term, TripleExprLabel)>,
    ) {
        (FxHashSet::default(), FxHashSet::default())
    }

    fn positive(quantifier: fn(Variable) -> Quantifier) -> Formula {
        let x = Variable::new("x");
        Formula::new(
            vec![quantifier(x.clone())],
            Sentence::compare(Operator::GreaterThan, x, int(0)),
        )
    }

    #[test]
    fn test_forall_holds() {
        let (shapes, triples) = no_facts();
        let mut formula = positive(Quantifier::Forall);
        assert!(formula.evaluate(&ints(&[1, 2, 3]), &shapes, &triples).unwrap());
        assert_eq!(formula.last_assignment().get(&Variable::new("x")), Some(&int(3)));
    }

    #[test]
    fn test_exists_holds() {
        let (shapes, triples) = no_facts();
        let mut formula = positive(Quantifier::Exists);
        assert!(formula.evaluate(&ints(&[-1, 0, 1]), &shapes, &triples).unwrap());
        assert_eq!(formula.last_assignment().get(&Variable::new("x")), Some(&int(1)));
    }

    #[test]
    fn test_forall_counterexample() {
        let (shapes, triples) = no_facts();
        let mut formula = positive(Quantifier::Forall);
        assert!(!formula.evaluate(&ints(&[-1, 0, 1]), &shapes, &triples).unwrap());
        assert_eq!(
            formula.last_assignment().get(&Variable::new("x")),
            Some(&int(-1))
        );
    }

    #[test]
    fn test_exists_over_no_candidates() {
        let (shapes, triples) = no_facts();
        let mut formula = positive(Quantifier::Exists);
        assert!(!formula.evaluate(&[], &shapes, &triples).unwrap());
        let mut formula = positive(Quantifier::Forall);
        assert!(formula.evaluate(&[], &shapes, &triples).unwrap());
    }

    #[test]
    fn test_bare_variable_is_an_error() {
        let (shapes, triples) = no_facts();
        let x = Variable::new("x");
        let mut formula = Formula::new(vec![Quantifier::Forall(x.clone())], Sentence::Variable(x));
        let error = formula.evaluate(&ints(&[1]), &shapes, &triples).unwrap_err();
        assert!(matches!(error, FormulaError::UnboundVariable { name } if name == "x"));
    }

    #[test]
    fn test_unquantified_variable_is_partial() {
        let (shapes, triples) = no_facts();
        let mut formula = Formula::new(
            Vec::new(),
            Sentence::compare(Operator::Equal, Variable::new("y"), int(1)),
        );
        assert!(!formula.evaluate(&ints(&[1]), &shapes, &triples).unwrap());
        assert!(formula.last_assignment().is_empty());
    }

    #[test]
    fn test_same_type_rule() {
        let (shapes, triples) = no_facts();
        let x = Variable::new("x");
        let y = Variable::new("y");
        let decimal: Term = Literal::new_typed_literal("2.5", xsd::DECIMAL).into();
        let iri: Term = NamedNode::new_unchecked("http://example.org/a").into();
        let candidates = vec![iri, int(1), decimal];

        // 1 < 2.5 holds, but the two values do not have the same datatype
        let mut formula = Formula::new(
            vec![Quantifier::Exists(x.clone()), Quantifier::Exists(y.clone())],
            Sentence::compare(Operator::LessThan, x.clone(), y.clone()),
        );
        assert!(!formula.evaluate(&candidates, &shapes, &triples).unwrap());

        // Equality is not type restricted
        let mut formula = Formula::new(
            vec![Quantifier::Exists(x.clone()), Quantifier::Exists(y.clone())],
            Sentence::And(vec![
                Sentence::compare(Operator::NotEqual, x.clone(), y.clone()),
                Sentence::compare(Operator::NotEqual, x, int(1)),
            ]),
        );
        assert!(formula.evaluate(&candidates, &shapes, &triples).unwrap());
    }

    #[test]
    fn test_same_type_classes_are_transitive() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let z = Variable::new("z");
        let formula = Formula::new(
            Vec::new(),
            Sentence::And(vec![
                Sentence::compare(Operator::LessThan, x.clone(), y.clone()),
                Sentence::compare(Operator::LessOrEqual, z.clone(), y.clone()),
                Sentence::compare(Operator::Equal, x.clone(), Variable::new("w")),
            ]),
        );
        assert!(formula.same_type[&x].contains(&z));
        assert!(formula.same_type[&z].contains(&x));
        assert!(!formula.same_type[&x].contains(&x));
        assert!(!formula.same_type.contains_key(&Variable::new("w")));
    }

    #[test]
    fn test_memberships() {
        let shape = ShapeLabel::iri_unchecked("http://example.org/S");
        let tc = ShapeLabel::iri_unchecked("http://example.org/tc");
        let a: Term = NamedNode::new_unchecked("http://example.org/a").into();
        let b: Term = NamedNode::new_unchecked("http://example.org/b").into();
        let shapes: FxHashSet<_> = [(a.clone(), shape.clone())].into_iter().collect();
        let triples: FxHashSet<_> = [(a.clone(), b.clone(), tc.clone())].into_iter().collect();
        let x = Variable::new("x");
        let y = Variable::new("y");

        let mut formula = Formula::new(
            vec![Quantifier::Exists(x.clone()), Quantifier::Exists(y.clone())],
            Sentence::And(vec![
                Sentence::ShapeMembership {
                    variable: x.clone(),
                    label: shape.clone(),
                },
                Sentence::TripleMembership {
                    subject: x.clone(),
                    object: y,
                    label: tc,
                },
            ]),
        );
        assert!(formula.evaluate(&[b.clone(), a.clone()], &shapes, &triples).unwrap());

        let mut formula = Formula::new(
            vec![Quantifier::Forall(x.clone())],
            Sentence::ShapeMembership { variable: x, label: shape },
        );
        assert!(!formula.evaluate(&[a, b.clone()], &shapes, &triples).unwrap());
        assert_eq!(formula.last_assignment().get(&Variable::new("x")), Some(&b));
    }

    #[test]
    fn test_kleene_logic() {
        assert_eq!(Truth::False.and(Truth::Partial), Truth::False);
        assert_eq!(Truth::True.and(Truth::Partial), Truth::Partial);
        assert_eq!(Truth::True.or(Truth::Partial), Truth::True);
        assert_eq!(Truth::False.or(Truth::Partial), Truth::Partial);
        assert_eq!(!Truth::Partial, Truth::Partial);
        assert_eq!(!Truth::True, Truth::False);
        assert_eq!(Sentence::negate(Sentence::And(Vec::new())).to_string(), "¬()");
    }
}
