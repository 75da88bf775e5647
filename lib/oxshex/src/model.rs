//! ShEx shape model types.
//!
//! This module defines the abstract syntax consumed by the validator:
//! - [`ShapeLabel`] - Identifier for shapes and triple expressions (IRI or blank node)
//! - [`ShapeExpression`] - Main shape expression type (union of all shape types)
//! - [`TripleExpression`] - Regular bag expression over triple constraints
//! - [`TripleConstraint`] - Constraint on triples with predicate and cardinality
//! - [`NodeConstraint`] - Constraints on node values (datatype, pattern, value set, etc.)
//! - [`Cardinality`] - Min/max occurrences for triple constraints and groups
//!
//! Shape definitions are owned by a [`ShexSchema`](crate::ShexSchema) and refer to each
//! other by label only, so recursive schemas never create reference cycles.

use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Term};

use crate::error::ShexSchemaError;

/// Unique identifier for a shape (shape label in ShEx terminology).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeLabel {
    /// Named shape (IRI).
    Iri(NamedNode),
    /// Anonymous shape (blank node).
    BNode(BlankNode),
}

/// Labels of triple expressions share the representation of shape labels.
pub type TripleExprLabel = ShapeLabel;

impl ShapeLabel {
    /// Creates a shape label from a named or blank node.
    pub fn from_named_or_blank(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(n) => Self::Iri(n),
            NamedOrBlankNode::BlankNode(b) => Self::BNode(b),
        }
    }

    /// Creates a shape label from an IRI without checking it.
    pub fn iri_unchecked(iri: impl Into<String>) -> Self {
        Self::Iri(NamedNode::new_unchecked(iri))
    }

    /// Converts to a Term.
    pub fn to_term(&self) -> Term {
        match self {
            Self::Iri(n) => Term::NamedNode(n.clone()),
            Self::BNode(b) => Term::BlankNode(b.clone()),
        }
    }

    /// Returns the shape label as a named node if it is one.
    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            Self::Iri(n) => Some(n),
            Self::BNode(_) => None,
        }
    }
}

impl From<NamedNode> for ShapeLabel {
    fn from(n: NamedNode) -> Self {
        Self::Iri(n)
    }
}

impl From<BlankNode> for ShapeLabel {
    fn from(b: BlankNode) -> Self {
        Self::BNode(b)
    }
}

impl std::fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iri(n) => write!(f, "<{}>", n.as_str()),
            Self::BNode(b) => write!(f, "_:{}", b.as_str()),
        }
    }
}

/// Main shape expression type.
///
/// ShEx shapes can be combined and composed using various operators.
/// This enum represents all possible shape expression types.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeExpression {
    /// Conjunction of shape expressions (AND).
    ShapeAnd(Vec<ShapeExpression>),

    /// Disjunction of shape expressions (OR).
    ShapeOr(Vec<ShapeExpression>),

    /// Negation of a shape expression (NOT).
    ShapeNot(Box<ShapeExpression>),

    /// Node constraint - validates properties of the focus node itself.
    NodeConstraint(NodeConstraint),

    /// Shape with a triple expression - validates the neighbourhood of the focus node.
    Shape(Shape),

    /// Shape whose definition lives outside of the schema.
    ShapeExternal,

    /// Reference to another shape by label.
    ShapeRef(ShapeLabel),
}

impl ShapeExpression {
    /// Returns true if this is a shape reference.
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::ShapeRef(_))
    }

    /// Returns the shape label if this is a reference.
    pub fn as_shape_ref(&self) -> Option<&ShapeLabel> {
        match self {
            Self::ShapeRef(label) => Some(label),
            _ => None,
        }
    }

    /// Collects all shape references in this expression (recursive).
    ///
    /// Triple expression references are not followed.
    pub fn collect_refs(&self) -> Vec<&ShapeLabel> {
        let mut refs = Vec::new();
        self.collect_refs_impl(&mut refs);
        refs
    }

    fn collect_refs_impl<'a>(&'a self, refs: &mut Vec<&'a ShapeLabel>) {
        match self {
            Self::ShapeAnd(shapes) | Self::ShapeOr(shapes) => {
                for shape in shapes {
                    shape.collect_refs_impl(refs);
                }
            }
            Self::ShapeNot(shape) => shape.collect_refs_impl(refs),
            Self::ShapeRef(label) => refs.push(label),
            Self::Shape(shape) => shape.expression.for_each_constraint(&mut |tc| {
                if let Some(value_expr) = &tc.value_expr {
                    value_expr.collect_refs_impl(refs);
                }
            }),
            Self::NodeConstraint(_) | Self::ShapeExternal => {}
        }
    }
}

/// Shape with a triple expression.
///
/// Validates the triples around the focus node against a regular bag expression
/// of triple constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Whether this is a closed shape (no unconstrained outgoing predicates allowed).
    pub closed: bool,

    /// Predicates whose triples may be left unmatched.
    pub extra: Vec<NamedNode>,

    /// Triple expression that the neighbourhood must satisfy.
    pub expression: TripleExpression,

    /// Position of the shape in its schema, assigned when the schema is built.
    index: usize,
}

impl Shape {
    /// Creates a new open shape with the given triple expression.
    pub fn new(expression: TripleExpression) -> Self {
        Self {
            closed: false,
            extra: Vec::new(),
            expression,
            index: 0,
        }
    }

    /// Creates a new open shape without any triple constraint.
    pub fn empty() -> Self {
        Self::new(TripleExpression::Empty)
    }

    /// Marks this shape as closed.
    #[must_use]
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Adds an EXTRA predicate.
    #[must_use]
    pub fn with_extra(mut self, predicate: NamedNode) -> Self {
        self.extra.push(predicate);
        self
    }

    /// Returns true if triples with this predicate may be left unmatched.
    pub fn is_extra(&self, predicate: NamedNodeRef<'_>) -> bool {
        self.extra.iter().any(|p| p.as_ref() == predicate)
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::empty()
    }
}

/// Triple expression: a regular bag expression over triple constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum TripleExpression {
    /// A single triple constraint.
    TripleConstraint(TripleConstraint),

    /// All sub-expressions must be matched (unordered concatenation).
    EachOf {
        /// Sub-expressions.
        expressions: Vec<TripleExpression>,
        /// Number of repetitions of the group.
        cardinality: Cardinality,
    },

    /// Exactly one sub-expression must be matched per repetition.
    OneOf {
        /// Sub-expressions.
        expressions: Vec<TripleExpression>,
        /// Number of repetitions of the group.
        cardinality: Cardinality,
    },

    /// Reference to a labeled triple expression of the schema.
    Ref(TripleExprLabel),

    /// Matches only the empty neighbourhood.
    Empty,
}

impl TripleExpression {
    /// Creates an EachOf group repeated exactly once.
    pub fn each_of(expressions: impl IntoIterator<Item = TripleExpression>) -> Self {
        Self::EachOf {
            expressions: expressions.into_iter().collect(),
            cardinality: Cardinality::default(),
        }
    }

    /// Creates a OneOf group repeated exactly once.
    pub fn one_of(expressions: impl IntoIterator<Item = TripleExpression>) -> Self {
        Self::OneOf {
            expressions: expressions.into_iter().collect(),
            cardinality: Cardinality::default(),
        }
    }

    /// Sets the cardinality of a group. Constraints get it set on their own cardinality.
    #[must_use]
    pub fn with_cardinality(self, cardinality: Cardinality) -> Self {
        match self {
            Self::TripleConstraint(tc) => Self::TripleConstraint(tc.with_cardinality(cardinality)),
            Self::EachOf { expressions, .. } => Self::EachOf {
                expressions,
                cardinality,
            },
            Self::OneOf { expressions, .. } => Self::OneOf {
                expressions,
                cardinality,
            },
            other @ (Self::Ref(_) | Self::Empty) => other,
        }
    }

    /// Calls `f` on every triple constraint syntactically present in this expression.
    ///
    /// References are not followed.
    pub fn for_each_constraint<'a>(&'a self, f: &mut impl FnMut(&'a TripleConstraint)) {
        match self {
            Self::TripleConstraint(tc) => f(tc),
            Self::EachOf { expressions, .. } | Self::OneOf { expressions, .. } => {
                for e in expressions {
                    e.for_each_constraint(f);
                }
            }
            Self::Ref(_) | Self::Empty => {}
        }
    }

    pub(crate) fn for_each_constraint_mut(&mut self, f: &mut impl FnMut(&mut TripleConstraint)) {
        match self {
            Self::TripleConstraint(tc) => f(tc),
            Self::EachOf { expressions, .. } | Self::OneOf { expressions, .. } => {
                for e in expressions {
                    e.for_each_constraint_mut(f);
                }
            }
            Self::Ref(_) | Self::Empty => {}
        }
    }
}

impl From<TripleConstraint> for TripleExpression {
    fn from(tc: TripleConstraint) -> Self {
        Self::TripleConstraint(tc)
    }
}

/// Constraint on a triple pattern.
///
/// Specifies a predicate and optional value expression that values must match,
/// along with cardinality constraints (min/max occurrences).
#[derive(Debug, Clone, PartialEq)]
pub struct TripleConstraint {
    /// Predicate IRI for this constraint.
    pub predicate: NamedNode,

    /// Optional shape expression that values must satisfy.
    ///
    /// Once the schema is built, this is always `None` or a [`ShapeExpression::ShapeRef`].
    pub value_expr: Option<Box<ShapeExpression>>,

    /// Cardinality constraint (min/max occurrences).
    pub cardinality: Cardinality,

    /// Whether this constraint is inverse (focus node is object).
    pub inverse: bool,

    /// Optional label, used to report which triples matched this constraint.
    pub label: Option<TripleExprLabel>,
}

impl TripleConstraint {
    /// Creates a new triple constraint with the given predicate.
    pub fn new(predicate: NamedNode) -> Self {
        Self {
            predicate,
            value_expr: None,
            cardinality: Cardinality::default(),
            inverse: false,
            label: None,
        }
    }

    /// Creates a new triple constraint with predicate and value expression.
    pub fn with_value_expr(predicate: NamedNode, value_expr: ShapeExpression) -> Self {
        Self {
            predicate,
            value_expr: Some(Box::new(value_expr)),
            cardinality: Cardinality::default(),
            inverse: false,
            label: None,
        }
    }

    /// Creates a new triple constraint whose values must conform to the given shape.
    pub fn with_shape(predicate: NamedNode, shape: ShapeLabel) -> Self {
        Self::with_value_expr(predicate, ShapeExpression::ShapeRef(shape))
    }

    /// Sets the cardinality for this constraint.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Sets whether this constraint is inverse.
    #[must_use]
    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    /// Sets the label of this constraint.
    #[must_use]
    pub fn with_label(mut self, label: TripleExprLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Returns the label of the shape values must conform to, if any.
    pub fn value_label(&self) -> Option<&ShapeLabel> {
        self.value_expr.as_deref().and_then(ShapeExpression::as_shape_ref)
    }
}

/// Cardinality constraint (min/max occurrences).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    /// Minimum number of occurrences (default: 1).
    pub min: u32,

    /// Maximum number of occurrences (None = unbounded, default: 1).
    pub max: Option<u32>,
}

impl Cardinality {
    /// Creates a cardinality constraint with min and max.
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, ShexSchemaError> {
        if let Some(max_val) = max {
            if max_val < min {
                return Err(ShexSchemaError::invalid_cardinality(min, max));
            }
        }
        Ok(Self { min, max })
    }

    /// Creates a cardinality constraint for exactly n occurrences.
    pub fn exactly(n: u32) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Creates a cardinality constraint for 0 or 1 occurrence.
    pub fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// Creates a cardinality constraint for 0 or more occurrences (*).
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Creates a cardinality constraint for 1 or more occurrences (+).
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Returns true if this cardinality allows the given count.
    pub fn allows(&self, count: u32) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    /// Returns true if this is the default cardinality (exactly 1).
    pub fn is_default(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    /// Returns true if nothing can be matched (`{0,0}`).
    pub fn is_zero(&self) -> bool {
        self.max == Some(0)
    }

    /// Returns true for `?`, `*` and `+`.
    pub fn is_standard_repetition(&self) -> bool {
        matches!((self.min, self.max), (0, Some(1)) | (0 | 1, None))
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::exactly(1)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min, self.max) {
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (0, Some(1)) => write!(f, "?"),
            (min, None) => write!(f, "{{{min},}}"),
            (min, Some(max)) if min == max => write!(f, "{{{min}}}"),
            (min, Some(max)) => write!(f, "{{{min},{max}}}"),
        }
    }
}

/// Node constraint - validates properties of nodes.
///
/// Can constrain node kind, datatype, string facets (length, pattern),
/// numeric facets (min/max), and value sets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeConstraint {
    /// Required node kind (IRI, BlankNode, Literal, etc.).
    pub node_kind: Option<NodeKind>,

    /// Required datatype for literals.
    pub datatype: Option<NamedNode>,

    /// String facets (length, pattern).
    pub string_facets: Vec<StringFacet>,

    /// Numeric facets (min/max values).
    pub numeric_facets: Vec<NumericFacet>,

    /// Value set constraint.
    pub values: Vec<ValueSetValue>,
}

impl NodeConstraint {
    /// Creates a new empty node constraint, satisfied by every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node constraint with the given node kind.
    pub fn with_node_kind(node_kind: NodeKind) -> Self {
        Self {
            node_kind: Some(node_kind),
            ..Self::default()
        }
    }

    /// Creates a node constraint with the given datatype.
    pub fn with_datatype(datatype: NamedNode) -> Self {
        Self {
            datatype: Some(datatype),
            ..Self::default()
        }
    }

    /// Creates a node constraint accepting exactly the given values.
    pub fn with_values(values: impl IntoIterator<Item = ValueSetValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Adds a value to the value set.
    pub fn add_value(&mut self, value: ValueSetValue) {
        self.values.push(value);
    }

    /// Adds a string facet.
    #[must_use]
    pub fn with_string_facet(mut self, facet: StringFacet) -> Self {
        self.string_facets.push(facet);
        self
    }

    /// Adds a numeric facet.
    #[must_use]
    pub fn with_numeric_facet(mut self, facet: NumericFacet) -> Self {
        self.numeric_facets.push(facet);
        self
    }

    /// Returns true if this constraint is empty.
    pub fn is_empty(&self) -> bool {
        self.node_kind.is_none()
            && self.datatype.is_none()
            && self.string_facets.is_empty()
            && self.numeric_facets.is_empty()
            && self.values.is_empty()
    }
}

/// Node kind constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// IRI node.
    Iri,
    /// Blank node.
    BNode,
    /// Literal value.
    Literal,
    /// Non-literal (IRI or blank node).
    NonLiteral,
}

impl NodeKind {
    /// Returns true if the given term matches this node kind.
    pub fn matches(&self, term: &Term) -> bool {
        match self {
            Self::Iri => matches!(term, Term::NamedNode(_)),
            Self::BNode => matches!(term, Term::BlankNode(_)),
            Self::Literal => matches!(term, Term::Literal(_)),
            Self::NonLiteral => matches!(term, Term::NamedNode(_) | Term::BlankNode(_)),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iri => write!(f, "IRI"),
            Self::BNode => write!(f, "BNODE"),
            Self::Literal => write!(f, "LITERAL"),
            Self::NonLiteral => write!(f, "NONLITERAL"),
        }
    }
}

/// String facet constraint (length, pattern).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFacet {
    /// Exact string length.
    Length(usize),
    /// Minimum string length.
    MinLength(usize),
    /// Maximum string length.
    MaxLength(usize),
    /// Regular expression pattern.
    Pattern {
        /// Regex pattern.
        pattern: String,
        /// Optional regex flags.
        flags: Option<String>,
    },
}

/// Numeric facet constraint (min/max values).
#[derive(Debug, Clone, PartialEq)]
pub enum NumericFacet {
    /// Minimum inclusive value.
    MinInclusive(Literal),
    /// Minimum exclusive value.
    MinExclusive(Literal),
    /// Maximum inclusive value.
    MaxInclusive(Literal),
    /// Maximum exclusive value.
    MaxExclusive(Literal),
    /// Total number of digits.
    TotalDigits(u32),
    /// Number of fractional digits.
    FractionDigits(u32),
}

/// Value in a value set constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSetValue {
    /// Exact RDF term.
    ObjectValue(Term),

    /// IRI stem (prefix match).
    IriStem(String),

    /// IRI stem exclusion.
    IriStemRange {
        /// Base stem to match.
        stem: String,
        /// Values to exclude.
        exclusions: Vec<ValueSetValue>,
    },

    /// Literal stem (lexical form prefix match).
    LiteralStem(String),

    /// Literal stem exclusion.
    LiteralStemRange {
        /// Base stem to match.
        stem: String,
        /// Values to exclude.
        exclusions: Vec<ValueSetValue>,
    },

    /// Language stem (language tag prefix match).
    LanguageStem(String),

    /// Language stem exclusion.
    LanguageStemRange {
        /// Base stem to match.
        stem: String,
        /// Values to exclude.
        exclusions: Vec<ValueSetValue>,
    },
}

impl ValueSetValue {
    /// Creates an IRI stem value.
    pub fn iri_stem(stem: impl Into<String>) -> Self {
        Self::IriStem(stem.into())
    }

    /// Creates a literal stem value.
    pub fn literal_stem(stem: impl Into<String>) -> Self {
        Self::LiteralStem(stem.into())
    }

    /// Creates a language stem value.
    pub fn language_stem(stem: impl Into<String>) -> Self {
        Self::LanguageStem(stem.into())
    }
}
