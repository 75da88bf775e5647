//! Error types for ShEx schema analysis, validation and formula evaluation.

use crate::model::ShapeLabel;

/// Main error type for ShEx operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShexError {
    /// Error while building or analysing a shapes schema.
    #[error(transparent)]
    Schema(#[from] ShexSchemaError),

    /// Error during validation.
    #[error(transparent)]
    Validation(#[from] ShexValidationError),

    /// Error while evaluating a formula.
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Error raised while building a [`ShexSchema`](crate::ShexSchema).
///
/// All of these are detected before any validation runs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShexSchemaError {
    /// A shape expression references a label that is not defined.
    #[error("Undefined shape reference {label} in the definition of {referrer}")]
    UndefinedShapeRef {
        referrer: ShapeLabel,
        label: ShapeLabel,
    },

    /// A triple expression references a label that is not defined.
    #[error("Undefined triple expression reference {label}")]
    UndefinedTripleExprRef { label: ShapeLabel },

    /// Triple expression references form a cycle.
    #[error("Cyclic triple expression reference: {from} -> {to}")]
    CyclicTripleExprRef { from: ShapeLabel, to: ShapeLabel },

    /// The same label is defined twice.
    #[error("Label {label} is defined more than once")]
    DuplicateLabel { label: ShapeLabel },

    /// The start shape is not defined.
    #[error("Undefined start shape {label}")]
    UndefinedStart { label: ShapeLabel },

    /// Invalid cardinality.
    #[error("Invalid cardinality: min={min}, max={max:?}")]
    InvalidCardinality { min: u32, max: Option<u32> },

    /// A negation or a zero-cardinality dependency occurs inside a recursive cycle.
    #[error(
        "Schema is not stratified: {from} depends on {to} through a {kind} reference inside the cycle {}",
        display_labels(.component)
    )]
    NotStratified {
        from: ShapeLabel,
        to: ShapeLabel,
        kind: &'static str,
        component: Vec<ShapeLabel>,
    },
}

/// Error type for validation operations.
///
/// Raised inside the resolution of one (node, label) pair, which is then considered
/// as non-conforming.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShexValidationError {
    /// The requested shape is not defined in the schema.
    #[error("Shape not found: {label}")]
    UnknownShape { label: ShapeLabel },

    /// A construct the validator does not know how to evaluate.
    #[error("Unsupported construct: {message}")]
    UnsupportedConstruct { message: String },

    /// Invalid regular expression in a pattern facet.
    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// Regular expression longer than the configured limit.
    #[error("Regex pattern of length {length} exceeds the maximum of {max}")]
    RegexTooLong { length: usize, max: usize },

    /// Value set larger than the configured limit.
    #[error("Value set of {length} values exceeds the maximum of {max}")]
    ValueSetTooLong { length: usize, max: usize },

    /// Maximum recursion depth exceeded.
    #[error("Maximum recursion depth ({depth}) exceeded during validation")]
    RecursionLimit { depth: usize },

    /// Too many bags enumerated for a single shape.
    #[error("More than {limit} candidate bags enumerated for node {node}")]
    BagLimit { node: String, limit: usize },

    /// Internal error.
    #[error("Internal validation error: {message}")]
    Internal { message: String },
}

/// Error raised while evaluating a [`Formula`](crate::Formula).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FormulaError {
    /// A variable has been evaluated as a sentence on its own.
    #[error("Trying to evaluate variable: {name}")]
    UnboundVariable { name: String },
}

impl ShexSchemaError {
    /// Creates an undefined shape reference error.
    pub fn undefined_shape_ref(referrer: ShapeLabel, label: ShapeLabel) -> Self {
        Self::UndefinedShapeRef { referrer, label }
    }

    /// Creates an undefined triple expression reference error.
    pub fn undefined_triple_expr_ref(label: ShapeLabel) -> Self {
        Self::UndefinedTripleExprRef { label }
    }

    /// Creates a cyclic triple expression reference error.
    pub fn cyclic_triple_expr_ref(from: ShapeLabel, to: ShapeLabel) -> Self {
        Self::CyclicTripleExprRef { from, to }
    }

    /// Creates a duplicate label error.
    pub fn duplicate_label(label: ShapeLabel) -> Self {
        Self::DuplicateLabel { label }
    }

    /// Creates an invalid cardinality error.
    pub fn invalid_cardinality(min: u32, max: Option<u32>) -> Self {
        Self::InvalidCardinality { min, max }
    }

    /// Returns true if this is a stratification failure.
    pub fn is_not_stratified(&self) -> bool {
        matches!(self, Self::NotStratified { .. })
    }
}

impl ShexValidationError {
    /// Creates an unknown shape error.
    pub fn unknown_shape(label: ShapeLabel) -> Self {
        Self::UnknownShape { label }
    }

    /// Creates an unsupported construct error.
    pub fn unsupported_construct(message: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            message: message.into(),
        }
    }

    /// Creates an invalid regex error.
    pub fn invalid_regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a max recursion depth error.
    pub fn recursion_limit(depth: usize) -> Self {
        Self::RecursionLimit { depth }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

fn display_labels(labels: &[ShapeLabel]) -> String {
    let mut out = String::from("{");
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&label.to_string());
    }
    out.push('}');
    out
}
