//! Recursive [ShEx](https://shex.io/) validation of RDF graphs.
//!
//! This crate decides whether RDF nodes conform to the shapes of a ShEx schema, with the
//! complete recursive semantics: shapes may refer to each other, including cyclically,
//! and negation is supported as long as the schema is stratified.
//!
//! # Core Concepts
//!
//! - **Schema**: shape definitions checked and stratified at build time ([`ShexSchema`],
//!   built with [`SchemaBuilder`])
//! - **Shape Expression**: constraints on RDF nodes ([`ShapeExpression`])
//! - **Validation**: checking if nodes conform to shapes ([`ShexValidator`])
//! - **Typing**: the memoized verdicts of a validation run ([`Typing`])
//! - **Formula**: first-order conditions over the results of a run ([`Formula`])
//!
//! # Quick Start
//!
//! ```
//! use oxrdf::{Graph, Literal, NamedNode, Term, Triple};
//! use oxrdf::vocab::xsd;
//! use oxshex::{
//!     Cardinality, NodeConstraint, SchemaBuilder, Shape, ShapeExpression, ShapeLabel,
//!     ShexValidator, TripleConstraint,
//! };
//!
//! let person = ShapeLabel::iri_unchecked("http://example.org/Person");
//! let age = NamedNode::new_unchecked("http://example.org/age");
//!
//! // <Person> CLOSED { ex:age xsd:integer }
//! let mut builder = SchemaBuilder::new();
//! builder.add_shape(
//!     person.clone(),
//!     ShapeExpression::Shape(
//!         Shape::new(
//!             TripleConstraint::with_value_expr(
//!                 age.clone(),
//!                 ShapeExpression::NodeConstraint(NodeConstraint::with_datatype(
//!                     xsd::INTEGER.into_owned(),
//!                 )),
//!             )
//!             .with_cardinality(Cardinality::exactly(1))
//!             .into(),
//!         )
//!         .closed(),
//!     ),
//! );
//! let schema = builder.build()?;
//!
//! let alice = NamedNode::new_unchecked("http://example.org/alice");
//! let mut graph = Graph::new();
//! graph.insert(&Triple::new(alice.clone(), age, Literal::from(42)));
//!
//! let mut validator = ShexValidator::new(&schema, &graph);
//! assert!(validator.validate(&Term::from(alice), &person)?);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```
//!
//! # Algorithm
//!
//! Each (node, label) pair is first assumed to conform. The neighbourhood of the node is
//! then matched against the triple expression of the shape, after it has been rewritten so
//! that each triple constraint occurs once. Every way of assigning neighbour triples to
//! constraints is a [`Bag`], accepted if the occurrence [`Interval`] of the whole
//! expression contains 1. A failed assumption is recorded and every conclusion drawn from
//! it is rolled back.

#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_favicon_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bag;
mod error;
mod formula;
mod graph;
mod interval;
mod limits;
mod matcher;
mod model;
mod node_constraint;
mod schema;
mod sorbe;
mod stratification;
mod typing;
mod validator;
mod value;


pub use bag::{Bag, BagIterator};
pub use error::{FormulaError, ShexError, ShexSchemaError, ShexValidationError};
pub use formula::{Formula, Operand, Operator, Quantifier, Sentence, Truth, Variable};
pub use graph::{Direction, NeighborEdge, NeighborGraph};
pub use interval::Interval;
pub use limits::ValidationLimits;
pub use matcher::{
    Matcher, PredicateAndValueMatcher, PredicateOnlyMatcher, collect_matching_constraints,
};
pub use model::{
    Cardinality, NodeConstraint, NodeKind, NumericFacet, Shape, ShapeExpression, ShapeLabel,
    StringFacet, TripleConstraint, TripleExprLabel, TripleExpression, ValueSetValue,
};
pub use schema::{SchemaBuilder, ShexSchema};
pub use sorbe::SorbeTripleExpr;
pub use stratification::Stratification;
pub use typing::{MatchedTriple, Typing, Verdict};
pub use validator::ShexValidator;
