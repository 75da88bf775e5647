//! Integration tests for ShEx validation.
//!
//! These tests cover end-to-end validation scenarios, schema analysis errors, formulas
//! evaluated over validation results and custom graph implementations.

use oxrdf::vocab::xsd;
use oxrdf::{Graph, Literal, NamedNode, Term, Triple};
use oxrdfio::{RdfFormat, RdfParser};
use oxshex::{
    Cardinality, Direction, Formula, NeighborEdge, NeighborGraph, NodeConstraint, Operator,
    Quantifier, SchemaBuilder, Sentence, Shape, ShapeExpression, ShapeLabel, ShexSchema,
    ShexSchemaError, ShexValidator, TripleConstraint, TripleExpression, Variable,
};
use rustc_hash::FxHashSet;

// =============================================================================
// Helper Functions
// =============================================================================

/// Helper to parse a Turtle string into a Graph.
fn parse_turtle(turtle: &str) -> Graph {
    let mut graph = Graph::new();
    let parser = RdfParser::from_format(RdfFormat::Turtle);
    for quad_result in parser.for_reader(turtle.as_bytes()) {
        let quad = quad_result.expect("Failed to parse turtle");
        graph.insert(quad.as_ref());
    }
    graph
}

fn nn(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

fn term(iri: &str) -> Term {
    Term::NamedNode(nn(iri))
}

fn label(iri: &str) -> ShapeLabel {
    ShapeLabel::iri_unchecked(iri)
}

fn datatype(datatype: oxrdf::NamedNodeRef<'_>) -> ShapeExpression {
    ShapeExpression::NodeConstraint(NodeConstraint::with_datatype(datatype.into_owned()))
}

const PERSON: &str = "http://example.org/PersonShape";
const KNOWS_TC: &str = "http://example.org/knowsTc";

/// ```shex
/// ex:PersonShape {
///     foaf:name xsd:string ;
///     foaf:age xsd:integer ? ;
///     $ex:knowsTc foaf:knows @ex:PersonShape *
/// }
/// ```
fn person_schema() -> ShexSchema {
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label(PERSON),
        ShapeExpression::Shape(Shape::new(TripleExpression::each_of([
            TripleConstraint::with_value_expr(
                nn("http://xmlns.com/foaf/0.1/name"),
                datatype(xsd::STRING),
            )
            .into(),
            TripleConstraint::with_value_expr(
                nn("http://xmlns.com/foaf/0.1/age"),
                datatype(xsd::INTEGER),
            )
            .with_cardinality(Cardinality::optional())
            .into(),
            TripleConstraint::with_shape(nn("http://xmlns.com/foaf/0.1/knows"), label(PERSON))
                .with_cardinality(Cardinality::zero_or_more())
                .with_label(label(KNOWS_TC))
                .into(),
        ]))),
    );
    builder.build().expect("Failed to build schema")
}

const PEOPLE: &str = r#"
    @prefix ex: <http://example.org/> .
    @prefix foaf: <http://xmlns.com/foaf/0.1/> .

    ex:alice foaf:name "Alice" ; foaf:age 30 ; foaf:knows ex:bob .
    ex:bob foaf:name "Bob" ; foaf:knows ex:alice , ex:carol .
    ex:carol foaf:name "Carol" .
    ex:dave foaf:name "Dave" ; foaf:knows ex:erin .
    ex:erin foaf:age 20 .
"#;

// =============================================================================
// End-to-End Validation Tests
// =============================================================================

#[test]
fn test_complete_person_validation() {
    let schema = person_schema();
    let graph = parse_turtle(PEOPLE);
    let mut validator = ShexValidator::new(&schema, &graph);

    assert!(validator.validate(&term("http://example.org/alice"), &label(PERSON)).unwrap());
    for node in ["alice", "bob", "carol"] {
        assert!(
            validator
                .typing()
                .conforms(&term(&format!("http://example.org/{node}")), &label(PERSON)),
            "{node} should conform"
        );
    }

    // ex:erin has no name, so ex:dave knows someone who is not a person
    assert!(!validator.validate(&term("http://example.org/dave"), &label(PERSON)).unwrap());
    assert!(!validator.validate(&term("http://example.org/erin"), &label(PERSON)).unwrap());
}

#[test]
fn test_validation_order_does_not_change_verdicts() {
    let schema = person_schema();
    let graph = parse_turtle(PEOPLE);
    let nodes =
        ["alice", "bob", "carol", "dave", "erin"].map(|n| term(&format!("http://example.org/{n}")));

    let mut forward = ShexValidator::new(&schema, &graph);
    let expected: Vec<bool> = nodes
        .iter()
        .map(|n| forward.validate(n, &label(PERSON)).unwrap())
        .collect();
    assert_eq!(expected, [true, true, true, false, false]);

    let mut backward = ShexValidator::new(&schema, &graph);
    for (node, expected) in nodes.iter().zip(&expected).rev() {
        assert_eq!(backward.validate(node, &label(PERSON)).unwrap(), *expected);
    }
}

#[test]
fn test_closed_empty_shape() {
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/Leaf"),
        ShapeExpression::Shape(Shape::empty().closed()),
    );
    let schema = builder.build().unwrap();
    let graph = parse_turtle(
        r"
        @prefix ex: <http://example.org/> .
        ex:root ex:child ex:leaf .
    ",
    );
    let mut validator = ShexValidator::new(&schema, &graph);
    let leaf = label("http://example.org/Leaf");
    assert!(
        validator
            .validate(&term("http://example.org/leaf"), &leaf)
            .unwrap()
    );
    assert!(
        !validator
            .validate(&term("http://example.org/root"), &leaf)
            .unwrap()
    );
}

// =============================================================================
// Schema Analysis Tests
// =============================================================================

#[test]
fn test_negation_inside_a_cycle_is_rejected() {
    // S { ex:p @T } ; T NOT @S
    let mut builder = SchemaBuilder::new();
    builder
        .add_shape(
            label("http://example.org/S"),
            ShapeExpression::Shape(Shape::new(
                TripleConstraint::with_shape(
                    nn("http://example.org/p"),
                    label("http://example.org/T"),
                )
                .into(),
            )),
        )
        .add_shape(
            label("http://example.org/T"),
            ShapeExpression::ShapeNot(Box::new(ShapeExpression::ShapeRef(label(
                "http://example.org/S",
            )))),
        );
    let error = builder.build().unwrap_err();
    assert!(error.is_not_stratified());
    match error {
        ShexSchemaError::NotStratified {
            from,
            to,
            kind,
            component,
        } => {
            assert_eq!(from, label("http://example.org/T"));
            assert_eq!(to, label("http://example.org/S"));
            assert_eq!(kind, "negative");
            assert_eq!(component.len(), 2);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_extra_self_reference_is_rejected() {
    // S EXTRA ex:p { ex:p @S }
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/S"),
        ShapeExpression::Shape(
            Shape::new(
                TripleConstraint::with_shape(
                    nn("http://example.org/p"),
                    label("http://example.org/S"),
                )
                .into(),
            )
            .with_extra(nn("http://example.org/p")),
        ),
    );
    assert!(builder.build().unwrap_err().is_not_stratified());
}

#[test]
fn test_zero_cardinality_inside_a_cycle_is_rejected() {
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/S"),
        ShapeExpression::Shape(Shape::new(
            TripleConstraint::with_shape(nn("http://example.org/p"), label("http://example.org/S"))
                .with_cardinality(Cardinality::new(0, Some(0)).unwrap())
                .into(),
        )),
    );
    assert!(matches!(
        builder.build(),
        Err(ShexSchemaError::NotStratified {
            kind: "zero-cardinality",
            ..
        })
    ));
}

#[test]
fn test_negation_to_a_lower_stratum() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_shape(
            label("http://example.org/NotPerson"),
            ShapeExpression::ShapeNot(Box::new(ShapeExpression::ShapeRef(label(PERSON)))),
        )
        .add_shape(
            label(PERSON),
            ShapeExpression::Shape(Shape::new(
                TripleConstraint::with_shape(nn("http://xmlns.com/foaf/0.1/knows"), label(PERSON))
                    .with_cardinality(Cardinality::zero_or_more())
                    .into(),
            )),
        );
    let schema = builder.build().unwrap();
    let stratification = schema.stratification();
    assert!(
        stratification.stratum(&label(PERSON)).unwrap()
            < stratification
                .stratum(&label("http://example.org/NotPerson"))
                .unwrap()
    );

    let graph = parse_turtle(
        r"
        @prefix foaf: <http://xmlns.com/foaf/0.1/> .
        @prefix ex: <http://example.org/> .
        ex:a foaf:knows ex:b .
        ex:b foaf:knows 1 .
    ",
    );
    let mut validator = ShexValidator::new(&schema, &graph);
    let not_person = label("http://example.org/NotPerson");
    assert!(
        !validator
            .validate(&term("http://example.org/a"), &not_person)
            .unwrap()
    );
    // A literal has no outgoing edge, so it conforms to an open shape of optional edges
    assert!(
        validator
            .validate(&Literal::from(1).into(), &label(PERSON))
            .unwrap()
    );
}

#[test]
fn test_undefined_references_are_rejected() {
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/S"),
        ShapeExpression::ShapeRef(label("http://example.org/Missing")),
    );
    assert!(matches!(
        builder.build(),
        Err(ShexSchemaError::UndefinedShapeRef { .. })
    ));

    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/S"),
        ShapeExpression::Shape(Shape::new(TripleExpression::Ref(label(
            "http://example.org/missing",
        )))),
    );
    assert!(matches!(
        builder.build(),
        Err(ShexSchemaError::UndefinedTripleExprRef { .. })
    ));
}

#[test]
fn test_duplicate_labels_are_rejected() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_shape(label(PERSON), ShapeExpression::Shape(Shape::empty()))
        .add_shape(label(PERSON), ShapeExpression::Shape(Shape::empty()));
    assert!(matches!(
        builder.build(),
        Err(ShexSchemaError::DuplicateLabel { .. })
    ));
}

// =============================================================================
// Formula Tests
// =============================================================================

#[test]
fn test_formula_over_shape_facts() {
    let schema = person_schema();
    let graph = parse_turtle(PEOPLE);
    let mut validator = ShexValidator::new(&schema, &graph);
    for node in ["alice", "dave"] {
        validator
            .validate(&term(&format!("http://example.org/{node}")), &label(PERSON))
            .unwrap();
    }

    let x = Variable::new("x");
    let mut everyone_is_a_person = Formula::new(
        vec![Quantifier::Forall(x.clone())],
        Sentence::ShapeMembership {
            variable: x.clone(),
            label: label(PERSON),
        },
    );
    let people = [term("http://example.org/alice"), term("http://example.org/bob")];
    assert!(validator.evaluate_formula(&mut everyone_is_a_person, &people).unwrap());

    let mixed = [term("http://example.org/carol"), term("http://example.org/dave")];
    assert!(!validator.evaluate_formula(&mut everyone_is_a_person, &mixed).unwrap());
    assert_eq!(
        everyone_is_a_person.last_assignment().get(&x),
        Some(&term("http://example.org/dave"))
    );
}

#[test]
fn test_formula_over_triple_facts() {
    let schema = person_schema();
    let graph = parse_turtle(PEOPLE);
    let mut validator = ShexValidator::new(&schema, &graph);
    validator
        .validate(&term("http://example.org/alice"), &label(PERSON))
        .unwrap();

    // Everyone alice knows knows her back
    let y = Variable::new("y");
    let alice = Variable::new("alice");
    let mut formula = Formula::new(
        vec![
            Quantifier::Exists(alice.clone()),
            Quantifier::Forall(y.clone()),
        ],
        Sentence::And(vec![
            Sentence::compare(
                Operator::Equal,
                alice.clone(),
                term("http://example.org/alice"),
            ),
            Sentence::Or(vec![
                Sentence::negate(Sentence::TripleMembership {
                    subject: alice.clone(),
                    object: y.clone(),
                    label: label(KNOWS_TC),
                }),
                Sentence::TripleMembership {
                    subject: y,
                    object: alice,
                    label: label(KNOWS_TC),
                },
            ]),
        ]),
    );
    let candidates = [
        term("http://example.org/alice"),
        term("http://example.org/bob"),
        term("http://example.org/carol"),
    ];
    assert!(validator.evaluate_formula(&mut formula, &candidates).unwrap());
}

// =============================================================================
// Custom Graph Tests
// =============================================================================

/// A graph stored as a plain list of triples.
struct TripleList(Vec<Triple>);

impl NeighborGraph for TripleList {
    fn out_neighbors(&self, node: &Term) -> Vec<NeighborEdge> {
        self.0
            .iter()
            .filter(|t| Term::from(t.subject.clone()) == *node)
            .map(|t| NeighborEdge {
                focus: node.clone(),
                predicate: t.predicate.clone(),
                direction: Direction::Forward,
                other: t.object.clone(),
            })
            .collect()
    }

    fn in_neighbors_with_predicates(
        &self,
        node: &Term,
        predicates: &FxHashSet<NamedNode>,
    ) -> Vec<NeighborEdge> {
        self.0
            .iter()
            .filter(|t| t.object == *node && predicates.contains(&t.predicate))
            .map(|t| NeighborEdge {
                focus: node.clone(),
                predicate: t.predicate.clone(),
                direction: Direction::Inverse,
                other: t.subject.clone().into(),
            })
            .collect()
    }
}

#[test]
fn test_custom_neighbor_graph() {
    let parent = nn("http://example.org/parent");
    let mut builder = SchemaBuilder::new();
    builder.add_shape(
        label("http://example.org/Child"),
        ShapeExpression::Shape(Shape::new(TripleConstraint::new(parent.clone()).into())),
    );
    builder.add_shape(
        label("http://example.org/Parent"),
        ShapeExpression::Shape(Shape::new(
            TripleConstraint::with_shape(parent.clone(), label("http://example.org/Child"))
                .with_inverse(true)
                .with_cardinality(Cardinality::one_or_more())
                .into(),
        )),
    );
    let schema = builder.build().unwrap();
    let graph = TripleList(vec![
        Triple::new(nn("http://example.org/a"), parent.clone(), nn("http://example.org/p")),
        Triple::new(nn("http://example.org/b"), parent, nn("http://example.org/p")),
    ]);

    let mut validator = ShexValidator::new(&schema, &graph);
    let parent_shape = label("http://example.org/Parent");
    assert!(
        validator
            .validate(&term("http://example.org/p"), &parent_shape)
            .unwrap()
    );
    assert!(
        !validator
            .validate(&term("http://example.org/a"), &parent_shape)
            .unwrap()
    );
    assert!(
        validator
            .typing()
            .conforms(&term("http://example.org/b"), &label("http://example.org/Child"))
    );
}
