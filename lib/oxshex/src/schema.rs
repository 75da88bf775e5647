//! Shapes schema arena.
//!
//! A [`ShexSchema`] owns every shape and triple expression definition and is the only
//! way to reach the validator. It is built by [`SchemaBuilder::build`], which checks
//! references, hoists inline value expressions into their own definitions and runs the
//! stratification analysis.

use oxrdf::BlankNode;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ShexSchemaError;
use crate::model::{ShapeExpression, ShapeLabel, TripleExprLabel, TripleExpression};
use crate::stratification::Stratification;

/// Collects shape and triple expression definitions before building a [`ShexSchema`].
///
/// ```
/// use oxrdf::NamedNode;
/// use oxshex::{SchemaBuilder, Shape, ShapeExpression, ShapeLabel, TripleConstraint};
///
/// let person = ShapeLabel::iri_unchecked("http://example.org/Person");
/// let knows = NamedNode::new_unchecked("http://example.org/knows");
/// let mut builder = SchemaBuilder::new();
/// builder.add_shape(
///     person.clone(),
///     ShapeExpression::Shape(Shape::new(
///         TripleConstraint::with_shape(knows, person.clone()).into(),
///     )),
/// );
/// let schema = builder.build()?;
/// assert!(schema.get_shape(&person).is_some());
/// # Result::<_, oxshex::ShexSchemaError>::Ok(())
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    shapes: Vec<(ShapeLabel, ShapeExpression)>,
    triple_exprs: Vec<(TripleExprLabel, TripleExpression)>,
    start: Option<ShapeLabel>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shape expression with the given label.
    pub fn add_shape(&mut self, label: ShapeLabel, expr: ShapeExpression) -> &mut Self {
        self.shapes.push((label, expr));
        self
    }

    /// Adds a labeled triple expression that shapes can reference with [`TripleExpression::Ref`].
    pub fn add_triple_expr(&mut self, label: TripleExprLabel, expr: TripleExpression) -> &mut Self {
        self.triple_exprs.push((label, expr));
        self
    }

    /// Sets the start shape.
    pub fn set_start(&mut self, label: ShapeLabel) -> &mut Self {
        self.start = Some(label);
        self
    }

    /// Checks the definitions and builds the schema.
    ///
    /// Fails if a label is defined twice, if a reference is dangling, if triple
    /// expression references are cyclic or if the schema is not stratified.
    pub fn build(self) -> Result<ShexSchema, ShexSchemaError> {
        let mut labels = Vec::with_capacity(self.shapes.len());
        let mut definitions = Vec::with_capacity(self.shapes.len());
        let mut seen = FxHashSet::default();
        for (label, expr) in self.shapes {
            if !seen.insert(label.clone()) {
                return Err(ShexSchemaError::duplicate_label(label));
            }
            labels.push(label);
            definitions.push(expr);
        }

        let mut triple_exprs = FxHashMap::default();
        let mut triple_expr_labels = Vec::with_capacity(self.triple_exprs.len());
        for (label, mut expr) in self.triple_exprs {
            if triple_exprs.contains_key(&label) {
                return Err(ShexSchemaError::duplicate_label(label));
            }
            let mut hoisted = Vec::new();
            hoist_triple_expr(&mut expr, &mut hoisted);
            for (hoisted_label, hoisted_expr) in hoisted {
                labels.push(hoisted_label);
                definitions.push(hoisted_expr);
            }
            triple_expr_labels.push(label.clone());
            triple_exprs.insert(label, expr);
        }

        // Hoisted definitions are appended and processed in turn
        let mut i = 0;
        while i < definitions.len() {
            let mut hoisted = Vec::new();
            hoist_shape_expr(&mut definitions[i], &mut hoisted);
            for (hoisted_label, hoisted_expr) in hoisted {
                labels.push(hoisted_label);
                definitions.push(hoisted_expr);
            }
            i += 1;
        }

        let mut shape_count = 0;
        for definition in &mut definitions {
            assign_shape_indices(definition, &mut shape_count);
        }

        let mut schema = ShexSchema {
            shapes: labels.iter().cloned().zip(definitions).collect(),
            labels,
            triple_exprs,
            triple_expr_labels,
            start: self.start,
            shape_count,
            stratification: Stratification::default(),
        };
        schema.validate_refs()?;
        schema.detect_triple_expr_cycles()?;
        schema.stratification = Stratification::analyze(&schema)?;
        Ok(schema)
    }
}

/// A checked and stratified set of shape definitions.
///
/// Definitions refer to each other by label only.
#[derive(Debug, Clone)]
pub struct ShexSchema {
    /// Shape expressions indexed by label.
    shapes: FxHashMap<ShapeLabel, ShapeExpression>,

    /// All shape labels, user-defined ones first, in insertion order.
    labels: Vec<ShapeLabel>,

    /// Labeled triple expressions.
    triple_exprs: FxHashMap<TripleExprLabel, TripleExpression>,

    triple_expr_labels: Vec<TripleExprLabel>,

    /// Optional start shape (default entry point for validation).
    start: Option<ShapeLabel>,

    /// Number of [`Shape`](crate::Shape) nodes in all definitions.
    shape_count: usize,

    stratification: Stratification,
}

impl ShexSchema {
    /// Creates a new builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Gets a shape expression by label.
    pub fn get_shape(&self, label: &ShapeLabel) -> Option<&ShapeExpression> {
        self.shapes.get(label)
    }

    /// Returns true if a shape with this label is defined.
    pub fn contains(&self, label: &ShapeLabel) -> bool {
        self.shapes.contains_key(label)
    }

    /// Gets a labeled triple expression.
    pub fn get_triple_expr(&self, label: &TripleExprLabel) -> Option<&TripleExpression> {
        self.triple_exprs.get(label)
    }

    /// Returns an iterator over all shape labels, including the generated ones.
    pub fn labels(&self) -> impl Iterator<Item = &ShapeLabel> {
        self.labels.iter()
    }

    /// Returns an iterator over all shapes, in label insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = (&ShapeLabel, &ShapeExpression)> {
        self.labels
            .iter()
            .filter_map(|label| Some((label, self.shapes.get(label)?)))
    }

    /// Gets the start shape label.
    pub fn start(&self) -> Option<&ShapeLabel> {
        self.start.as_ref()
    }

    /// Returns the stratification computed when the schema was built.
    pub fn stratification(&self) -> &Stratification {
        &self.stratification
    }

    /// Returns true if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Returns the number of shape definitions, including the generated ones.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub(crate) fn shape_count(&self) -> usize {
        self.shape_count
    }

    fn validate_refs(&self) -> Result<(), ShexSchemaError> {
        if let Some(start) = &self.start {
            if !self.shapes.contains_key(start) {
                return Err(ShexSchemaError::UndefinedStart {
                    label: start.clone(),
                });
            }
        }
        for (label, expr) in self.shapes() {
            for ref_label in expr.collect_refs() {
                if !self.shapes.contains_key(ref_label) {
                    return Err(ShexSchemaError::undefined_shape_ref(
                        label.clone(),
                        ref_label.clone(),
                    ));
                }
            }
            let mut triple_expr_refs = Vec::new();
            collect_shape_triple_expr_refs(expr, &mut triple_expr_refs);
            self.check_triple_expr_refs(&triple_expr_refs)?;
        }
        for label in &self.triple_expr_labels {
            let Some(expr) = self.triple_exprs.get(label) else {
                continue;
            };
            let mut error = None;
            expr.for_each_constraint(&mut |tc| {
                if let Some(value) = tc.value_label() {
                    if error.is_none() && !self.shapes.contains_key(value) {
                        error = Some(ShexSchemaError::undefined_shape_ref(
                            label.clone(),
                            value.clone(),
                        ));
                    }
                }
            });
            if let Some(error) = error {
                return Err(error);
            }
            let mut triple_expr_refs = Vec::new();
            collect_triple_expr_refs(expr, &mut triple_expr_refs);
            self.check_triple_expr_refs(&triple_expr_refs)?;
        }
        Ok(())
    }

    fn check_triple_expr_refs(&self, refs: &[&TripleExprLabel]) -> Result<(), ShexSchemaError> {
        for label in refs {
            if !self.triple_exprs.contains_key(*label) {
                return Err(ShexSchemaError::undefined_triple_expr_ref((*label).clone()));
            }
        }
        Ok(())
    }

    /// Triple expression references are inlined by the SORBE normalizer so they must not be cyclic.
    fn detect_triple_expr_cycles(&self) -> Result<(), ShexSchemaError> {
        let mut visited = FxHashSet::default();
        let mut rec_stack = FxHashSet::default();

        for label in &self.triple_expr_labels {
            if !visited.contains(label) {
                self.detect_cycles_impl(label, &mut visited, &mut rec_stack)?;
            }
        }

        Ok(())
    }

    fn detect_cycles_impl(
        &self,
        label: &TripleExprLabel,
        visited: &mut FxHashSet<TripleExprLabel>,
        rec_stack: &mut FxHashSet<TripleExprLabel>,
    ) -> Result<(), ShexSchemaError> {
        visited.insert(label.clone());
        rec_stack.insert(label.clone());

        if let Some(expr) = self.triple_exprs.get(label) {
            let mut refs = Vec::new();
            collect_triple_expr_refs(expr, &mut refs);
            for ref_label in refs {
                if !visited.contains(ref_label) {
                    self.detect_cycles_impl(ref_label, visited, rec_stack)?;
                } else if rec_stack.contains(ref_label) {
                    return Err(ShexSchemaError::cyclic_triple_expr_ref(
                        label.clone(),
                        ref_label.clone(),
                    ));
                }
            }
        }

        rec_stack.remove(label);
        Ok(())
    }
}

fn hoist_shape_expr(expr: &mut ShapeExpression, hoisted: &mut Vec<(ShapeLabel, ShapeExpression)>) {
    match expr {
        ShapeExpression::ShapeAnd(exprs) | ShapeExpression::ShapeOr(exprs) => {
            for expr in exprs {
                hoist_shape_expr(expr, hoisted);
            }
        }
        ShapeExpression::ShapeNot(expr) => hoist_shape_expr(expr, hoisted),
        ShapeExpression::Shape(shape) => hoist_triple_expr(&mut shape.expression, hoisted),
        ShapeExpression::NodeConstraint(_)
        | ShapeExpression::ShapeExternal
        | ShapeExpression::ShapeRef(_) => {}
    }
}

/// Replaces every non-reference value expression by a reference to a fresh blank node label.
fn hoist_triple_expr(
    expr: &mut TripleExpression,
    hoisted: &mut Vec<(ShapeLabel, ShapeExpression)>,
) {
    expr.for_each_constraint_mut(&mut |tc| {
        let Some(value) = tc.value_expr.take() else {
            return;
        };
        if value.is_ref() {
            tc.value_expr = Some(value);
        } else {
            let label = ShapeLabel::BNode(BlankNode::default());
            tc.value_expr = Some(Box::new(ShapeExpression::ShapeRef(label.clone())));
            hoisted.push((label, *value));
        }
    });
}

fn assign_shape_indices(expr: &mut ShapeExpression, next: &mut usize) {
    match expr {
        ShapeExpression::ShapeAnd(exprs) | ShapeExpression::ShapeOr(exprs) => {
            for expr in exprs {
                assign_shape_indices(expr, next);
            }
        }
        ShapeExpression::ShapeNot(expr) => assign_shape_indices(expr, next),
        ShapeExpression::Shape(shape) => {
            shape.set_index(*next);
            *next += 1;
        }
        ShapeExpression::NodeConstraint(_)
        | ShapeExpression::ShapeExternal
        | ShapeExpression::ShapeRef(_) => {}
    }
}

fn collect_shape_triple_expr_refs<'a>(
    expr: &'a ShapeExpression,
    refs: &mut Vec<&'a TripleExprLabel>,
) {
    match expr {
        ShapeExpression::ShapeAnd(exprs) | ShapeExpression::ShapeOr(exprs) => {
            for expr in exprs {
                collect_shape_triple_expr_refs(expr, refs);
            }
        }
        ShapeExpression::ShapeNot(expr) => collect_shape_triple_expr_refs(expr, refs),
        ShapeExpression::Shape(shape) => collect_triple_expr_refs(&shape.expression, refs),
        ShapeExpression::NodeConstraint(_)
        | ShapeExpression::ShapeExternal
        | ShapeExpression::ShapeRef(_) => {}
    }
}

fn collect_triple_expr_refs<'a>(expr: &'a TripleExpression, refs: &mut Vec<&'a TripleExprLabel>) {
    match expr {
        TripleExpression::EachOf { expressions, .. }
        | TripleExpression::OneOf { expressions, .. } => {
            for expr in expressions {
                collect_triple_expr_refs(expr, refs);
            }
        }
        TripleExpression::Ref(label) => refs.push(label),
        TripleExpression::TripleConstraint(_) | TripleExpression::Empty => {}
    }
}
