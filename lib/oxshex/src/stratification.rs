//! Stratification of shape labels.
//!
//! Shapes may reference each other recursively, but a reference that goes through a
//! negation (`NOT`, or a predicate declared `EXTRA`) or through a triple constraint that
//! can never be matched (maximum cardinality 0) must not be part of a cycle. Such a
//! reference always points to a strictly lower stratum, so its target is fully decided
//! before it is used.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ShexSchemaError;
use crate::model::{Shape, ShapeExpression, ShapeLabel, TripleExpression};
use crate::schema::ShexSchema;

/// Kind of a reference between two shape labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Dependency {
    negative: bool,
    non_productive: bool,
}

impl Dependency {
    fn kind(self) -> Option<&'static str> {
        if self.negative {
            Some("negative")
        } else if self.non_productive {
            Some("zero-cardinality")
        } else {
            None
        }
    }
}

/// Ordered strata of shape labels.
///
/// Labels in the same stratum are mutually recursive through positive references only.
/// A label only depends on labels of its own stratum or of lower strata.
#[derive(Debug, Clone, Default)]
pub struct Stratification {
    strata: Vec<Vec<ShapeLabel>>,
    stratum_of: FxHashMap<ShapeLabel, usize>,
}

impl Stratification {
    /// Computes the stratification of a schema, failing if a negative or zero-cardinality
    /// reference lies inside a cycle.
    pub(crate) fn analyze(schema: &ShexSchema) -> Result<Self, ShexSchemaError> {
        let mut graph = DiGraph::<ShapeLabel, Dependency>::new();
        let mut nodes = FxHashMap::default();
        for label in schema.labels() {
            nodes.insert(label.clone(), graph.add_node(label.clone()));
        }

        let mut edges = Vec::new();
        for (label, expr) in schema.shapes() {
            let mut collector = DependencyCollector {
                schema,
                edges: &mut edges,
            };
            collector.shape_expr(expr, Dependency::default());
            for (target, dependency) in edges.drain(..) {
                if let (Some(from), Some(to)) = (nodes.get(label), nodes.get(&target)) {
                    graph.add_edge(*from, *to, dependency);
                }
            }
        }

        // Tarjan returns the components in reverse topological order
        let components = tarjan_scc(&graph);
        let mut component_of = vec![0; graph.node_count()];
        for (i, component) in components.iter().enumerate() {
            for node in component {
                component_of[node.index()] = i;
            }
        }

        for edge in graph.edge_references() {
            let (source, target) = (edge.source(), edge.target());
            let component = component_of[source.index()];
            if component != component_of[target.index()] {
                continue;
            }
            if let Some(kind) = edge.weight().kind() {
                let mut members: Vec<NodeIndex> = components[component].clone();
                members.sort_unstable();
                return Err(ShexSchemaError::NotStratified {
                    from: graph[source].clone(),
                    to: graph[target].clone(),
                    kind,
                    component: members.into_iter().map(|n| graph[n].clone()).collect(),
                });
            }
        }

        let mut stratum_of = FxHashMap::default();
        let strata: Vec<Vec<ShapeLabel>> = components
            .into_iter()
            .enumerate()
            .map(|(i, mut component)| {
                component.sort_unstable();
                component
                    .into_iter()
                    .map(|node| {
                        stratum_of.insert(graph[node].clone(), i);
                        graph[node].clone()
                    })
                    .collect()
            })
            .collect();
        debug!(
            strata = strata.len(),
            labels = stratum_of.len(),
            "computed schema stratification"
        );
        Ok(Self { strata, stratum_of })
    }

    /// Returns the stratum of a label, lower strata being decided first.
    pub fn stratum(&self, label: &ShapeLabel) -> Option<usize> {
        self.stratum_of.get(label).copied()
    }

    /// Returns the strata, from the lowest to the highest.
    pub fn strata(&self) -> &[Vec<ShapeLabel>] {
        &self.strata
    }

    /// Returns the number of strata.
    pub fn len(&self) -> usize {
        self.strata.len()
    }

    /// Returns true if there is no stratum.
    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

/// Walks a definition and records every referenced label with the kind of the reference.
struct DependencyCollector<'a> {
    schema: &'a ShexSchema,
    edges: &'a mut Vec<(ShapeLabel, Dependency)>,
}

impl DependencyCollector<'_> {
    fn shape_expr(&mut self, expr: &ShapeExpression, dependency: Dependency) {
        match expr {
            ShapeExpression::ShapeAnd(exprs) | ShapeExpression::ShapeOr(exprs) => {
                for expr in exprs {
                    self.shape_expr(expr, dependency);
                }
            }
            ShapeExpression::ShapeNot(expr) => self.shape_expr(
                expr,
                Dependency {
                    negative: true,
                    ..dependency
                },
            ),
            ShapeExpression::ShapeRef(label) => self.edges.push((label.clone(), dependency)),
            ShapeExpression::Shape(shape) => self.triple_expr(&shape.expression, shape, dependency),
            ShapeExpression::NodeConstraint(_) | ShapeExpression::ShapeExternal => {}
        }
    }

    fn triple_expr(&mut self, expr: &TripleExpression, shape: &Shape, dependency: Dependency) {
        match expr {
            TripleExpression::TripleConstraint(tc) => {
                let dependency = Dependency {
                    negative: dependency.negative || shape.is_extra(tc.predicate.as_ref()),
                    non_productive: dependency.non_productive || tc.cardinality.is_zero(),
                };
                if let Some(value) = &tc.value_expr {
                    self.shape_expr(value, dependency);
                }
            }
            TripleExpression::EachOf {
                expressions,
                cardinality,
            }
            | TripleExpression::OneOf {
                expressions,
                cardinality,
            } => {
                let dependency = Dependency {
                    non_productive: dependency.non_productive || cardinality.is_zero(),
                    ..dependency
                };
                for expr in expressions {
                    self.triple_expr(expr, shape, dependency);
                }
            }
            TripleExpression::Ref(label) => {
                // References are acyclic, checked before the analysis runs
                if let Some(expr) = self.schema.get_triple_expr(label) {
                    self.triple_expr(expr, shape, dependency);
                }
            }
            TripleExpression::Empty => {}
        }
    }
}
