//! Interval evaluation of a bag against a SORBE triple expression.
//!
//! For every node of the expression the evaluator computes the interval of repetition
//! counts `k` such that the bag, restricted to the constraints below that node, belongs to
//! the language of the node repeated `k` times. A bag satisfies the expression when the
//! interval of the root contains 1.

use std::fmt;

use crate::bag::Bag;
use crate::model::Cardinality;
use crate::sorbe::SorbeNode;

/// A set of consecutive repetition counts. `max == None` stands for infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    min: usize,
    max: Option<usize>,
}

impl Interval {
    /// `[0, ∞]`
    pub const STAR: Self = Self { min: 0, max: None };
    /// `[0, 0]`
    pub const ZERO: Self = Self {
        min: 0,
        max: Some(0),
    };
    /// The empty interval.
    pub const EMPTY: Self = Self {
        min: 1,
        max: Some(0),
    };

    /// Creates the interval `[min, max]`.
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Creates the single point interval `[n, n]`.
    pub fn point(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Returns true if no count belongs to the interval.
    pub fn is_empty(&self) -> bool {
        self.max.is_some_and(|max| max < self.min)
    }

    /// Returns true if the count belongs to the interval.
    pub fn contains(&self, n: usize) -> bool {
        self.min <= n && self.max.is_none_or(|max| n <= max)
    }

    /// Intersection of two intervals.
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, None) => a,
                (None, b) => b,
            },
        }
    }

    /// Minkowski sum of two intervals.
    #[must_use]
    pub fn sum(self, other: Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::EMPTY;
        }
        Self {
            min: self.min.saturating_add(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                _ => None,
            },
        }
    }

    /// Counts `k` such that `k` repetitions of `{n,m}` can produce a count of this interval.
    ///
    /// Only meaningful for a non-empty sub-bag, so the result never contains 0.
    #[must_use]
    pub fn divide(self, cardinality: Cardinality) -> Self {
        if self.is_empty() || cardinality.max == Some(0) {
            return Self::EMPTY;
        }
        let min = match cardinality.max {
            Some(m) => self.min.div_ceil(m as usize),
            None => usize::from(self.min != 0),
        };
        let max = match (self.max, cardinality.min) {
            (_, 0) | (None, _) => None,
            (Some(u), n) => Some(u / n as usize),
        };
        Self {
            min: min.max(1),
            max,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {max}]", self.min),
            None => write!(f, "[{}, *]", self.min),
        }
    }
}

/// Returns true if the bag is accepted by the expression rooted at `root`.
pub(crate) fn is_satisfied(root: &SorbeNode, bag: &Bag) -> bool {
    evaluate(root, bag).0.contains(1)
}

/// Returns the interval of a node and whether its sub-bag is non-empty.
fn evaluate(node: &SorbeNode, bag: &Bag) -> (Interval, bool) {
    match node {
        SorbeNode::Constraint(index) => {
            let count = bag.count(*index);
            (Interval::point(count), count > 0)
        }
        SorbeNode::Repeat { node, cardinality } => {
            let (interval, non_empty) = evaluate(node, bag);
            if non_empty {
                (interval.divide(*cardinality), true)
            } else if cardinality.min == 0 || node.is_nullable() {
                (Interval::STAR, false)
            } else {
                (Interval::ZERO, false)
            }
        }
        SorbeNode::EachOf(nodes) => nodes
            .iter()
            .fold((Interval::STAR, false), |(acc, any), node| {
                let (interval, non_empty) = evaluate(node, bag);
                (acc.intersection(interval), any || non_empty)
            }),
        SorbeNode::OneOf(nodes) => nodes
            .iter()
            .fold((Interval::ZERO, false), |(acc, any), node| {
                let (interval, non_empty) = evaluate(node, bag);
                (acc.sum(interval), any || non_empty)
            }),
        SorbeNode::Empty => (Interval::STAR, false),
    }
}
