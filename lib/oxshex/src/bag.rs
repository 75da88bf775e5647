//! Enumeration of bags: assignments of one candidate constraint to each neighbour edge.

/// One assignment of a constraint instance to every matched edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bag {
    assignment: Vec<usize>,
    counts: Vec<usize>,
}

impl Bag {
    /// Creates a bag from the constraint chosen for each edge.
    pub fn new(assignment: Vec<usize>, constraint_count: usize) -> Self {
        let mut counts = vec![0; constraint_count];
        for constraint in &assignment {
            if let Some(count) = counts.get_mut(*constraint) {
                *count += 1;
            }
        }
        Self { assignment, counts }
    }

    /// The constraint index chosen for each edge, in edge order.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Number of edges assigned to the given constraint.
    pub fn count(&self, constraint: usize) -> usize {
        self.counts.get(constraint).copied().unwrap_or(0)
    }

    /// Number of edges assigned to each constraint.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Returns true if no edge is assigned.
    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }
}

/// Lazy Cartesian product of per-edge candidate lists.
///
/// The first edge varies slowest. Without any edge, exactly one empty bag is produced.
/// If an edge has no candidate, nothing is produced.
#[derive(Debug, Clone)]
pub struct BagIterator {
    candidates: Vec<Vec<usize>>,
    constraint_count: usize,
    positions: Vec<usize>,
    exhausted: bool,
}

impl BagIterator {
    /// Creates an iterator over every bag built from the candidate lists.
    pub fn new(candidates: Vec<Vec<usize>>, constraint_count: usize) -> Self {
        let exhausted = candidates.iter().any(Vec::is_empty);
        Self {
            positions: vec![0; candidates.len()],
            candidates,
            constraint_count,
            exhausted,
        }
    }

    /// Restarts the enumeration from the first bag.
    pub fn reset(&mut self) {
        self.positions.fill(0);
        self.exhausted = self.candidates.iter().any(Vec::is_empty);
    }

    /// Total number of bags, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.candidates
            .iter()
            .fold(1_usize, |acc, c| acc.saturating_mul(c.len()))
    }

    fn advance(&mut self) {
        for i in (0..self.positions.len()).rev() {
            self.positions[i] += 1;
            if self.positions[i] < self.candidates[i].len() {
                return;
            }
            self.positions[i] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for BagIterator {
    type Item = Bag;

    fn next(&mut self) -> Option<Bag> {
        if self.exhausted {
            return None;
        }
        let assignment = self
            .positions
            .iter()
            .zip(&self.candidates)
            .map(|(position, candidates)| candidates[*position])
            .collect();
        self.advance();
        Some(Bag::new(assignment, self.constraint_count))
    }
}
