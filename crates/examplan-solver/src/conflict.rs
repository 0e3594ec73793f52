//! Exam conflict graph
//!
//! Undirected graph over exams: an edge joins two exams iff they share at
//! least one student. Built once per run by comparing every pair of student
//! sets, then treated as an immutable value.

use examplan_core::{Exam, ExamId};
use std::collections::{BTreeMap, BTreeSet};

/// Symmetric adjacency between exams that share students
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    adjacency: BTreeMap<ExamId, BTreeSet<ExamId>>,
}

impl ConflictGraph {
    /// Build the graph for `exams`.
    ///
    /// Every exam gets an entry, isolated exams included.
    pub fn build(exams: &[Exam]) -> Self {
        let mut adjacency: BTreeMap<ExamId, BTreeSet<ExamId>> = exams
            .iter()
            .map(|e| (e.id.clone(), BTreeSet::new()))
            .collect();

        for (i, first) in exams.iter().enumerate() {
            for second in &exams[i + 1..] {
                if first.id != second.id && first.shares_students_with(second) {
                    adjacency
                        .entry(first.id.clone())
                        .or_default()
                        .insert(second.id.clone());
                    adjacency
                        .entry(second.id.clone())
                        .or_default()
                        .insert(first.id.clone());
                }
            }
        }

        Self { adjacency }
    }

    /// Exams sharing at least one student with `exam_id`
    pub fn neighbors(&self, exam_id: &str) -> impl Iterator<Item = &str> + '_ {
        self.adjacency
            .get(exam_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of exams in conflict with `exam_id`
    pub fn degree(&self, exam_id: &str) -> usize {
        self.adjacency.get(exam_id).map_or(0, BTreeSet::len)
    }

    /// Highest degree in the graph
    pub fn max_degree(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).max().unwrap_or(0)
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}
