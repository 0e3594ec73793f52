//! Slot search
//!
//! Depth-first backtracking over the priority-ordered exams, driven by an
//! explicit stack of choice points, plus the single-pass greedy fallback used
//! once the iteration ceiling is hit.

use crate::assignment::Assignment;
use crate::calendar::SlotCalendar;
use crate::conflict::ConflictGraph;
use crate::rooms::RoomAllocator;
use chrono::NaiveDate;
use examplan_core::{Exam, Room};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Limits
// ============================================================================

/// Tunables bounding the backtracking search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    /// Descents allowed before handing over to the greedy pass
    pub max_iterations: usize,
    /// Candidate window at depth 0
    pub window_base: usize,
    /// Extra candidates per level of depth
    pub window_growth: usize,
    /// Windows at least this wide are evaluated on the rayon pool
    pub parallel_threshold: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            window_base: 20,
            window_growth: 5,
            parallel_threshold: 256,
        }
    }
}

impl SearchLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration ceiling
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the candidate window to `base + depth * growth`
    pub fn window(mut self, base: usize, growth: usize) -> Self {
        self.window_base = base;
        self.window_growth = growth;
        self
    }

    /// Set the window width from which candidates are checked in parallel
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Never evaluate candidates in parallel
    pub fn sequential(self) -> Self {
        self.parallel_threshold(usize::MAX)
    }

    /// Number of leading slots considered at `depth`
    pub fn window_at(&self, depth: usize) -> usize {
        depth
            .saturating_mul(self.window_growth)
            .saturating_add(self.window_base)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Caller-driven stop signal, shared between threads
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every run holding a clone of this token to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of the backtracking phase
#[derive(Debug)]
pub enum SearchOutcome<'s> {
    Solved(Assignment<'s>),
    /// Every candidate combination inside the windows failed
    Exhausted,
    /// Iteration ceiling exceeded
    TimedOut { iterations: usize },
    Cancelled,
}

/// Result of the greedy pass
#[derive(Debug)]
pub enum GreedyOutcome<'s> {
    Solved(Assignment<'s>),
    /// First exam with no valid slot left
    Stuck(&'s Exam),
    Cancelled,
}

/// Candidates still to try at one depth
struct ChoicePoint<'s> {
    candidates: Vec<(usize, &'s Room)>,
    cursor: usize,
}

// ============================================================================
// Searcher
// ============================================================================

/// Read-only view of one run's inputs, shared by both search strategies
pub struct Searcher<'s> {
    order: &'s [&'s Exam],
    graph: &'s ConflictGraph,
    calendar: &'s SlotCalendar,
    rooms: RoomAllocator<'s>,
    min_days: i64,
    spread_evenly: bool,
    limits: SearchLimits,
    cancel: Option<&'s CancellationToken>,
}

impl<'s> Searcher<'s> {
    pub fn new(
        order: &'s [&'s Exam],
        graph: &'s ConflictGraph,
        calendar: &'s SlotCalendar,
        rooms: RoomAllocator<'s>,
        min_days: u32,
    ) -> Self {
        Self {
            order,
            graph,
            calendar,
            rooms,
            min_days: i64::from(min_days),
            spread_evenly: false,
            limits: SearchLimits::default(),
            cancel: None,
        }
    }

    /// Try the least-loaded dates first
    pub fn spread_evenly(mut self, spread: bool) -> Self {
        self.spread_evenly = spread;
        self
    }

    pub fn limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn cancellation(mut self, token: Option<&'s CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    /// Room for `exam` in `slot`, if the slot respects every placed neighbor.
    ///
    /// Neighbors may neither share the slot nor sit closer than the minimum
    /// day gap.
    pub fn is_valid_slot(
        &self,
        exam: &Exam,
        slot: usize,
        assignment: &Assignment<'_>,
    ) -> Option<&'s Room> {
        let room = self.rooms.find_room(exam, slot, assignment)?;

        for neighbor in self.graph.neighbors(&exam.id) {
            let Some(booking) = assignment.get(neighbor) else {
                continue;
            };
            if booking.slot == slot {
                return None;
            }
            match self.calendar.day_gap(slot, booking.slot) {
                Some(gap) if gap >= self.min_days => {}
                _ => return None,
            }
        }

        Some(room)
    }

    /// Valid (slot, room) pairs for the exam at `depth`, in try order
    pub fn candidates(
        &self,
        depth: usize,
        exam: &Exam,
        assignment: &Assignment<'_>,
    ) -> Vec<(usize, &'s Room)> {
        let width = self
            .limits
            .window_at(depth)
            .min(self.calendar.total_slots());

        // Parallel collection keeps slot order
        let mut valid: Vec<(usize, &'s Room)> = if width >= self.limits.parallel_threshold {
            (0..width)
                .into_par_iter()
                .filter_map(|slot| self.is_valid_slot(exam, slot, assignment).map(|r| (slot, r)))
                .collect()
        } else {
            (0..width)
                .filter_map(|slot| self.is_valid_slot(exam, slot, assignment).map(|r| (slot, r)))
                .collect()
        };

        if self.spread_evenly {
            let load = self.load_by_date(assignment);
            valid.sort_by_key(|(slot, _)| {
                self.calendar
                    .date_of(*slot)
                    .and_then(|d| load.get(&d).copied())
                    .unwrap_or(0)
            });
        }

        valid
    }

    fn load_by_date(&self, assignment: &Assignment<'_>) -> BTreeMap<NaiveDate, usize> {
        let mut load = BTreeMap::new();
        for booking in assignment.iter() {
            if let Some(date) = self.calendar.date_of(booking.slot) {
                *load.entry(date).or_insert(0) += 1;
            }
        }
        load
    }

    /// Bounded depth-first search.
    ///
    /// Every descent into a depth counts as one iteration. Assignments are
    /// undone exactly when a choice point moves on or is popped.
    pub fn backtrack(&self) -> SearchOutcome<'s> {
        let mut assignment = Assignment::new();
        let mut stack: Vec<ChoicePoint<'s>> = Vec::with_capacity(self.order.len());
        let mut iterations = 0usize;
        let mut descend = true;

        loop {
            if self.is_cancelled() {
                return SearchOutcome::Cancelled;
            }

            if descend {
                iterations += 1;
                if iterations > self.limits.max_iterations {
                    return SearchOutcome::TimedOut { iterations };
                }
                let depth = stack.len();
                let Some(exam) = self.order.get(depth) else {
                    return SearchOutcome::Solved(assignment);
                };
                let candidates = self.candidates(depth, exam, &assignment);
                stack.push(ChoicePoint {
                    candidates,
                    cursor: 0,
                });
            }

            let Some(depth) = stack.len().checked_sub(1) else {
                return SearchOutcome::Exhausted;
            };
            let exam = self.order[depth];
            assignment.unassign(&exam.id);

            let point = &mut stack[depth];
            match point.candidates.get(point.cursor).copied() {
                Some((slot, room)) => {
                    point.cursor += 1;
                    assignment.assign(exam, slot, room);
                    descend = true;
                }
                None => {
                    stack.pop();
                    if stack.is_empty() {
                        return SearchOutcome::Exhausted;
                    }
                    descend = false;
                }
            }
        }
    }

    /// First-fit over every slot, committing immediately
    pub fn greedy(&self) -> GreedyOutcome<'s> {
        let mut assignment = Assignment::new();
        let total = self.calendar.total_slots();

        for &exam in self.order {
            if self.is_cancelled() {
                return GreedyOutcome::Cancelled;
            }
            let found = (0..total)
                .find_map(|slot| self.is_valid_slot(exam, slot, &assignment).map(|r| (slot, r)));
            match found {
                Some((slot, room)) => assignment.assign(exam, slot, room),
                None => return GreedyOutcome::Stuck(exam),
            }
        }

        GreedyOutcome::Solved(assignment)
    }
}
