//! # examplan-solver
//!
//! Exam timetabling engine: conflict graph, slot calendar, room allocation,
//! bounded backtracking with a greedy fallback, and failure diagnostics.
//!
//! This crate provides:
//! - `SlotCalendar`: slot index to date and time share
//! - `ConflictGraph`: exams sharing students
//! - `RoomAllocator`: first-fit room choice per slot
//! - `Searcher`: explicit-stack backtracking and the greedy pass
//! - `DiagnosticReporter`: clash log explanations for failed runs
//! - `TimetableEngine`: one scheduling run from session to placements
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use examplan_core::{Exam, ExamSession, Room, TimetableConfig};
//! use examplan_solver::TimetableEngine;
//!
//! let session = ExamSession::new("Winter")
//!     .exam(Exam::new("MATH1").students(["s1", "s2"]))
//!     .exam(Exam::new("PHYS1").students(["s2"]))
//!     .room(Room::new("R101", 30))
//!     .student("s1", "Ada")
//!     .student("s2", "Grace");
//! let config = TimetableConfig::new(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
//!
//! let mut engine = TimetableEngine::new(&session, config).unwrap();
//! assert!(engine.generate());
//! assert_eq!(engine.placements().len(), 2);
//! assert_eq!(engine.clash_log().last(), Some("Successfully scheduled all exams"));
//! ```

pub mod assignment;
pub mod calendar;
pub mod conflict;
pub mod diagnostics;
pub mod rooms;
pub mod search;

pub use assignment::{Assignment, Booking};
pub use calendar::{SlotCalendar, SlotTime};
pub use conflict::ConflictGraph;
pub use diagnostics::DiagnosticReporter;
pub use rooms::RoomAllocator;
pub use search::{CancellationToken, GreedyOutcome, SearchLimits, SearchOutcome, Searcher};

use chrono::Duration;
use examplan_core::{
    ClashLog, ConfigError, Exam, ExamSession, Placement, Timetable, TimetableConfig,
};
use tracing::{debug, info, warn};

/// Clash log entry closing every successful run
pub const SUCCESS_MARKER: &str = "Successfully scheduled all exams";

/// Clash log entry opening the diagnostics of an infeasible run
pub const FAILURE_MARKER: &str =
    "IMPOSSIBLE: No valid schedule exists after exhausting all constraint combinations";

// ============================================================================
// Engine
// ============================================================================

/// Lifecycle of a scheduling run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Unstarted,
    Searching,
    GreedyFallback,
    Solved,
    Failed,
    Cancelled,
}

/// One exam session scheduled against one configuration
pub struct TimetableEngine<'a> {
    session: &'a ExamSession,
    config: TimetableConfig,
    limits: SearchLimits,
    cancel: Option<CancellationToken>,
    state: EngineState,
    placements: Vec<Placement>,
    clash_log: ClashLog,
    effective_exams_per_day: u32,
    used_fallback: bool,
}

impl<'a> TimetableEngine<'a> {
    /// Create an engine, rejecting unusable input up front
    pub fn new(session: &'a ExamSession, config: TimetableConfig) -> Result<Self, ConfigError> {
        session.validate()?;
        config.validate()?;
        Ok(Self {
            session,
            effective_exams_per_day: config.max_exams_per_day,
            config,
            limits: SearchLimits::default(),
            cancel: None,
            state: EngineState::Unstarted,
            placements: Vec::new(),
            clash_log: ClashLog::new(),
            used_fallback: false,
        })
    }

    /// Override the search tunables
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Stop the run when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Placements ordered by date then start time; empty unless solved
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn clash_log(&self) -> &ClashLog {
        &self.clash_log
    }

    pub fn config(&self) -> &TimetableConfig {
        &self.config
    }

    /// Slots per day the last run actually used
    pub fn effective_exams_per_day(&self) -> u32 {
        self.effective_exams_per_day
    }

    /// Whether the last run reached the greedy pass
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// The solved timetable under `name`
    pub fn timetable(&self, name: impl Into<String>) -> Option<Timetable> {
        (self.state == EngineState::Solved).then(|| {
            Timetable::new(
                name,
                self.config.start_date,
                self.config.last_day(),
                self.placements.clone(),
            )
        })
    }

    fn reset(&mut self) {
        self.state = EngineState::Unstarted;
        self.placements.clear();
        self.clash_log = ClashLog::new();
        self.effective_exams_per_day = self.config.max_exams_per_day;
        self.used_fallback = false;
    }

    /// Run the scheduler.
    ///
    /// Returns true when every exam was placed. The clash log explains the
    /// outcome either way; placements stay empty unless the run succeeded.
    pub fn generate(&mut self) -> bool {
        self.reset();
        self.state = EngineState::Searching;

        let session = self.session;
        let exams = &session.exams;
        let graph = ConflictGraph::build(exams);
        let calendar = SlotCalendar::new(&self.config);

        debug!(
            exams = exams.len(),
            rooms = session.rooms.len(),
            edges = graph.edge_count(),
            slots = calendar.total_slots(),
            "Starting scheduling run"
        );

        if calendar.total_slots() < exams.len() {
            let all: Vec<&Exam> = exams.iter().collect();
            DiagnosticReporter::new(
                &all,
                &session.rooms,
                &graph,
                &calendar,
                self.config.min_days_between_exams,
            )
            .shortfall(&mut self.clash_log);
            info!(
                exams = exams.len(),
                slots = calendar.total_slots(),
                "Not enough time slots"
            );
            return self.finish(EngineState::Failed);
        }

        let order = priority_order(exams, &graph);

        let max_degree = graph.max_degree();
        let calendar = if max_degree >= self.config.max_exams_per_day as usize {
            let raised = u32::try_from(max_degree + 1).unwrap_or(u32::MAX);
            self.effective_exams_per_day = raised;
            self.clash_log.push(format!(
                "Adjusted max exams per day to {raised} to handle conflicts"
            ));
            debug!(max_degree, exams_per_day = raised, "Raised daily slot count");
            SlotCalendar::with_exams_per_day(&self.config, raised)
        } else {
            calendar
        };

        let token = self.cancel.clone();
        let searcher = Searcher::new(
            &order,
            &graph,
            &calendar,
            RoomAllocator::new(&session.rooms),
            self.config.min_days_between_exams,
        )
        .spread_evenly(self.config.spread_evenly)
        .limits(self.limits)
        .cancellation(token.as_ref());

        let solved = match searcher.backtrack() {
            SearchOutcome::Solved(assignment) => Some(assignment),
            SearchOutcome::Exhausted => None,
            SearchOutcome::Cancelled => return self.cancelled(),
            SearchOutcome::TimedOut { iterations } => {
                warn!(iterations, "Search ceiling reached, running greedy fallback");
                self.clash_log
                    .push("Scheduling timed out - trying greedy approach instead");
                self.state = EngineState::GreedyFallback;
                self.used_fallback = true;

                match searcher.greedy() {
                    GreedyOutcome::Solved(assignment) => Some(assignment),
                    GreedyOutcome::Stuck(exam) => {
                        warn!(exam = %exam.id, "Greedy fallback found no slot");
                        self.clash_log
                            .push(format!("Could not schedule exam {}", exam.id));
                        None
                    }
                    GreedyOutcome::Cancelled => return self.cancelled(),
                }
            }
        };

        if let Some(placements) = solved.and_then(|a| to_placements(&a, &calendar)) {
            self.note_tight_slots(&placements, &calendar);
            self.placements = placements;
            self.clash_log.push(SUCCESS_MARKER);
            info!(
                placements = self.placements.len(),
                greedy = self.used_fallback,
                "Timetable generated"
            );
            return self.finish(EngineState::Solved);
        }

        self.clash_log.push(FAILURE_MARKER);
        DiagnosticReporter::new(
            &order,
            &session.rooms,
            &graph,
            &calendar,
            self.config.min_days_between_exams,
        )
        .explain(&mut self.clash_log);
        info!(exams = exams.len(), "No valid timetable found");
        self.finish(EngineState::Failed)
    }

    /// Add a note for every exam that overruns its slot once the changeover gap is counted
    fn note_tight_slots(&mut self, placements: &[Placement], calendar: &SlotCalendar) {
        let gap = i64::from(self.config.min_gap_minutes);
        for placement in placements {
            let Some(exam) = self.session.get_exam(&placement.exam_id) else {
                continue;
            };
            let length = calendar.slot_minutes(placement.date);
            let needed = i64::from(exam.duration) + gap;
            if needed > length {
                self.clash_log.push(format!(
                    "Note: Exam {} needs {} minutes plus a {gap} minute gap but slots on {} are {length} minutes long",
                    exam.id,
                    exam.duration,
                    placement.date_string()
                ));
            }
        }
    }

    fn cancelled(&mut self) -> bool {
        warn!("Scheduling cancelled");
        self.clash_log
            .push("Scheduling cancelled before a complete timetable was found");
        self.finish(EngineState::Cancelled)
    }

    fn finish(&mut self, state: EngineState) -> bool {
        if state != EngineState::Solved {
            self.placements.clear();
        }
        self.state = state;
        state == EngineState::Solved
    }
}

/// Exams ordered most-constrained first.
///
/// Sorted descending by (conflict degree, student count); ties keep input
/// order.
pub fn priority_order<'e>(exams: &'e [Exam], graph: &ConflictGraph) -> Vec<&'e Exam> {
    let mut order: Vec<&Exam> = exams.iter().collect();
    order.sort_by(|a, b| {
        let key = |e: &Exam| (graph.degree(&e.id), e.student_count());
        key(*b).cmp(&key(*a))
    });
    order
}

/// Resolve a complete assignment into placements sorted by date and start
fn to_placements(assignment: &Assignment<'_>, calendar: &SlotCalendar) -> Option<Vec<Placement>> {
    let mut placements = assignment
        .iter()
        .map(|booking| {
            let time = calendar.resolve_slot(booking.slot)?;
            Some(Placement {
                exam_id: booking.exam.id.clone(),
                subject: booking.exam.subject.clone(),
                room_id: booking.room.id.clone(),
                date: time.date,
                start: time.start,
                end: time.start + Duration::minutes(i64::from(booking.exam.duration)),
                student_ids: booking.exam.students.clone(),
                slot: booking.slot,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    placements.sort_by(|a, b| (a.date, a.start, a.slot).cmp(&(b.date, b.start, b.slot)));
    Some(placements)
}
