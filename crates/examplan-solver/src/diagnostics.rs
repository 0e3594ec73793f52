//! Failure diagnostics
//!
//! Explains a failed run in the clash log. The reporter only reads the run's
//! inputs; it never touches an assignment or the configuration.

use crate::calendar::SlotCalendar;
use crate::conflict::ConflictGraph;
use examplan_core::{ClashLog, Exam, Room};

/// Items listed per violation before the remainder is summarized
const LISTED: usize = 3;

pub struct DiagnosticReporter<'a> {
    exams: &'a [&'a Exam],
    rooms: &'a [Room],
    graph: &'a ConflictGraph,
    calendar: &'a SlotCalendar,
    min_days: u32,
}

impl<'a> DiagnosticReporter<'a> {
    pub fn new(
        exams: &'a [&'a Exam],
        rooms: &'a [Room],
        graph: &'a ConflictGraph,
        calendar: &'a SlotCalendar,
        min_days: u32,
    ) -> Self {
        Self {
            exams,
            rooms,
            graph,
            calendar,
            min_days,
        }
    }

    /// Report a period that cannot hold one slot per exam
    pub fn shortfall(&self, log: &mut ClashLog) {
        let exams = self.exams.len();
        let slots = self.calendar.total_slots();
        let days = self.calendar.available_days();
        let per_day = self.calendar.exams_per_day();

        log.push("IMPOSSIBLE: Not enough time slots");
        log.push(format!("  - Total exams to schedule: {exams}"));
        log.push(format!("  - Available time slots: {slots}"));
        log.push(format!("  - Shortfall: {} slots", exams.saturating_sub(slots)));

        log.push("Reasons for insufficient slots:");
        log.push(format!("  - Calendar period: {} days", self.calendar.period_days()));
        log.push(format!(
            "  - Available days (after weekends/exclusions): {days} days"
        ));
        log.push(format!("  - Max exams per day: {per_day}"));
        log.push(format!(
            "  - Calculation: {days} days x {per_day} exams/day = {slots} slots"
        ));

        log.push("Suggestions to fix:");
        log.push("  1. Increase the exam period (extend end date)");
        log.push("  2. Increase max exams per day");
        log.push("  3. Remove excluded dates");
        log.push("  4. Enable weekends if possible (set exclude_weekends = false)");
    }

    /// Explain why no schedule was found
    pub fn explain(&self, log: &mut ClashLog) {
        log.push("Diagnostic Analysis:");

        let Some(max_capacity) = self.rooms.iter().map(|r| r.capacity).max() else {
            log.push("  - CRITICAL: No rooms available for scheduling");
            return;
        };

        self.check_capacity(log, max_capacity);
        self.check_slots(log);
        self.check_conflicts(log);
        if self.min_days > 1 {
            self.check_gap(log);
        }

        log.push("To resolve, try:");
        log.push("  - Extend the exam period (increase end date)");
        log.push("  - Increase max exams per day");
        log.push("  - Remove excluded dates");
        log.push("  - Enable weekends");
        log.push("  - Reduce minimum gap between related exams");
    }

    fn check_capacity(&self, log: &mut ClashLog, max_capacity: u32) {
        log.push(format!(
            "  - Rooms available: {} (max capacity: {max_capacity} students)",
            self.rooms.len()
        ));

        let oversized: Vec<&Exam> = self
            .exams
            .iter()
            .copied()
            .filter(|e| e.student_count() > max_capacity as usize)
            .collect();
        if oversized.is_empty() {
            return;
        }

        log.push(format!(
            "  - Room capacity violations: {} exam(s) exceed max capacity",
            oversized.len()
        ));
        for exam in oversized.iter().take(LISTED) {
            log.push(format!(
                "    * Exam {}: {} students (max room: {max_capacity})",
                exam.id,
                exam.student_count()
            ));
        }
        push_remainder(log, oversized.len());
    }

    fn check_slots(&self, log: &mut ClashLog) {
        let slots = self.calendar.total_slots();
        let exams = self.exams.len();

        log.push(format!("  - Time slots (current settings): {slots}"));
        log.push(format!("  - Exams to schedule: {exams}"));
        if slots < exams {
            log.push(format!(
                "  - TIME CONSTRAINT VIOLATION: Need {exams} slots but only have {slots}"
            ));
        }
    }

    fn check_conflicts(&self, log: &mut ClashLog) {
        let per_day = self.calendar.exams_per_day();
        let constrained: Vec<(&str, usize)> = self
            .exams
            .iter()
            .map(|e| (e.id.as_str(), self.graph.degree(&e.id)))
            .filter(|(_, degree)| *degree >= per_day)
            .collect();
        if constrained.is_empty() {
            return;
        }

        log.push(format!(
            "  - Exam conflict violations: {} exam(s) over-constrained",
            constrained.len()
        ));
        for (id, degree) in constrained.iter().take(LISTED) {
            log.push(format!(
                "    * Exam {id}: {degree} conflicts, but only {per_day} slots/day allowed"
            ));
        }
        push_remainder(log, constrained.len());
    }

    fn check_gap(&self, log: &mut ClashLog) {
        log.push(format!(
            "  - Minimum gap constraint: {} days between related exams",
            self.min_days
        ));

        // Days between the first and last day of the period
        let available = self.calendar.period_days() - 1;
        let gap = i64::from(self.min_days);
        let tight = self.exams.iter().find_map(|exam| {
            let degree = self.graph.degree(&exam.id);
            let needed = gap * degree as i64;
            (needed > available).then_some((exam, degree, needed))
        });

        if let Some((exam, degree, needed)) = tight {
            log.push(format!(
                "    * Exam {} ({degree} related exams): needs {needed} days but only {available} days available",
                exam.id
            ));
        }
    }
}

fn push_remainder(log: &mut ClashLog, total: usize) {
    if total > LISTED {
        log.push(format!("    * ... and {} more exams", total - LISTED));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use examplan_core::TimetableConfig;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Monday 2024-01-01 to Friday 2024-01-05, one exam a day
    fn week() -> TimetableConfig {
        TimetableConfig::new(date(2024, 1, 1))
            .until(date(2024, 1, 5))
            .exams_per_day(1)
    }

    fn disjoint_exams(count: usize, size: usize) -> Vec<Exam> {
        (0..count)
            .map(|i| Exam::new(format!("E{i}")).students((0..size).map(|s| format!("s{i}-{s}"))))
            .collect()
    }

    #[test]
    fn shortfall_report_lines() {
        let exams = disjoint_exams(10, 2);
        let order: Vec<&Exam> = exams.iter().collect();
        let rooms = vec![Room::new("R1", 5)];
        let graph = ConflictGraph::build(&exams);
        let calendar = SlotCalendar::new(&week());

        let mut log = ClashLog::new();
        DiagnosticReporter::new(&order, &rooms, &graph, &calendar, 1).shortfall(&mut log);

        assert_eq!(
            &log.entries()[..9],
            &[
                "IMPOSSIBLE: Not enough time slots",
                "  - Total exams to schedule: 10",
                "  - Available time slots: 5",
                "  - Shortfall: 5 slots",
                "Reasons for insufficient slots:",
                "  - Calendar period: 5 days",
                "  - Available days (after weekends/exclusions): 5 days",
                "  - Max exams per day: 1",
                "  - Calculation: 5 days x 1 exams/day = 5 slots",
            ]
        );
        assert_eq!(log.position("Suggestions to fix:"), Some(9));
        assert_eq!(log.len(), 14);
    }

    #[test]
    fn no_rooms_is_critical_and_final() {
        let exams = disjoint_exams(2, 1);
        let order: Vec<&Exam> = exams.iter().collect();
        let graph = ConflictGraph::build(&exams);
        let calendar = SlotCalendar::new(&week());

        let mut log = ClashLog::new();
        DiagnosticReporter::new(&order, &[], &graph, &calendar, 1).explain(&mut log);

        assert_eq!(
            log.entries(),
            &[
                "Diagnostic Analysis:",
                "  - CRITICAL: No rooms available for scheduling",
            ]
        );
    }

    #[test]
    fn oversized_exams_are_listed_up_to_three() {
        let exams = disjoint_exams(5, 20);
        let order: Vec<&Exam> = exams.iter().collect();
        let rooms = vec![Room::new("R1", 10)];
        let graph = ConflictGraph::build(&exams);
        let calendar = SlotCalendar::new(&week());

        let mut log = ClashLog::new();
        DiagnosticReporter::new(&order, &rooms, &graph, &calendar, 1).explain(&mut log);

        assert!(log.contains("  - Rooms available: 1 (max capacity: 10 students)"));
        assert!(log.contains("5 exam(s) exceed max capacity"));
        assert!(log.contains("    * Exam E0: 20 students (max room: 10)"));
        assert!(log.contains("    * Exam E2: 20 students (max room: 10)"));
        assert!(!log.contains("Exam E3:"));
        assert!(log.contains("    * ... and 2 more exams"));
        assert!(!log.contains("TIME CONSTRAINT VIOLATION"));
        assert_eq!(log.last(), Some("  - Reduce minimum gap between related exams"));
    }

    #[test]
    fn over_constrained_exams_and_slot_deficit() {
        // Six exams sharing one student, one slot a day for a week
        let exams: Vec<Exam> = (0..6)
            .map(|i| Exam::new(format!("E{i}")).students(["shared".to_string(), format!("own{i}")]))
            .collect();
        let order: Vec<&Exam> = exams.iter().collect();
        let rooms = vec![Room::new("R1", 10)];
        let graph = ConflictGraph::build(&exams);
        let calendar = SlotCalendar::new(&week());

        let mut log = ClashLog::new();
        DiagnosticReporter::new(&order, &rooms, &graph, &calendar, 1).explain(&mut log);

        assert!(log.contains("  - Time slots (current settings): 5"));
        assert!(log.contains("  - TIME CONSTRAINT VIOLATION: Need 6 slots but only have 5"));
        assert!(log.contains("  - Exam conflict violations: 6 exam(s) over-constrained"));
        assert!(log.contains("    * Exam E0: 5 conflicts, but only 1 slots/day allowed"));
        assert!(log.contains("    * ... and 3 more exams"));
        assert!(!log.contains("Minimum gap constraint"));
    }

    #[test]
    fn gap_check_reports_first_tight_exam() {
        let exams = vec![
            Exam::new("loner").student("x"),
            Exam::new("hub").students(["a", "b", "c"]),
            Exam::new("A").student("a"),
            Exam::new("B").student("b"),
            Exam::new("C").student("c"),
        ];
        let order: Vec<&Exam> = exams.iter().collect();
        let rooms = vec![Room::new("R1", 10)];
        let graph = ConflictGraph::build(&exams);
        let calendar = SlotCalendar::new(&week());

        let mut log = ClashLog::new();
        DiagnosticReporter::new(&order, &rooms, &graph, &calendar, 2).explain(&mut log);

        assert!(log.contains("  - Minimum gap constraint: 2 days between related exams"));
        assert!(log.contains(
            "    * Exam hub (3 related exams): needs 6 days but only 4 days available"
        ));
        assert!(!log.contains("Exam A ("));
    }
}
