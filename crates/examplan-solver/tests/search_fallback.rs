//! Integration tests for the iteration ceiling, the greedy fallback, the
//! daily slot adjustment and cancellation

use chrono::NaiveDate;
use examplan_core::{Exam, ExamSession, Room, TimetableConfig};
use examplan_solver::{
    CancellationToken, EngineState, SearchLimits, TimetableEngine, FAILURE_MARKER, SUCCESS_MARKER,
};
use pretty_assertions::assert_eq;

const TIMEOUT: &str = "Scheduling timed out - trying greedy approach instead";

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// `size` exams that all share one student
fn clique(size: usize) -> ExamSession {
    let mut session = ExamSession::new("Clique")
        .room(Room::new("R1", 10))
        .student("shared", "Everyone");
    for i in 0..size {
        session = session
            .exam(Exam::new(format!("C{i}")).students(["shared".to_string(), format!("own{i}")]))
            .student(format!("own{i}"), format!("Student {i}"));
    }
    session
}

/// Monday 2024-01-01 to Friday 2024-01-05
fn week() -> TimetableConfig {
    TimetableConfig::new(date(2024, 1, 1))
        .until(date(2024, 1, 5))
        .exams_per_day(3)
}

#[test]
fn daily_limit_is_raised_for_heavily_connected_exams() {
    let session = clique(3);
    let mut engine = TimetableEngine::new(&session, week().exams_per_day(2)).unwrap();

    assert!(engine.generate());
    assert_eq!(engine.effective_exams_per_day(), 3);
    assert_eq!(
        engine.clash_log().entries()[0],
        "Adjusted max exams per day to 3 to handle conflicts"
    );

    let slots: Vec<usize> = engine.placements().iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![0, 3, 6]);
    // The configuration itself is left alone
    assert_eq!(engine.config().max_exams_per_day, 2);
}

#[test]
fn zero_ceiling_hands_over_to_greedy() {
    let session = clique(5);
    let mut engine = TimetableEngine::new(&session, week())
        .unwrap()
        .with_limits(SearchLimits::new().max_iterations(0));

    assert!(engine.generate());
    assert!(engine.used_fallback());
    assert_eq!(engine.state(), EngineState::Solved);
    assert_eq!(
        engine.clash_log().entries(),
        &[
            "Adjusted max exams per day to 5 to handle conflicts",
            TIMEOUT,
            SUCCESS_MARKER,
        ]
    );

    let dates: Vec<String> = engine.placements().iter().map(|p| p.date_string()).collect();
    assert_eq!(
        dates,
        vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
    );
}

#[test]
fn greedy_and_backtracking_agree_on_easy_input() {
    let session = clique(5);

    let mut search = TimetableEngine::new(&session, week()).unwrap();
    let mut greedy = TimetableEngine::new(&session, week())
        .unwrap()
        .with_limits(SearchLimits::new().max_iterations(0));

    assert!(search.generate());
    assert!(greedy.generate());
    assert!(!search.used_fallback());
    assert_eq!(search.placements(), greedy.placements());
}

#[test]
fn hard_instance_times_out_and_fails_cleanly() {
    // Six mutually clashing exams cannot spread over five days
    let session = clique(6);
    let mut engine = TimetableEngine::new(&session, week()).unwrap();

    assert!(!engine.generate());
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(engine.used_fallback());
    assert!(engine.placements().is_empty());

    let log = engine.clash_log();
    let timeout = log.position(TIMEOUT).unwrap();
    let stuck = log.position("Could not schedule exam C5").unwrap();
    let failure = log.position(FAILURE_MARKER).unwrap();
    assert!(timeout < stuck && stuck < failure);
    assert!(log.contains("Diagnostic Analysis:"));
}

#[test]
fn small_window_still_finds_a_schedule() {
    let session = clique(5);
    let mut engine = TimetableEngine::new(&session, week())
        .unwrap()
        .with_limits(SearchLimits::new().window(6, 5));

    assert!(engine.generate(), "{}", engine.clash_log());
    assert_eq!(engine.placements().len(), 5);
}

#[test]
fn cancelled_run_is_not_reported_as_infeasible() {
    let session = clique(5);
    let token = CancellationToken::new();
    let mut engine = TimetableEngine::new(&session, week())
        .unwrap()
        .with_cancellation(token.clone());

    token.cancel();
    assert!(!engine.generate());
    assert_eq!(engine.state(), EngineState::Cancelled);
    assert!(engine.placements().is_empty());

    let log = engine.clash_log();
    assert!(log.contains("Scheduling cancelled"));
    assert!(!log.contains(FAILURE_MARKER));
    assert!(!log.contains("Diagnostic Analysis:"));
}

#[test]
fn cancellation_wins_over_an_exhausted_ceiling() {
    let session = clique(5);
    let token = CancellationToken::new();
    token.cancel();
    let mut engine = TimetableEngine::new(&session, week())
        .unwrap()
        .with_limits(SearchLimits::new().max_iterations(0))
        .with_cancellation(token);

    assert!(!engine.generate());
    assert_eq!(engine.state(), EngineState::Cancelled);
}
