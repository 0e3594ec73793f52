//! # examplan-core
//!
//! Core domain model and traits for the examplan timetabling engine.
//!
//! This crate provides:
//! - Domain types: `Exam`, `Room`, `ExamSession`, `TimetableConfig`, `Placement`, `Timetable`
//! - The append-only `ClashLog` produced by every scheduling run
//! - Core traits: `Renderer`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use examplan_core::{Exam, ExamSession, Room, TimetableConfig};
//!
//! let session = ExamSession::new("Winter 2024")
//!     .exam(Exam::new("MATH1").subject("Mathematics").duration(120).students(["s1", "s2"]))
//!     .exam(Exam::new("PHYS1").subject("Physics").duration(90).students(["s2", "s3"]))
//!     .room(Room::new("R101", 30))
//!     .student("s1", "Ada")
//!     .student("s2", "Grace")
//!     .student("s3", "Alan");
//! assert!(session.validate().is_ok());
//!
//! let config = TimetableConfig::new(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
//!     .until(NaiveDate::from_ymd_opt(2024, 1, 19).unwrap())
//!     .exams_per_day(2);
//! assert!(config.validate().is_ok());
//! ```

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for an exam
pub type ExamId = String;

/// Unique identifier for a room
pub type RoomId = String;

/// Unique identifier for a student
pub type StudentId = String;

// ============================================================================
// Clock Times
// ============================================================================

/// `HH:MM` (de)serialization for times of day.
///
/// Use with `#[serde(with = "examplan_core::clock")]`. Deserialization also
/// accepts `HH:MM:SS`.
pub mod clock {
    use chrono::NaiveTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }

    /// Parse `HH:MM` (or `HH:MM:SS`)
    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

// ============================================================================
// Exam
// ============================================================================

/// A sitting that must be placed in exactly one slot and one room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    /// Unique identifier
    pub id: ExamId,
    /// Subject label shown on timetables
    pub subject: String,
    /// Length of the sitting
    #[serde(rename = "duration_minutes")]
    pub duration: u32,
    /// Students sitting this exam
    pub students: BTreeSet<StudentId>,
}

impl Exam {
    /// Create a new exam with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            subject: id.clone(),
            id,
            duration: 60,
            students: BTreeSet::new(),
        }
    }

    /// Set the subject label
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the duration in minutes
    pub fn duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    /// Enrol a single student
    pub fn student(mut self, student: impl Into<String>) -> Self {
        self.students.insert(student.into());
        self
    }

    /// Enrol several students
    pub fn students<I, S>(mut self, students: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.students.extend(students.into_iter().map(Into::into));
        self
    }

    /// Number of seats this exam needs
    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// Check whether two exams share at least one student
    pub fn shares_students_with(&self, other: &Exam) -> bool {
        !self.students.is_disjoint(&other.students)
    }
}

// ============================================================================
// Room
// ============================================================================

/// A room with a fixed number of seats
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: RoomId,
    /// Seating capacity
    pub capacity: u32,
}

impl Room {
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
        }
    }

    /// Check if an exam fits in this room
    pub fn fits(&self, exam: &Exam) -> bool {
        self.capacity as usize >= exam.student_count()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything a scheduling run needs besides its configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExamSession {
    /// Human-readable name (used as the default timetable name)
    #[serde(default)]
    pub name: String,
    /// Exams in caller order
    pub exams: Vec<Exam>,
    /// Rooms in caller order; the allocator scans them in this order
    pub rooms: Vec<Room>,
    /// Student roster: id -> display name
    #[serde(default)]
    pub students: BTreeMap<StudentId, String>,
}

impl ExamSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an exam
    pub fn exam(mut self, exam: Exam) -> Self {
        self.exams.push(exam);
        self
    }

    /// Add a room
    pub fn room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    /// Register a student with a display name
    pub fn student(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.students.insert(id.into(), name.into());
        self
    }

    /// Get an exam by ID
    pub fn get_exam(&self, id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    /// Display name for a student, falling back to the raw ID
    pub fn student_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.students.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Check the session can be handed to the engine.
    ///
    /// Rooms, exams and students are checked in that order, then per-item
    /// consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rooms.is_empty() {
            return Err(ConfigError::NoRooms);
        }
        if self.exams.is_empty() {
            return Err(ConfigError::NoExams);
        }
        if self.students.is_empty() {
            return Err(ConfigError::NoStudents);
        }

        let mut room_ids = HashSet::new();
        for room in &self.rooms {
            if !room_ids.insert(room.id.as_str()) {
                return Err(ConfigError::DuplicateRoom(room.id.clone()));
            }
            if room.capacity == 0 {
                return Err(ConfigError::ZeroCapacity(room.id.clone()));
            }
        }

        let mut exam_ids = HashSet::new();
        for exam in &self.exams {
            if !exam_ids.insert(exam.id.as_str()) {
                return Err(ConfigError::DuplicateExam(exam.id.clone()));
            }
            if exam.students.is_empty() {
                return Err(ConfigError::EmptyExam(exam.id.clone()));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// A window within a day, `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "clock")]
    pub start: NaiveTime,
    #[serde(with = "clock")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a window from `HH:MM` strings
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(clock::parse(start)?, clock::parse(end)?))
    }

    /// Length of the window in minutes (zero if inverted)
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.minutes() == 0
    }
}

fn default_daily_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn default_daily_end() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).unwrap()
}

const fn default_exams_per_day() -> u32 {
    3
}

const fn default_min_gap() -> u32 {
    15
}

const fn default_true() -> bool {
    true
}

const fn default_min_days() -> u32 {
    1
}

/// Length of the exam period when no end date is given
pub const DEFAULT_PERIOD_DAYS: i64 = 14;

/// Scheduling window and constraint settings for one run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// First day exams may be held
    pub start_date: NaiveDate,
    /// Last day exams may be held (defaults to start + 14 days)
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Default start of the daily exam window
    #[serde(default = "default_daily_start", with = "clock")]
    pub daily_start: NaiveTime,
    /// Default end of the daily exam window
    #[serde(default = "default_daily_end", with = "clock")]
    pub daily_end: NaiveTime,
    /// Number of slots per valid day
    #[serde(default = "default_exams_per_day")]
    pub max_exams_per_day: u32,
    /// Minimum changeover time after an exam, in minutes
    #[serde(default = "default_min_gap")]
    pub min_gap_minutes: u32,
    /// Skip Saturdays and Sundays
    #[serde(default = "default_true")]
    pub exclude_weekends: bool,
    /// Per-date replacement for the daily window
    #[serde(default)]
    pub custom_time_slots: BTreeMap<NaiveDate, TimeWindow>,
    /// Dates on which no exam may be held
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
    /// Minimum number of days between two exams sharing a student
    #[serde(default = "default_min_days")]
    pub min_days_between_exams: u32,
    /// Prefer the least-loaded dates when trying candidate slots
    #[serde(default)]
    pub spread_evenly: bool,
}

impl TimetableConfig {
    /// Create a configuration with the default window starting on `start_date`
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
            daily_start: default_daily_start(),
            daily_end: default_daily_end(),
            max_exams_per_day: default_exams_per_day(),
            min_gap_minutes: default_min_gap(),
            exclude_weekends: true,
            custom_time_slots: BTreeMap::new(),
            excluded_dates: BTreeSet::new(),
            min_days_between_exams: default_min_days(),
            spread_evenly: false,
        }
    }

    /// Set the last exam day
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set the default daily window
    pub fn daily_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.daily_start = start;
        self.daily_end = end;
        self
    }

    /// Set the number of slots per day
    pub fn exams_per_day(mut self, count: u32) -> Self {
        self.max_exams_per_day = count;
        self
    }

    /// Set the changeover time between sittings
    pub fn min_gap_minutes(mut self, minutes: u32) -> Self {
        self.min_gap_minutes = minutes;
        self
    }

    /// Enable or disable weekend exclusion
    pub fn exclude_weekends(mut self, exclude: bool) -> Self {
        self.exclude_weekends = exclude;
        self
    }

    /// Exclude a single date
    pub fn exclude_date(mut self, date: NaiveDate) -> Self {
        self.excluded_dates.insert(date);
        self
    }

    /// Override the daily window for one date
    pub fn custom_window(mut self, date: NaiveDate, window: TimeWindow) -> Self {
        self.custom_time_slots.insert(date, window);
        self
    }

    /// Set the minimum day gap between related exams
    pub fn min_days_between(mut self, days: u32) -> Self {
        self.min_days_between_exams = days;
        self
    }

    /// Enable or disable load spreading across dates
    pub fn spread_evenly(mut self, spread: bool) -> Self {
        self.spread_evenly = spread;
        self
    }

    /// Last exam day, resolving the default period length
    pub fn last_day(&self) -> NaiveDate {
        self.end_date
            .unwrap_or_else(|| self.start_date + Duration::days(DEFAULT_PERIOD_DAYS))
    }

    /// Default daily window
    pub fn daily_window_range(&self) -> TimeWindow {
        TimeWindow::new(self.daily_start, self.daily_end)
    }

    /// Check the settings describe a usable calendar
    pub fn validate(&self) -> Result<(), ConfigError> {
        let end = self.last_day();
        if end < self.start_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end,
            });
        }
        if self.daily_window_range().is_empty() {
            return Err(ConfigError::EmptyWindow {
                start: self.daily_start,
                end: self.daily_end,
            });
        }
        if self.max_exams_per_day == 0 {
            return Err(ConfigError::ZeroExamsPerDay);
        }
        if let Some((date, _)) = self.custom_time_slots.iter().find(|(_, w)| w.is_empty()) {
            return Err(ConfigError::EmptyCustomWindow(*date));
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// One exam resolved to a date, time and room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub exam_id: ExamId,
    pub subject: String,
    pub room_id: RoomId,
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub start: NaiveTime,
    /// Start plus the exam's duration
    #[serde(with = "clock")]
    pub end: NaiveTime,
    pub student_ids: BTreeSet<StudentId>,
    /// Slot index this placement was resolved from
    #[serde(default)]
    pub slot: usize,
}

impl Placement {
    /// Check if a student sits this exam
    pub fn involves(&self, student: &str) -> bool {
        self.student_ids.contains(student)
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn start_string(&self) -> String {
        self.start.format(clock::FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(clock::FORMAT).to_string()
    }
}

/// A finished, named timetable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Placements ordered by date, then start time
    pub placements: Vec<Placement>,
}

impl Timetable {
    pub fn new(
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        placements: Vec<Placement>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            start_date,
            end_date,
            placements,
        }
    }

    /// Attach a description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the placement for an exam
    pub fn get(&self, exam_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.exam_id == exam_id)
    }

    /// Placements a student sits, in timetable order
    pub fn for_student(&self, student: &str) -> Vec<&Placement> {
        self.placements.iter().filter(|p| p.involves(student)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Ordered, append-only diagnostic record of a scheduling run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClashLog {
    entries: Vec<String>,
}

impl ClashLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Check if any entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.contains(needle))
    }

    /// Index of the first entry containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.contains(needle))
    }
}

impl fmt::Display for ClashLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering
pub trait Renderer {
    type Output;

    /// Render a timetable to the output format
    fn render(&self, timetable: &Timetable) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Invalid input, rejected before any scheduling starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No rooms provided")]
    NoRooms,

    #[error("No exams provided")]
    NoExams,

    #[error("No student names provided")]
    NoStudents,

    #[error("Exam {0} has no students")]
    EmptyExam(ExamId),

    #[error("Duplicate exam id: {0}")]
    DuplicateExam(ExamId),

    #[error("Duplicate room id: {0}")]
    DuplicateRoom(RoomId),

    #[error("Room {0} has zero capacity")]
    ZeroCapacity(RoomId),

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Daily window {start} - {end} contains no time")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },

    #[error("Custom time slot for {0} contains no time")]
    EmptyCustomWindow(NaiveDate),

    #[error("Max exams per day must be at least 1")]
    ZeroExamsPerDay,
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn session() -> ExamSession {
        ExamSession::new("Test")
            .exam(Exam::new("E1").students(["s1", "s2"]))
            .room(Room::new("R1", 10))
            .student("s1", "Ada")
            .student("s2", "Grace")
    }

    #[test]
    fn exam_builder_defaults_subject_to_id() {
        let exam = Exam::new("MATH1");
        assert_eq!(exam.subject, "MATH1");
        assert_eq!(exam.duration, 60);
        assert!(exam.students.is_empty());
    }

    #[test]
    fn exam_students_are_a_set() {
        let exam = Exam::new("E1").students(["s1", "s2"]).student("s1");
        assert_eq!(exam.student_count(), 2);
    }

    #[test]
    fn exams_sharing_students() {
        let a = Exam::new("A").students(["s1", "s2"]);
        let b = Exam::new("B").students(["s2", "s3"]);
        let c = Exam::new("C").students(["s4"]);
        assert!(a.shares_students_with(&b));
        assert!(b.shares_students_with(&a));
        assert!(!a.shares_students_with(&c));
    }

    #[test]
    fn room_fits_exam_at_exact_capacity() {
        let exam = Exam::new("E").students(["a", "b", "c"]);
        assert!(Room::new("R", 3).fits(&exam));
        assert!(!Room::new("R", 2).fits(&exam));
    }

    #[test]
    fn session_validation_order() {
        let empty = ExamSession::new("Empty");
        assert_eq!(empty.validate(), Err(ConfigError::NoRooms));

        let no_exams = ExamSession::new("x").room(Room::new("R1", 5));
        assert_eq!(no_exams.validate(), Err(ConfigError::NoExams));

        let no_students = ExamSession::new("x")
            .room(Room::new("R1", 5))
            .exam(Exam::new("E1").student("s1"));
        assert_eq!(no_students.validate(), Err(ConfigError::NoStudents));

        assert_eq!(session().validate(), Ok(()));
    }

    #[test]
    fn session_rejects_inconsistent_items() {
        let dup_exam = session().exam(Exam::new("E1").student("s1"));
        assert_eq!(dup_exam.validate(), Err(ConfigError::DuplicateExam("E1".into())));

        let dup_room = session().room(Room::new("R1", 3));
        assert_eq!(dup_room.validate(), Err(ConfigError::DuplicateRoom("R1".into())));

        let zero = session().room(Room::new("R0", 0));
        assert_eq!(zero.validate(), Err(ConfigError::ZeroCapacity("R0".into())));

        let empty_exam = session().exam(Exam::new("E2"));
        assert_eq!(empty_exam.validate(), Err(ConfigError::EmptyExam("E2".into())));
    }

    #[test]
    fn student_name_falls_back_to_id() {
        let s = session();
        assert_eq!(s.student_name("s1"), "Ada");
        assert_eq!(s.student_name("s9"), "s9");
    }

    #[test]
    fn config_defaults() {
        let config = TimetableConfig::new(date(2024, 1, 1));
        assert_eq!(config.last_day(), date(2024, 1, 15));
        assert_eq!(config.daily_start, time(9, 0));
        assert_eq!(config.daily_end, time(15, 30));
        assert_eq!(config.max_exams_per_day, 3);
        assert_eq!(config.min_gap_minutes, 15);
        assert!(config.exclude_weekends);
        assert_eq!(config.min_days_between_exams, 1);
        assert!(!config.spread_evenly);
        assert_eq!(config.daily_window_range().minutes(), 390);
    }

    #[test]
    fn config_validation() {
        let start = date(2024, 1, 10);
        assert!(TimetableConfig::new(start).validate().is_ok());

        let inverted = TimetableConfig::new(start).until(date(2024, 1, 9));
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidDateRange { .. })
        ));

        let single_day = TimetableConfig::new(start).until(start);
        assert!(single_day.validate().is_ok());

        let empty_window = TimetableConfig::new(start).daily_window(time(12, 0), time(12, 0));
        assert!(matches!(empty_window.validate(), Err(ConfigError::EmptyWindow { .. })));

        let zero = TimetableConfig::new(start).exams_per_day(0);
        assert_eq!(zero.validate(), Err(ConfigError::ZeroExamsPerDay));

        let bad_custom = TimetableConfig::new(start)
            .custom_window(date(2024, 1, 11), TimeWindow::new(time(14, 0), time(13, 0)));
        assert_eq!(
            bad_custom.validate(),
            Err(ConfigError::EmptyCustomWindow(date(2024, 1, 11)))
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "start_date": "2024-03-04",
            "end_date": "2024-03-15",
            "daily_start": "08:30",
            "excluded_dates": ["2024-03-08"],
            "custom_time_slots": { "2024-03-05": { "start": "13:00", "end": "17:00" } }
        }"#;
        let config: TimetableConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.start_date, date(2024, 3, 4));
        assert_eq!(config.last_day(), date(2024, 3, 15));
        assert_eq!(config.daily_start, time(8, 30));
        assert_eq!(config.daily_end, time(15, 30));
        assert_eq!(config.max_exams_per_day, 3);
        assert!(config.excluded_dates.contains(&date(2024, 3, 8)));
        assert_eq!(
            config.custom_time_slots.get(&date(2024, 3, 5)),
            Some(&TimeWindow::new(time(13, 0), time(17, 0)))
        );
    }

    #[test]
    fn clock_rejects_garbage() {
        assert_eq!(clock::parse("9:05"), Some(time(9, 5)));
        assert_eq!(clock::parse("17:45:00"), Some(time(17, 45)));
        assert_eq!(clock::parse("noon"), None);
        assert!(TimeWindow::parse("10:00", "later").is_none());
    }

    #[test]
    fn placement_serializes_times_as_hh_mm() {
        let placement = Placement {
            exam_id: "E1".into(),
            subject: "Maths".into(),
            room_id: "R101".into(),
            date: date(2023, 12, 1),
            start: time(9, 0),
            end: time(11, 0),
            student_ids: ["S1".to_string()].into_iter().collect(),
            slot: 0,
        };
        let json = serde_json::to_value(&placement).unwrap();
        assert_eq!(json["date"], "2023-12-01");
        assert_eq!(json["start"], "09:00");
        assert_eq!(json["end"], "11:00");
        assert_eq!(placement.start_string(), "09:00");
        assert_eq!(placement.date_string(), "2023-12-01");
    }

    #[test]
    fn timetable_for_student() {
        let mk = |id: &str, students: &[&str]| Placement {
            exam_id: id.into(),
            subject: id.into(),
            room_id: "R1".into(),
            date: date(2024, 1, 1),
            start: time(9, 0),
            end: time(10, 0),
            student_ids: students.iter().map(|s| s.to_string()).collect(),
            slot: 0,
        };
        let timetable = Timetable::new(
            "T",
            date(2024, 1, 1),
            date(2024, 1, 5),
            vec![mk("A", &["s1", "s2"]), mk("B", &["s2"]), mk("C", &["s3"])],
        );

        let ids: Vec<_> = timetable.for_student("s2").iter().map(|p| p.exam_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(timetable.for_student("nobody").is_empty());
        assert!(timetable.get("C").is_some());
    }

    #[test]
    fn clash_log_display_and_search() {
        let mut log = ClashLog::new();
        assert!(log.is_empty());
        log.push("IMPOSSIBLE: Not enough time slots");
        log.push(format!("  - Shortfall: {} slots", 5));

        assert_eq!(log.len(), 2);
        assert!(log.contains("Shortfall: 5"));
        assert_eq!(log.position("Shortfall"), Some(1));
        assert_eq!(log.last(), Some("  - Shortfall: 5 slots"));
        assert_eq!(
            log.to_string(),
            "IMPOSSIBLE: Not enough time slots\n  - Shortfall: 5 slots"
        );
    }
}
