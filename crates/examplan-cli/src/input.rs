//! Loading sessions and run configuration (TOML) from disk
//!
//! A session is either one JSON document or three CSV tables:
//!
//! ```text
//! rooms.csv     room_id,capacity
//! students.csv  student_id,full_name
//! exams.csv     exam_id,subject,duration_minutes,student_ids
//! ```
//!
//! `student_ids` lists the students sitting an exam separated by `;`.

use anyhow::{bail, Context, Result};
use chrono::Local;
use examplan_core::{Exam, ExamSession, Room, TimetableConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a session file
pub fn load_session(path: &Path) -> Result<ExamSession> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;
    let session = parse_session(&raw)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
    debug!(
        exams = session.exams.len(),
        rooms = session.rooms.len(),
        students = session.students.len(),
        "Loaded session"
    );
    Ok(session)
}

pub fn parse_session(raw: &str) -> Result<ExamSession> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    room_id: String,
    capacity: u32,
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    student_id: String,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ExamRow {
    exam_id: String,
    subject: String,
    duration_minutes: u32,
    #[serde(default)]
    student_ids: String,
}

/// Build a session from room, student and exam tables.
///
/// The session is named after the exams file.
pub fn load_csv_session(rooms: &Path, students: &Path, exams: &Path) -> Result<ExamSession> {
    let name = exams
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut session = ExamSession::new(name);

    let rows: Vec<RoomRow> = read_rows(rooms, "rooms")?;
    for row in rows {
        session = session.room(Room::new(row.room_id, row.capacity));
    }

    let rows: Vec<StudentRow> = read_rows(students, "students")?;
    for row in rows {
        session = session.student(row.student_id, row.full_name);
    }

    let rows: Vec<ExamRow> = read_rows(exams, "exams")?;
    for row in rows {
        let enrolled: Vec<&str> = row
            .student_ids
            .split(';')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();
        session = session.exam(
            Exam::new(row.exam_id)
                .subject(row.subject)
                .duration(row.duration_minutes)
                .students(enrolled),
        );
    }

    debug!(
        exams = session.exams.len(),
        rooms = session.rooms.len(),
        students = session.students.len(),
        "Loaded CSV session"
    );
    Ok(session)
}

/// Read every row of a headed CSV file, failing on an empty table
fn read_rows<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("Failed to parse {what} file: {}", path.display()))?;
    if rows.is_empty() {
        bail!("No {what} found in {}", path.display());
    }
    Ok(rows)
}

/// Read a configuration file, or start today with defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<TimetableConfig> {
    let Some(path) = path else {
        let today = Local::now().date_naive();
        debug!(%today, "No configuration file, using defaults");
        return Ok(TimetableConfig::new(today));
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<TimetableConfig> {
    Ok(toml::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use examplan_core::TimeWindow;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn config_from_toml() {
        let config = parse_config(
            r#"
start_date = "2024-01-08"
end_date = "2024-01-19"
daily_start = "08:30"
daily_end = "16:00"
max_exams_per_day = 2
excluded_dates = ["2024-01-12"]
min_days_between_exams = 2
spread_evenly = true

[custom_time_slots."2024-01-10"]
start = "13:00"
end = "17:00"
"#,
        )
        .unwrap();

        assert_eq!(config.start_date, date(2024, 1, 8));
        assert_eq!(config.last_day(), date(2024, 1, 19));
        assert_eq!(config.daily_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.max_exams_per_day, 2);
        assert_eq!(config.min_gap_minutes, 15);
        assert!(config.exclude_weekends);
        assert!(config.excluded_dates.contains(&date(2024, 1, 12)));
        assert_eq!(config.min_days_between_exams, 2);
        assert!(config.spread_evenly);
        assert_eq!(
            config.custom_time_slots.get(&date(2024, 1, 10)),
            TimeWindow::parse("13:00", "17:00").as_ref()
        );
    }

    #[test]
    fn config_requires_a_start_date() {
        assert!(parse_config("max_exams_per_day = 2").is_err());
    }

    #[test]
    fn missing_config_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.max_exams_per_day, 3);
        assert_eq!(config.min_days_between_exams, 1);
    }

    #[test]
    fn session_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "Winter",
                "exams": [
                    {{ "id": "E1", "subject": "Maths", "duration_minutes": 120, "students": ["s1", "s2"] }}
                ],
                "rooms": [{{ "id": "R1", "capacity": 30 }}],
                "students": {{ "s1": "Ada", "s2": "Grace" }}
            }}"#
        )
        .unwrap();

        let session = load_session(file.path()).unwrap();
        assert_eq!(session.name, "Winter");
        assert_eq!(session.exams[0].duration, 120);
        assert_eq!(session.exams[0].student_count(), 2);
        assert_eq!(session.rooms[0].capacity, 30);
        assert_eq!(session.student_name("s2"), "Grace");
    }

    struct CsvTables {
        dir: tempfile::TempDir,
    }

    impl CsvTables {
        fn new(rooms: &str, students: &str, exams: &str) -> Self {
            let dir = tempfile::TempDir::new().unwrap();
            fs::write(dir.path().join("rooms.csv"), rooms).unwrap();
            fs::write(dir.path().join("students.csv"), students).unwrap();
            fs::write(dir.path().join("winter.csv"), exams).unwrap();
            Self { dir }
        }

        fn load(&self) -> Result<ExamSession> {
            let dir = self.dir.path();
            load_csv_session(&dir.join("rooms.csv"), &dir.join("students.csv"), &dir.join("winter.csv"))
        }
    }

    #[test]
    fn session_from_csv_tables() {
        let tables = CsvTables::new(
            "room_id,capacity\nR1,30\nR2, 12\n",
            "student_id,full_name\ns1,Ada Lovelace\ns2,Grace Hopper\ns3,Alan Turing\n",
            "exam_id,subject,duration_minutes,student_ids\n\
             E1,Maths,120,s1;s2\n\
             E2,Physics,90,s2; s3;\n\
             E3,Latin,60,\n",
        );
        let session = tables.load().unwrap();

        assert_eq!(session.name, "winter");
        assert_eq!(session.rooms.len(), 2);
        assert_eq!(session.rooms[1].capacity, 12);
        assert_eq!(session.student_name("s1"), "Ada Lovelace");
        assert_eq!(session.exams.len(), 3);
        assert_eq!(session.exams[0].duration, 120);
        assert_eq!(session.exams[0].subject, "Maths");
        let physics: Vec<&str> = session.exams[1].students.iter().map(String::as_str).collect();
        assert_eq!(physics, vec!["s2", "s3"]);
        assert_eq!(session.exams[2].student_count(), 0);
    }

    #[test]
    fn empty_csv_table_is_reported_per_file() {
        let tables = CsvTables::new(
            "room_id,capacity\n",
            "student_id,full_name\ns1,Ada\n",
            "exam_id,subject,duration_minutes,student_ids\nE1,Maths,60,s1\n",
        );
        let err = tables.load().unwrap_err().to_string();
        assert!(err.starts_with("No rooms found in "), "{err}");
        assert!(err.ends_with("rooms.csv"), "{err}");
    }

    #[test]
    fn malformed_csv_row_names_the_file() {
        let tables = CsvTables::new(
            "room_id,capacity\nR1,30\n",
            "student_id,full_name\ns1,Ada\n",
            "exam_id,subject,duration_minutes,student_ids\nE1,Maths,two hours,s1\n",
        );
        let err = tables.load().unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse exams file: "), "{err}");
        assert!(err.to_string().ends_with("winter.csv"), "{err}");
    }

    #[test]
    fn missing_csv_file_names_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_csv_session(
            &dir.path().join("rooms.csv"),
            &dir.path().join("students.csv"),
            &dir.path().join("exams.csv"),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read rooms file: "), "{err}");
    }

    #[test]
    fn unreadable_session_names_the_file() {
        let err = load_session(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/session.json"));
    }
}
