//! Saved timetables
//!
//! The archive is a single JSON document:
//!
//! ```json
//! {
//!   "next_id": 3,
//!   "timetables": [
//!     { "id": 1, "created": "2024-01-02T10:15:00", "name": "Winter", "start_date": "2024-01-01", ... }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use examplan_core::{StudentId, Timetable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive location when neither `--archive` nor `EXAMPLAN_ARCHIVE` is set
pub const DEFAULT_ARCHIVE: &str = "examplan-archive.json";

/// A timetable as stored in the archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTimetable {
    pub id: u64,
    pub created: NaiveDateTime,
    #[serde(flatten)]
    pub timetable: Timetable,
    /// Roster at save time, for titles of per-student views
    #[serde(default)]
    pub students: BTreeMap<StudentId, String>,
}

impl SavedTimetable {
    pub fn student_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.students.get(id).map(String::as_str).unwrap_or(id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveFile {
    next_id: u64,
    timetables: Vec<SavedTimetable>,
}

impl Default for ArchiveFile {
    fn default() -> Self {
        Self {
            next_id: 1,
            timetables: Vec::new(),
        }
    }
}

/// File-backed store of saved timetables
#[derive(Debug)]
pub struct TimetableArchive {
    path: PathBuf,
    file: ArchiveFile,
}

impl TimetableArchive {
    /// Open an archive, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read archive: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt archive: {}", path.display()))?
        } else {
            ArchiveFile::default()
        };
        debug!(path = %path.display(), saved = file.timetables.len(), "Opened archive");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a timetable now and return its ID
    pub fn save(&mut self, timetable: &Timetable, students: &BTreeMap<StudentId, String>) -> Result<u64> {
        self.save_at(timetable, students, Local::now().naive_local())
    }

    /// Save a timetable with an explicit creation time
    pub fn save_at(
        &mut self,
        timetable: &Timetable,
        students: &BTreeMap<StudentId, String>,
        created: NaiveDateTime,
    ) -> Result<u64> {
        let id = self.file.next_id.max(1);
        self.file.next_id = id + 1;
        // Only keep names of students who appear in the timetable
        let students = students
            .iter()
            .filter(|(sid, _)| timetable.placements.iter().any(|p| p.involves(sid)))
            .map(|(sid, name)| (sid.clone(), name.clone()))
            .collect();
        self.file.timetables.push(SavedTimetable {
            id,
            created,
            timetable: timetable.clone(),
            students,
        });
        self.flush()?;
        debug!(id, name = %timetable.name, "Saved timetable");
        Ok(id)
    }

    /// Saved timetables, newest first
    pub fn list(&self) -> Vec<&SavedTimetable> {
        let mut saved: Vec<&SavedTimetable> = self.file.timetables.iter().collect();
        saved.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        saved
    }

    pub fn load(&self, id: u64) -> Option<&SavedTimetable> {
        self.file.timetables.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.file.timetables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.timetables.is_empty()
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write archive: {}", self.path.display()))
    }
}
