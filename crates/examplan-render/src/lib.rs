//! # examplan-render
//!
//! Rendering backends for examplan timetables.
//!
//! This crate provides:
//! - Fixed-width text tables for terminals and plain-text reports
//! - Excel workbooks with the timetable and, optionally, the clash log
//! - Per-student filtering shared by both backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use examplan_core::Renderer;
//! use examplan_render::{ExcelRenderer, TextRenderer};
//!
//! let text = TextRenderer::new().render(&timetable)?;
//! let mine = TextRenderer::new().for_student("s1", "Ada").render(&timetable)?;
//!
//! let xlsx_bytes = ExcelRenderer::new().with_clash_log(log).render(&timetable)?;
//! std::fs::write("timetable.xlsx", xlsx_bytes)?;
//! ```

pub mod excel;

pub use excel::ExcelRenderer;

use examplan_core::{Placement, RenderError, Renderer, StudentId, Timetable};

/// Column headings shared by every backend
pub const COLUMNS: [&str; 6] = ["Exam ID", "Subject", "Room", "Date", "Start", "End"];

/// Shown instead of a table when a student sits no exams
pub const NO_EXAMS_FOR_STUDENT: &str = "No exams assigned to this student.";

/// Default document title
pub const DEFAULT_TITLE: &str = "Exam Timetable";

/// Restrict a rendering to one student's exams
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentFilter {
    pub id: StudentId,
    /// Display name used in the title
    pub name: String,
}

impl StudentFilter {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Filter that shows the raw ID as the name
    pub fn by_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

/// Placements to render, honoring an optional student filter
pub fn visible_rows<'t>(timetable: &'t Timetable, student: Option<&StudentFilter>) -> Vec<&'t Placement> {
    match student {
        Some(filter) => timetable.for_student(&filter.id),
        None => timetable.placements.iter().collect(),
    }
}

/// Title line, with the student's name appended when filtering
pub fn title_for(title: &str, student: Option<&StudentFilter>) -> String {
    match student {
        Some(filter) => format!("{title} - {}", filter.name),
        None => title.to_string(),
    }
}

/// Cells of one row, in `COLUMNS` order
pub fn row_cells(placement: &Placement) -> [String; 6] {
    [
        placement.exam_id.clone(),
        placement.subject.clone(),
        placement.room_id.clone(),
        placement.date_string(),
        placement.start_string(),
        placement.end_string(),
    ]
}

// ============================================================================
// Text
// ============================================================================

/// Fixed-width text table renderer
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Document title
    pub title: String,
    /// Only show this student's exams
    pub student: Option<StudentFilter>,
    /// Print the timetable name, range and description above the table
    pub show_summary: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            student: None,
            show_summary: true,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Only render exams sat by `id`
    pub fn for_student(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.student = Some(StudentFilter::new(id, name));
        self
    }

    /// Apply a prepared filter
    pub fn filter(mut self, student: Option<StudentFilter>) -> Self {
        self.student = student;
        self
    }

    /// Omit the summary line
    pub fn no_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    fn render_table(&self, rows: &[&Placement], out: &mut String) {
        let cells: Vec<[String; 6]> = rows.iter().map(|p| row_cells(p)).collect();

        let mut widths = COLUMNS.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |values: &[&str]| -> String {
            values
                .iter()
                .zip(widths)
                .map(|(value, width)| format!("{value:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        out.push_str(&line(&COLUMNS));
        out.push('\n');
        let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&line(&rules.iter().map(String::as_str).collect::<Vec<_>>()));
        out.push('\n');
        for row in &cells {
            out.push_str(&line(&row.iter().map(String::as_str).collect::<Vec<_>>()));
            out.push('\n');
        }
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, timetable: &Timetable) -> Result<String, RenderError> {
        if self.student.is_none() && timetable.is_empty() {
            return Err(RenderError::InvalidData("No exams to render".into()));
        }

        let title = title_for(&self.title, self.student.as_ref());
        let mut out = String::new();
        out.push_str(&title);
        out.push('\n');
        out.push_str(&"=".repeat(title.chars().count()));
        out.push('\n');

        if self.show_summary {
            out.push_str(&format!(
                "{} ({} to {})\n",
                timetable.name,
                timetable.start_date.format("%Y-%m-%d"),
                timetable.end_date.format("%Y-%m-%d")
            ));
            if let Some(description) = &timetable.description {
                out.push_str(description);
                out.push('\n');
            }
        }
        out.push('\n');

        let rows = visible_rows(timetable, self.student.as_ref());
        if rows.is_empty() {
            out.push_str(NO_EXAMS_FOR_STUDENT);
            out.push('\n');
        } else {
            self.render_table(&rows, &mut out);
        }

        Ok(out)
    }
}
