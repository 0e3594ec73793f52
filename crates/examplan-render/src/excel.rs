//! Excel timetable renderer
//!
//! Generates XLSX workbooks:
//! - Timetable: title row, then one row per placement
//! - Clash Log: one row per log entry (optional)
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Timetable
//! | Exam Timetable - Ada                                   |
//! |                                                        |
//! | Exam ID | Subject | Room | Date       | Start | End   |
//! |---------|---------|------|------------|-------|-------|
//! | E1      | Maths   | R101 | 2023-12-01 | 09:00 | 11:00 |
//! ```

use crate::{row_cells, title_for, visible_rows, StudentFilter, COLUMNS, DEFAULT_TITLE, NO_EXAMS_FOR_STUDENT};
use examplan_core::{ClashLog, RenderError, Renderer, Timetable};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

/// First row of the placement table
const HEADER_ROW: u32 = 2;

/// Excel timetable renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Title written above the table
    pub title: String,
    /// Only show this student's exams
    pub student: Option<StudentFilter>,
    /// Clash log to include as a second sheet
    clash_log: Option<ClashLog>,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            student: None,
            clash_log: None,
        }
    }
}

struct ExcelFormats {
    title: Format,
    header: Format,
    text: Format,
    centered: Format,
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title
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

    /// Include a Clash Log sheet
    pub fn with_clash_log(mut self, log: ClashLog) -> Self {
        self.clash_log = Some(log);
        self
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(&self, timetable: &Timetable) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = Self::create_formats();

        self.add_timetable_sheet(&mut workbook, timetable, &formats)?;
        if let Some(log) = &self.clash_log {
            Self::add_clash_log_sheet(&mut workbook, log, &formats)?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))
    }

    fn create_formats() -> ExcelFormats {
        let title = Format::new().set_bold().set_font_size(14);

        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        ExcelFormats {
            title,
            header,
            text,
            centered,
        }
    }

    fn add_timetable_sheet(
        &self,
        workbook: &mut Workbook,
        timetable: &Timetable,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name("Timetable")
            .map_err(|e| RenderError::Format(e.to_string()))?;

        let title = title_for(&self.title, self.student.as_ref());
        sheet
            .write_with_format(0, 0, title.as_str(), &formats.title)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (col, header) in COLUMNS.iter().enumerate() {
            sheet
                .write_with_format(HEADER_ROW, col as u16, *header, &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        sheet.set_column_width(0, 10).ok(); // Exam ID
        sheet.set_column_width(1, 30).ok(); // Subject
        sheet.set_column_width(2, 12).ok(); // Room
        sheet.set_column_width(3, 12).ok(); // Date
        sheet.set_column_width(4, 8).ok(); // Start
        sheet.set_column_width(5, 8).ok(); // End

        let rows = visible_rows(timetable, self.student.as_ref());
        if rows.is_empty() {
            sheet
                .write(HEADER_ROW + 1, 0, NO_EXAMS_FOR_STUDENT)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        for (i, placement) in rows.iter().enumerate() {
            let row = HEADER_ROW + 1 + i as u32;
            for (col, cell) in row_cells(placement).iter().enumerate() {
                // Subject is free text, the rest are codes and times
                let format = if col == 1 { &formats.text } else { &formats.centered };
                sheet
                    .write_with_format(row, col as u16, cell.as_str(), format)
                    .map_err(|e| RenderError::Format(e.to_string()))?;
            }
        }

        sheet.set_freeze_panes(HEADER_ROW + 1, 0).ok();

        Ok(())
    }

    fn add_clash_log_sheet(
        workbook: &mut Workbook,
        log: &ClashLog,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name("Clash Log")
            .map_err(|e| RenderError::Format(e.to_string()))?;

        sheet
            .write_with_format(0, 0, "Entry", &formats.header)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        sheet.set_column_width(0, 100).ok();

        for (i, entry) in log.iter().enumerate() {
            sheet
                .write_with_format((i + 1) as u32, 0, entry, &formats.text)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        sheet.set_freeze_panes(1, 0).ok();

        Ok(())
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, timetable: &Timetable) -> Result<Vec<u8>, RenderError> {
        if self.student.is_none() && timetable.is_empty() {
            return Err(RenderError::InvalidData("No exams to render".into()));
        }
        self.render_to_bytes(timetable)
    }
}
