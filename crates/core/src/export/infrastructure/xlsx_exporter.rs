use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::capture::tracking_recorder::TrackingLog;
use crate::export::domain::export_row::{
    landmark_rows, observation_rows, ExportRow, LandmarkPointRow,
};
use crate::export::domain::tabular_exporter::{ExportLayout, TabularExporter};
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::{
    LANDMARK_COUNT, LANDMARK_SHEET_NAME, OBSERVATION_SHEET_NAME, SURVEY_SHEET_NAME,
};
use crate::survey::domain::questionnaire::Questionnaire;
use crate::survey::domain::survey_error::SurveyError;

const OBSERVATION_HEADER: [&str; 3] = ["Frame", "Timestamp", "Landmarks"];
const LANDMARK_HEADER: [&str; 4] = ["index", "x", "y", "time"];
const SURVEY_HEADER: [&str; 3] = ["Question", "Scores", "Total"];

/// Data rows that fit under the header row on one Excel worksheet
/// (1,048,576 rows in total).
pub const MAX_DATA_ROWS: u32 = 1_048_575;

/// Writes `.xlsx` workbooks via rust_xlsxwriter.
///
/// Logs longer than one worksheet continue on `Facial Data (2)`,
/// `Landmarks (2)` and so on. Per-landmark sheets only break between
/// observations, so one face's 68 rows always share a sheet.
#[derive(Clone, Copy, Debug)]
pub struct XlsxExporter {
    layout: ExportLayout,
    sheet_rows: u32,
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self::new(ExportLayout::default())
    }
}

impl XlsxExporter {
    pub fn new(layout: ExportLayout) -> Self {
        Self {
            layout,
            sheet_rows: MAX_DATA_ROWS,
        }
    }

    /// Caps data rows per sheet below the Excel limit.
    #[cfg(test)]
    fn with_sheet_rows(layout: ExportLayout, sheet_rows: u32) -> Self {
        Self {
            layout,
            sheet_rows: sheet_rows.clamp(1, MAX_DATA_ROWS),
        }
    }

    pub fn layout(&self) -> ExportLayout {
        self.layout
    }

    /// One row per question with its scores and their sum, then the grand
    /// total. Fails with `EmptySurvey` when nothing was scored.
    pub fn export_survey(&self, questionnaire: &Questionnaire) -> Result<Vec<u8>, SurveyError> {
        if questionnaire.is_empty() {
            return Err(SurveyError::EmptySurvey);
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SURVEY_SHEET_NAME)?;
        write_header(sheet, &SURVEY_HEADER)?;

        let mut row = 1;
        for (question, scores) in questionnaire.iter() {
            let joined = scores
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let total: u32 = scores.iter().map(|&s| s as u32).sum();
            sheet.write_string(row, 0, format!("Question {}", question + 1))?;
            sheet.write_string(row, 1, joined)?;
            sheet.write_number(row, 2, total)?;
            row += 1;
        }

        let bold = Format::new().set_bold();
        sheet.write_string_with_format(row, 0, "Total Score", &bold)?;
        sheet.write_number_with_format(row, 2, questionnaire.total(), &bold)?;
        sheet.set_column_width(0, 14)?;
        sheet.set_column_width(1, 20)?;

        Ok(workbook.save_to_buffer()?)
    }

    pub fn export_survey_to_file(
        &self,
        questionnaire: &Questionnaire,
        path: &Path,
    ) -> Result<(), SurveyError> {
        let bytes = self.export_survey(questionnaire)?;
        std::fs::write(path, bytes).map_err(|source| SurveyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Exported survey scores to {}", path.display());
        Ok(())
    }

    /// Rows per per-landmark sheet, rounded down to whole observations.
    fn landmark_rows_per_sheet(&self) -> usize {
        (self.sheet_rows as usize / LANDMARK_COUNT).max(1) * LANDMARK_COUNT
    }
}

fn sheet_name(base: &str, part: usize) -> String {
    if part == 0 {
        base.to_string()
    } else {
        format!("{base} ({})", part + 1)
    }
}

fn write_observations(sheet: &mut Worksheet, rows: &[ExportRow]) -> Result<(), XlsxError> {
    write_header(sheet, &OBSERVATION_HEADER)?;
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, row.frame as f64)?;
        sheet.write_number(r, 1, row.timestamp)?;
        sheet.write_string(r, 2, &row.landmarks)?;
    }
    sheet.set_column_width(1, 12)?;
    Ok(())
}

fn write_landmarks(sheet: &mut Worksheet, rows: &[LandmarkPointRow]) -> Result<(), XlsxError> {
    write_header(sheet, &LANDMARK_HEADER)?;
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, row.index as f64)?;
        sheet.write_number(r, 1, row.x)?;
        sheet.write_number(r, 2, row.y)?;
        sheet.write_number(r, 3, row.time)?;
    }
    Ok(())
}

fn write_header(sheet: &mut Worksheet, header: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, title) in header.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    Ok(())
}

impl TabularExporter for XlsxExporter {
    fn export(&self, log: &TrackingLog) -> Result<Vec<u8>, CaptureError> {
        if log.is_empty() {
            return Err(CaptureError::EmptyLog);
        }

        let mut workbook = Workbook::new();
        let sheets = match self.layout {
            ExportLayout::PerObservation => {
                let rows = observation_rows(log);
                let chunks = rows.chunks(self.sheet_rows as usize);
                for (part, chunk) in chunks.enumerate() {
                    let sheet = workbook.add_worksheet();
                    sheet.set_name(sheet_name(OBSERVATION_SHEET_NAME, part))?;
                    write_observations(sheet, chunk)?;
                }
                rows.len().div_ceil(self.sheet_rows as usize)
            }
            ExportLayout::PerLandmark => {
                let rows = landmark_rows(log);
                let per_sheet = self.landmark_rows_per_sheet();
                for (part, chunk) in rows.chunks(per_sheet).enumerate() {
                    let sheet = workbook.add_worksheet();
                    sheet.set_name(sheet_name(LANDMARK_SHEET_NAME, part))?;
                    write_landmarks(sheet, chunk)?;
                }
                rows.len().div_ceil(per_sheet)
            }
        };
        if sheets > 1 {
            log::info!("{} observations split across {sheets} worksheets", log.len());
        }
        Ok(workbook.save_to_buffer()?)
    }

    fn file_extension(&self) -> &str {
        "xlsx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tracking_recorder::tests::observation;
    use crate::capture::tracking_recorder::TrackingRecorder;
    use crate::survey::domain::likert_response::LikertResponse;
    use rstest::rstest;
    use std::io::{Cursor, Read};

    /// Every xlsx file is a zip archive.
    const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

    /// Text of one part of the workbook archive, e.g. `xl/workbook.xml`.
    fn workbook_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    fn row_count(sheet_xml: &str) -> usize {
        sheet_xml.matches("<row ").count()
    }

    fn number_cell(cell: &str, value: &str) -> String {
        format!(r#"<c r="{cell}"><v>{value}</v></c>"#)
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not found"))
    }

    fn log_of(frames: usize) -> TrackingLog {
        let recorder = TrackingRecorder::new();
        for i in 0..frames {
            recorder.record(observation(i as f64 * 0.1, i)).unwrap();
        }
        recorder.snapshot()
    }

    #[test]
    fn test_per_observation_sheet_contents() {
        let bytes = XlsxExporter::new(ExportLayout::PerObservation)
            .export(&log_of(3))
            .unwrap();
        assert!(bytes.starts_with(ZIP_MAGIC));

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Facial Data""#));
        assert_eq!(workbook.matches("<sheet ").count(), 1);

        let sheet = workbook_part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(row_count(&sheet), 4);
        for (row, frame, time) in [(2, "0", "0"), (3, "1", "0.1"), (4, "2", "0.2")] {
            assert!(sheet.contains(&number_cell(&format!("A{row}"), frame)));
            assert!(sheet.contains(&number_cell(&format!("B{row}"), time)));
        }

        let strings = workbook_part(&bytes, "xl/sharedStrings.xml");
        let header = [
            position(&strings, ">Frame<"),
            position(&strings, ">Timestamp<"),
            position(&strings, ">Landmarks<"),
        ];
        let landmarks = [
            position(&strings, ">0,0;1,2;2,4;"),
            position(&strings, ">1,1;2,3;3,5;"),
            position(&strings, ">2,2;3,4;4,6;"),
        ];
        assert!(header.windows(2).all(|w| w[0] < w[1]));
        assert!(header[2] < landmarks[0]);
        assert!(landmarks.windows(2).all(|w| w[0] < w[1]));
        assert!(strings.contains("67,134<"));
    }

    #[test]
    fn test_per_landmark_sheet_contents() {
        let bytes = XlsxExporter::new(ExportLayout::PerLandmark)
            .export(&log_of(3))
            .unwrap();

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Landmarks""#));

        let sheet = workbook_part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(row_count(&sheet), 1 + 3 * 68);
        // First point of the first face
        assert!(sheet.contains(&number_cell("A2", "0")));
        assert!(sheet.contains(&number_cell("D2", "0")));
        // Last point of the first face: (67, 134)
        assert!(sheet.contains(&number_cell("A69", "67")));
        assert!(sheet.contains(&number_cell("C69", "134")));
        // First point of the second face, shifted by 1, at 0.1 s
        assert!(sheet.contains(&number_cell("A70", "0")));
        assert!(sheet.contains(&number_cell("B70", "1")));
        assert!(sheet.contains(&number_cell("D70", "0.1")));

        let strings = workbook_part(&bytes, "xl/sharedStrings.xml");
        for title in LANDMARK_HEADER {
            assert!(strings.contains(&format!(">{title}<")), "missing header {title}");
        }
    }

    #[test]
    fn test_long_landmark_log_continues_on_further_sheets() {
        // Two faces per sheet: 136 of the allowed 150 rows
        let exporter = XlsxExporter::with_sheet_rows(ExportLayout::PerLandmark, 150);
        let bytes = exporter.export(&log_of(5)).unwrap();

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Landmarks""#));
        assert!(workbook.contains(r#"name="Landmarks (2)""#));
        assert!(workbook.contains(r#"name="Landmarks (3)""#));
        assert_eq!(workbook.matches("<sheet ").count(), 3);

        let first = workbook_part(&bytes, "xl/worksheets/sheet1.xml");
        let last = workbook_part(&bytes, "xl/worksheets/sheet3.xml");
        assert_eq!(row_count(&first), 1 + 2 * 68);
        assert_eq!(row_count(&last), 1 + 68);
        // The fifth face starts the third sheet, right under its header
        assert!(last.contains(&number_cell("A2", "0")));
        assert!(last.contains(&number_cell("B2", "4")));
        assert!(last.contains(&number_cell("D2", "0.4")));
    }

    #[test]
    fn test_long_observation_log_continues_on_further_sheets() {
        let exporter = XlsxExporter::with_sheet_rows(ExportLayout::PerObservation, 2);
        let bytes = exporter.export(&log_of(3)).unwrap();

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Facial Data (2)""#));
        let second = workbook_part(&bytes, "xl/worksheets/sheet2.xml");
        assert_eq!(row_count(&second), 2);
        assert!(second.contains(&number_cell("A2", "2")));
    }

    #[test]
    fn test_sheet_capacity_at_excel_limit() {
        let exporter = XlsxExporter::new(ExportLayout::PerLandmark);
        let per_sheet = exporter.landmark_rows_per_sheet();
        assert_eq!(per_sheet % 68, 0);
        assert!(per_sheet <= MAX_DATA_ROWS as usize);
        assert!(per_sheet + 68 > MAX_DATA_ROWS as usize);
        // Header plus data fill the 1,048,576 rows Excel allows
        assert_eq!(MAX_DATA_ROWS + 1, 1_048_576);
    }

    #[rstest]
    #[case::first(0, "Landmarks")]
    #[case::second(1, "Landmarks (2)")]
    #[case::tenth(9, "Landmarks (10)")]
    fn test_sheet_name(#[case] part: usize, #[case] expected: &str) {
        assert_eq!(sheet_name(LANDMARK_SHEET_NAME, part), expected);
    }

    #[rstest]
    #[case::per_observation(ExportLayout::PerObservation)]
    #[case::per_landmark(ExportLayout::PerLandmark)]
    fn test_empty_log_is_rejected(#[case] layout: ExportLayout) {
        let result = XlsxExporter::new(layout).export(&TrackingLog::default());
        assert!(matches!(result, Err(CaptureError::EmptyLog)));
    }

    #[test]
    fn test_empty_log_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landmarks_data.xlsx");
        let result = XlsxExporter::default().export_to_file(&TrackingLog::default(), &path);
        assert!(matches!(result, Err(CaptureError::EmptyLog)));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_to_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landmarks_data.xlsx");
        std::fs::write(&path, b"stale").unwrap();

        XlsxExporter::default().export_to_file(&log_of(2), &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(ZIP_MAGIC));
    }

    #[test]
    fn test_export_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        let result = XlsxExporter::default().export_to_file(&log_of(1), &path);
        assert!(matches!(result, Err(CaptureError::Io { .. })));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(XlsxExporter::default().file_extension(), "xlsx");
        assert_eq!(XlsxExporter::default().layout(), ExportLayout::PerObservation);
    }

    #[test]
    fn test_survey_export() {
        let mut questionnaire = Questionnaire::new();
        questionnaire.record(0, LikertResponse::Often).unwrap();
        questionnaire.record(0, LikertResponse::Never).unwrap();
        questionnaire.record(13, LikertResponse::Always).unwrap();
        let bytes = XlsxExporter::default().export_survey(&questionnaire).unwrap();
        assert!(bytes.starts_with(ZIP_MAGIC));

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Survey Scores""#));

        // Header, 14 questions, total
        let sheet = workbook_part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(row_count(&sheet), 16);
        assert!(sheet.contains(&number_cell("C2", "5")));
        assert!(sheet.contains(&number_cell("C15", "5")));

        let strings = workbook_part(&bytes, "xl/sharedStrings.xml");
        let order = [
            position(&strings, ">Question<"),
            position(&strings, ">Scores<"),
            position(&strings, ">Total<"),
            position(&strings, ">Question 1<"),
            position(&strings, ">4, 1<"),
            position(&strings, ">Question 14<"),
            position(&strings, ">Total Score<"),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_survey_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.xlsx");
        let result = XlsxExporter::default().export_survey_to_file(&Questionnaire::new(), &path);
        assert!(matches!(result, Err(SurveyError::EmptySurvey)));
        assert!(!path.exists());
    }
}
