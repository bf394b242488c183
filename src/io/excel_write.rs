use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::debug;

use crate::config::{FormulaMode, RunConfig};
use crate::error::Result;
use crate::model::{CellValue, Criterion, Dataset};

/// The two generated cells of one per-office view sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficeSheet {
    pub name: String,
    /// Reference to the raw-data header row, placed in A1.
    pub header_reference: String,
    /// Array-filter expression selecting the qualifying rows, placed in A2.
    pub filter_formula: String,
}

/// Writes the complete output workbook: the raw-data sheet, the criteria
/// sheet, and one view sheet per office.
///
/// The workbook is assembled in memory and saved to a sibling temporary path
/// that is renamed into place, so a failed run never leaves a partial file
/// under the real output name.
pub fn write_workbook(
    path: &Path,
    dataset: &Dataset,
    criteria: &[Criterion],
    office_sheets: &[OfficeSheet],
    config: &RunConfig,
) -> Result<()> {
    let mut workbook = Workbook::new();

    write_data_sheet(workbook.add_worksheet(), dataset, &config.data_sheet)?;
    write_criteria_sheet(workbook.add_worksheet(), criteria, &config.criteria_sheet)?;
    for office_sheet in office_sheets {
        write_office_sheet(workbook.add_worksheet(), office_sheet, config.formula_mode)?;
    }

    let staging = path.with_extension("xlsx.tmp");
    if let Err(error) = workbook.save(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(error.into());
    }
    fs::rename(&staging, path)?;
    debug!(path = %path.display(), sheets = office_sheets.len() + 2, "workbook written");
    Ok(())
}

/// Raw-data sheet: headers in row 1, a leading 1-based row-index column in A,
/// dataset columns from B onward.
fn write_data_sheet(worksheet: &mut Worksheet, dataset: &Dataset, name: &str) -> Result<()> {
    worksheet.set_name(name)?;

    for (col_idx, header) in dataset.columns.iter().enumerate() {
        worksheet.write_string(0, (col_idx + 1) as u16, header)?;
    }

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        worksheet.write_number(sheet_row, 0, (row_idx + 1) as f64)?;
        for (col_idx, cell) in row.iter().enumerate() {
            let sheet_col = (col_idx + 1) as u16;
            match cell {
                CellValue::Text(value) => {
                    worksheet.write_string(sheet_row, sheet_col, value)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number(sheet_row, sheet_col, *value)?;
                }
                CellValue::Bool(value) => {
                    worksheet.write_boolean(sheet_row, sheet_col, *value)?;
                }
                CellValue::Empty => {}
            }
        }
    }

    Ok(())
}

/// Criteria sheet: one row per criterion, display name in A, the editable
/// threshold in B. Formulas reference these B cells absolutely, so analysts
/// can adjust thresholds and watch the office views update.
fn write_criteria_sheet(
    worksheet: &mut Worksheet,
    criteria: &[Criterion],
    name: &str,
) -> Result<()> {
    worksheet.set_name(name)?;
    for (row_idx, criterion) in criteria.iter().enumerate() {
        worksheet.write_string(row_idx as u32, 0, &criterion.name)?;
        worksheet.write_number(row_idx as u32, 1, criterion.value)?;
    }
    Ok(())
}

fn write_office_sheet(
    worksheet: &mut Worksheet,
    office_sheet: &OfficeSheet,
    mode: FormulaMode,
) -> Result<()> {
    worksheet.set_name(&office_sheet.name)?;
    match mode {
        FormulaMode::Live => {
            worksheet.write_dynamic_array_formula(
                0,
                0,
                0,
                0,
                format!("={}", office_sheet.header_reference).as_str(),
            )?;
            worksheet.write_dynamic_array_formula(
                1,
                0,
                1,
                0,
                format!("={}", office_sheet.filter_formula).as_str(),
            )?;
        }
        FormulaMode::Text => {
            worksheet.write_string(0, 0, &office_sheet.header_reference)?;
            worksheet.write_string(1, 0, &office_sheet.filter_formula)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use calamine::{DataType, Reader, Xlsx, open_workbook};
    use tempfile::tempdir;

    use super::*;
    use crate::model::CriterionKind;

    fn sample_dataset() -> Dataset {
        let mut dataset = Dataset::new(vec!["Id".into(), "Employees".into()]);
        dataset.rows.push(vec![CellValue::Text("C1".into()), CellValue::Number(300.0)]);
        dataset.rows.push(vec![CellValue::Text("C2".into()), CellValue::Empty]);
        dataset
    }

    fn sample_criteria() -> Vec<Criterion> {
        vec![
            Criterion {
                name: "Employees".into(),
                kind: CriterionKind::Threshold { column: "Employees".into() },
                value: 250.0,
            },
            Criterion {
                name: "Distance (km)".into(),
                kind: CriterionKind::Distance,
                value: 100.0,
            },
        ]
    }

    fn sample_office_sheet() -> OfficeSheet {
        OfficeSheet {
            name: "Venlo".into(),
            header_reference: "Data!A1:C1".into(),
            filter_formula: "FILTER(Data!A2:C3,(Data!C2:C3>=Criteria!$B$1))".into(),
        }
    }

    fn config(mode: FormulaMode) -> RunConfig {
        serde_json::from_str::<RunConfig>(r#"{"offices": [], "criteria": []}"#)
            .map(|mut config| {
                config.formula_mode = mode;
                config
            })
            .expect("config built")
    }

    #[test]
    fn text_mode_writes_expressions_as_literal_cells() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.xlsx");
        write_workbook(
            &path,
            &sample_dataset(),
            &sample_criteria(),
            &[sample_office_sheet()],
            &config(FormulaMode::Text),
        )
        .expect("workbook written");

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("workbook reopened");
        let names: Vec<&str> = workbook.sheet_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["Data", "Criteria", "Venlo"]);

        let venlo = workbook
            .worksheet_range("Venlo")
            .expect("sheet present")
            .expect("sheet readable");
        assert_eq!(
            venlo.get_value((0, 0)),
            Some(&DataType::String("Data!A1:C1".into()))
        );
        let formula = venlo.get_value((1, 0)).expect("A2 populated");
        assert!(formula.to_string().starts_with("FILTER("));

        let criteria = workbook
            .worksheet_range("Criteria")
            .expect("sheet present")
            .expect("sheet readable");
        assert_eq!(criteria.get_size(), (2, 2));
        assert_eq!(criteria.get_value((1, 1)), Some(&DataType::Float(100.0)));
    }

    #[test]
    fn data_sheet_carries_index_column_and_headers() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.xlsx");
        write_workbook(
            &path,
            &sample_dataset(),
            &sample_criteria(),
            &[],
            &config(FormulaMode::Text),
        )
        .expect("workbook written");

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("workbook reopened");
        let data = workbook
            .worksheet_range("Data")
            .expect("sheet present")
            .expect("sheet readable");
        assert_eq!(data.get_value((0, 1)), Some(&DataType::String("Id".into())));
        assert_eq!(data.get_value((1, 0)), Some(&DataType::Float(1.0)));
        assert_eq!(data.get_value((1, 2)), Some(&DataType::Float(300.0)));
    }

    #[test]
    fn live_mode_saves_without_leaving_staging_files() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.xlsx");
        write_workbook(
            &path,
            &sample_dataset(),
            &sample_criteria(),
            &[sample_office_sheet()],
            &config(FormulaMode::Live),
        )
        .expect("workbook written");

        assert!(path.exists());
        assert!(!path.with_extension("xlsx.tmp").exists());

        let workbook: Xlsx<_> = open_workbook(&path).expect("workbook reopened");
        let names: Vec<&str> = workbook.sheet_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["Data", "Criteria", "Venlo"]);
    }
}
