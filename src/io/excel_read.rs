use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{ReachError, Result};
use crate::model::{CellValue, Dataset};

/// Reads the first worksheet of a provider export into a [`Dataset`].
///
/// Provider exports carry a fixed number of leading non-data rows (title,
/// export date, search summary) before the real header row; `skip_rows`
/// strips them. The next row is taken as headers, everything after as data.
pub fn read_dataset(path: &Path, skip_rows: usize) -> Result<Dataset> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReachError::InvalidWorkbook(format!("{} has no sheets", path.display())))?
        .map_err(ReachError::from)?;

    let mut rows = range.rows().skip(skip_rows);
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| {
            ReachError::InvalidWorkbook(format!(
                "{} has no header row after skipping {skip_rows} rows",
                path.display()
            ))
        })?
        .iter()
        .map(|cell| cell_to_string(cell).trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(ReachError::InvalidWorkbook(format!(
            "{} has an empty header row",
            path.display()
        )));
    }

    let mut dataset = Dataset::new(headers);
    for row in rows {
        let cells: Vec<CellValue> = (0..dataset.columns.len())
            .map(|column| row.get(column).map(cell_to_value).unwrap_or(CellValue::Empty))
            .collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        dataset.rows.push(cells);
    }

    debug!(path = %path.display(), rows = dataset.rows.len(), "read provider export");
    Ok(dataset)
}

/// Concatenates several provider exports sharing one logical schema. The
/// header orderings must match exactly; a divergent file is a structural
/// error, not something to paper over.
pub fn merge_datasets(parts: Vec<Dataset>) -> Result<Dataset> {
    let mut parts = parts.into_iter();
    let mut merged = parts
        .next()
        .ok_or_else(|| ReachError::InvalidWorkbook("no input datasets".into()))?;

    for part in parts {
        if part.columns != merged.columns {
            return Err(ReachError::InvalidWorkbook(format!(
                "input column mismatch: expected {:?}, found {:?}",
                merged.columns, part.columns
            )));
        }
        merged.rows.extend(part.rows);
    }

    Ok(merged)
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => {
            if value.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(value.clone())
            }
        }
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => value.clone(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    use super::*;

    fn write_fixture(path: &Path, noise_rows: &[&str], rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let mut row_idx = 0u32;
        for noise in noise_rows {
            worksheet.write_string(row_idx, 0, *noise).expect("noise written");
            row_idx += 1;
        }
        for row in rows {
            for (col_idx, cell) in row.iter().enumerate() {
                worksheet
                    .write_string(row_idx, col_idx as u16, *cell)
                    .expect("cell written");
            }
            row_idx += 1;
        }
        workbook.save(path).expect("fixture saved");
    }

    #[test]
    fn skips_provider_noise_rows() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("export.xlsx");
        write_fixture(
            &path,
            &["Export generated 2024-01-01", "Search: NL companies"],
            &[&["Id", "City"], &["C1", "Venlo"], &["C2", "missing"]],
        );

        let dataset = read_dataset(&path, 2).expect("dataset read");
        assert_eq!(dataset.columns, vec!["Id".to_string(), "City".to_string()]);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.text_at(0, 1), "Venlo");
    }

    #[test]
    fn merge_rejects_divergent_headers() {
        let a = Dataset::new(vec!["Id".into(), "City".into()]);
        let b = Dataset::new(vec!["Id".into(), "Town".into()]);
        let error = merge_datasets(vec![a, b]).unwrap_err();
        assert!(matches!(error, ReachError::InvalidWorkbook(_)));
    }

    #[test]
    fn merge_concatenates_rows_in_order() {
        let mut a = Dataset::new(vec!["Id".into()]);
        a.rows.push(vec![CellValue::Text("C1".into())]);
        let mut b = Dataset::new(vec!["Id".into()]);
        b.rows.push(vec![CellValue::Text("C2".into())]);

        let merged = merge_datasets(vec![a, b]).expect("merged");
        assert_eq!(merged.rows.len(), 2);
        assert_eq!(merged.text_at(1, 0), "C2");
    }
}
