use serde::{Deserialize, Serialize};

use crate::error::{ReachError, Result};

/// A single cell of the tabular dataset. Provider exports mix text, numbers,
/// and blanks within the same column, so the dataset keeps the distinction
/// instead of flattening everything to strings.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Plain text cell.
    Text(String),
    /// Numeric cell (integers and floats share this representation).
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Empty or missing cell.
    Empty,
}

impl CellValue {
    /// Renders the cell as display text. Empty cells render as the empty
    /// string.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// The merged tabular dataset: an ordered header row plus data rows. Column
/// order is significant — it determines spreadsheet column positions in the
/// generated workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Returns the 0-based position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns the position of the named column or fails with
    /// [`ReachError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReachError::ColumnNotFound(name.to_string()))
    }

    /// Appends a new column with one value per existing row.
    pub fn push_column(&mut self, name: String, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Returns the trimmed display text of the cell at (row, column), or an
    /// empty string when the row is ragged.
    pub fn text_at(&self, row: usize, column: usize) -> String {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(|cell| cell.as_text().trim().to_string())
            .unwrap_or_default()
    }
}

/// A WGS84 coordinate pair in degrees, as returned by the geocoding provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// Builds a location, rejecting out-of-domain coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ReachError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

/// A reference office: configured once at startup, geocoded once, then
/// read-only. Office identity is its name, which also names the generated
/// distance column and the per-office output sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Office {
    pub name: String,
    pub address: String,
    pub location: Location,
}

/// The two kinds of filter rule the synthesizer understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CriterionKind {
    /// Row qualifies when the bound dataset column is at least the threshold.
    Threshold { column: String },
    /// Row qualifies when the distance to the currently selected office is
    /// below the threshold and above zero.
    Distance,
}

/// A named filter rule with an adjustable threshold. The threshold value is
/// what analysts edit in the generated criteria sheet; the binding (column
/// and comparison direction) is fixed at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    #[serde(flatten)]
    pub kind: CriterionKind,
    pub value: f64,
}

impl Criterion {
    pub fn is_distance(&self) -> bool {
        matches!(self.kind, CriterionKind::Distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_rejects_out_of_range_coordinates() {
        assert!(Location::new(90.5, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn push_column_extends_every_row() {
        let mut dataset = Dataset::new(vec!["Id".into()]);
        dataset.rows.push(vec![CellValue::Text("a".into())]);
        dataset.rows.push(vec![CellValue::Text("b".into())]);
        dataset.push_column(
            "distance to Venlo".into(),
            vec![CellValue::Number(12.0), CellValue::Empty],
        );

        assert_eq!(dataset.columns.len(), 2);
        assert_eq!(dataset.rows[0][1], CellValue::Number(12.0));
        assert_eq!(dataset.rows[1][1], CellValue::Empty);
    }

    #[test]
    fn criterion_deserializes_both_kinds() {
        let threshold: Criterion = serde_json::from_str(
            r#"{"name":"Employees","kind":"threshold","column":"Number of employees","value":250}"#,
        )
        .expect("threshold criterion parsed");
        assert!(!threshold.is_distance());

        let distance: Criterion =
            serde_json::from_str(r#"{"name":"Distance (km)","kind":"distance","value":100}"#)
                .expect("distance criterion parsed");
        assert!(distance.is_distance());
    }
}
