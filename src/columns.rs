use crate::error::{ReachError, Result};

/// Converts a 0-based spreadsheet column index to its letter form
/// (0 = A, 25 = Z, 26 = AA). Correct for arbitrary width; wide provider
/// exports routinely pass the two-letter boundary once distance columns are
/// appended.
pub fn column_letters(index: usize) -> String {
    let mut letters = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        letters.insert(0, ((n % 26) as u8 + b'A') as char);
        n /= 26;
    }

    letters
}

/// Maps a logical column name to its spreadsheet column letters, given the
/// dataset's current column ordering.
///
/// The generated raw-data sheet reserves column A for the row-index column,
/// so the dataset's first column lands in "B"; the +1 offset below accounts
/// for that.
pub fn column_reference(name: &str, ordered_columns: &[String]) -> Result<String> {
    let position = ordered_columns
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| ReachError::ColumnNotFound(name.to_string()))?;
    Ok(column_letters(position + 1))
}
