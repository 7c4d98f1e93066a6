//! Read-only data tables attached to steps.

use derive_more::Deref;

use cuke_harness_messages::PickleTable;

/// The cells of a Gherkin data table associated with a test step.
///
/// For steps whose pickle step carries a table, an instance is injected as
/// the step's trailing argument. The table is read-only; all accessors
/// return fresh copies or views.
///
/// # Examples
/// ```
/// use cuke_harness::DataTable;
///
/// let table = DataTable::new(vec![
///     vec!["name".to_string(), "colour".to_string()],
///     vec!["cucumber".to_string(), "green".to_string()],
/// ]);
/// let hashes = table.hashes();
/// assert_eq!(hashes[0].get("colour").map(String::as_str), Some("green"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct DataTable {
    cells: Vec<Vec<String>>,
}

impl DataTable {
    /// Create a table from its raw cells.
    #[must_use]
    pub fn new(cells: Vec<Vec<String>>) -> Self {
        Self { cells }
    }

    /// Build a table from a pickle's wire representation.
    #[must_use]
    pub fn from_pickle_table(table: &PickleTable) -> Self {
        Self::new(
            table
                .rows
                .iter()
                .map(|row| row.cells.iter().map(|cell| cell.value.clone()).collect())
                .collect(),
        )
    }

    /// A copy of the raw cells as a two-dimensional array.
    #[must_use]
    pub fn raw(&self) -> Vec<Vec<String>> {
        self.cells.clone()
    }

    /// The rows as key/value maps using the header row for keys.
    #[must_use]
    pub fn hashes(&self) -> Vec<std::collections::HashMap<String, String>> {
        let Some((keys, rows)) = self.cells.split_first() else {
            return Vec::new();
        };
        rows.iter()
            .map(|row| keys.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// The first cell of every row, for single-column tables representing a
    /// simple list.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.cells
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }

    /// A fresh table with the cells transposed.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let Some(first) = self.cells.first() else {
            return Self::new(Vec::new());
        };
        let transposed = (0..first.len())
            .map(|column| {
                self.cells
                    .iter()
                    .filter_map(|row| row.get(column).cloned())
                    .collect()
            })
            .collect();
        Self::new(transposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table(cells: &[&[&str]]) -> DataTable {
        DataTable::new(
            cells
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn hashes_use_the_header_row_for_keys() {
        let table = table(&[
            &["name", "colour"],
            &["cucumber", "green"],
            &["tomato", "red"],
        ]);
        let hashes = table.hashes();
        assert_eq!(hashes.len(), 2);
        assert_eq!(
            hashes
                .first()
                .and_then(|row| row.get("name"))
                .map(String::as_str),
            Some("cucumber")
        );
        assert_eq!(
            hashes
                .last()
                .and_then(|row| row.get("colour"))
                .map(String::as_str),
            Some("red")
        );
    }

    #[test]
    fn hashes_of_headerless_table_are_empty() {
        assert!(table(&[]).hashes().is_empty());
        assert!(table(&[&["only", "header"]]).hashes().is_empty());
    }

    #[test]
    fn list_reads_the_first_column() {
        let table = table(&[&["one"], &["two"], &["three"]]);
        assert_eq!(table.list(), vec!["one", "two", "three"]);
    }

    #[rstest]
    #[case(&[&["a", "b"] as &[&str], &["c", "d"]])]
    #[case(&[&["a", "b", "c"] as &[&str]])]
    #[case(&[&["a"] as &[&str], &["b"], &["c"]])]
    fn transpose_twice_is_identity(#[case] cells: &[&[&str]]) {
        let original = table(cells);
        assert_eq!(original.transpose().transpose(), original);
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let original = table(&[&["a", "b"], &["c", "d"]]);
        assert_eq!(original.transpose(), table(&[&["a", "c"], &["b", "d"]]));
    }

    #[test]
    fn deref_exposes_row_access() {
        let table = table(&[&["a"], &["b"]]);
        assert_eq!(table.len(), 2);
    }
}
