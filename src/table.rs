// src/table.rs
use std::io::Write;

use crate::utils::error::TableError;

/// An ordered set of named string columns with row-major cells.
/// Every extracted dataset ends up in one of these before upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowArity {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Sets every row of a column to `value`, appending the column if it is new.
    pub fn set_column(&mut self, name: &str, value: &str) {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
    }

    /// Inserts constant columns at the front, keeping the given order.
    pub fn prepend_columns(&mut self, columns: &[(&str, &str)]) -> Result<(), TableError> {
        if let Some((name, _)) = columns
            .iter()
            .find(|(name, _)| self.columns.iter().any(|c| c == name))
        {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }

        let names = columns.iter().map(|(name, _)| name.to_string());
        self.columns.splice(0..0, names);
        for row in &mut self.rows {
            row.splice(0..0, columns.iter().map(|(_, value)| value.to_string()));
        }
        Ok(())
    }

    /// Values of a named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Writes the header followed by every row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["A", "B"]);
        table.push_row(vec!["1".into(), "2".into()]).unwrap();
        table.push_row(vec!["3".into(), "4".into()]).unwrap();
        table
    }

    #[test]
    fn rejects_rows_of_wrong_arity() {
        let mut table = Table::new(["A", "B"]);
        let err = table.push_row(vec!["only".into()]).unwrap_err();
        assert!(matches!(err, TableError::RowArity { expected: 2, found: 1 }));
    }

    #[test]
    fn prepended_columns_come_first_in_order() {
        let mut table = sample();
        table.prepend_columns(&[("X", "x"), ("Y", "y")]).unwrap();
        assert_eq!(table.columns(), ["X", "Y", "A", "B"]);
        assert_eq!(table.rows()[1], ["x", "y", "3", "4"]);
    }

    #[test]
    fn constant_column_fills_every_row() {
        let mut table = sample();
        table.set_column("ORG_CODE", "ABC");
        assert_eq!(table.column("ORG_CODE"), Some(vec!["ABC", "ABC"]));
    }

    #[test]
    fn set_column_overwrites_in_place() {
        let mut table = sample();
        table.set_column("A", "x");
        table.set_column("C", "y");
        assert_eq!(table.columns(), ["A", "B", "C"]);
        assert_eq!(table.rows()[0], ["x", "2", "y"]);
    }

    #[test]
    fn writes_header_and_rows_as_csv() {
        let mut out = Vec::new();
        sample().write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A,B\n1,2\n3,4\n");
    }
}
