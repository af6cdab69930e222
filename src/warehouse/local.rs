// src/warehouse/local.rs
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::table::Table;
use crate::utils::error::WarehouseError;
use crate::warehouse::{create_schema_sql, create_table_sql, ColumnInfo, Destination, UploadGateway};

const SCHEMA_DDL_FILE: &str = "_schema.sql";

/// A warehouse kept on local disk: one directory per schema, one CSV file per
/// table, with the DDL that created each object stored beside it.
/// Identifiers are upper-cased the way the warehouse folds unquoted names.
pub struct CsvWarehouse {
    root: PathBuf,
    user: String,
}

impl CsvWarehouse {
    /// Opens (creating if needed) a warehouse rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P, user: &str) -> Result<Self, WarehouseError> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root, user: user.to_string() })
    }

    fn identifier(name: &str) -> Result<String, WarehouseError> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if !valid {
            return Err(WarehouseError::InvalidIdentifier(name.to_string()));
        }
        Ok(name.to_uppercase())
    }

    fn schema_dir(&self, destination: &Destination) -> Result<PathBuf, WarehouseError> {
        Ok(self
            .root
            .join(Self::identifier(&destination.database)?)
            .join(Self::identifier(&destination.schema)?))
    }

    /// Path of the CSV file backing a destination table.
    pub fn table_path(&self, destination: &Destination) -> Result<PathBuf, WarehouseError> {
        let table = Self::identifier(&destination.table)?;
        Ok(self.schema_dir(destination)?.join(format!("{}.csv", table)))
    }

    fn ddl_path(&self, destination: &Destination) -> Result<PathBuf, WarehouseError> {
        let table = Self::identifier(&destination.table)?;
        Ok(self.schema_dir(destination)?.join(format!("{}.sql", table)))
    }

    fn header_of(path: &Path) -> Result<Vec<String>, WarehouseError> {
        let mut reader = csv::Reader::from_path(path)?;
        Ok(reader.headers()?.iter().map(str::to_string).collect())
    }

    fn try_upload(&self, destination: &Destination, table: &Table, replace: bool) -> Result<usize, WarehouseError> {
        let path = self.table_path(destination)?;
        if !path.exists() {
            return Err(WarehouseError::MissingTable(destination.qualified()));
        }

        let expected = Self::header_of(&path)?;
        if expected != table.columns() {
            return Err(WarehouseError::ColumnMismatch {
                table: destination.qualified(),
                expected,
                found: table.columns().to_vec(),
            });
        }

        if replace {
            let file = fs::File::create(&path)?;
            table.write_csv(file)?;
        } else {
            let file = OpenOptions::new().append(true).open(&path)?;
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            for row in table.rows() {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        Ok(table.len())
    }
}

impl UploadGateway for CsvWarehouse {
    fn ensure_destination(
        &mut self,
        destination: &Destination,
        columns: &ColumnInfo,
        description: &str,
    ) -> Result<(), WarehouseError> {
        let schema_dir = self.schema_dir(destination)?;
        if !schema_dir.exists() {
            fs::create_dir_all(&schema_dir)?;
            let comment = format!("Contact: {}", self.user);
            fs::write(schema_dir.join(SCHEMA_DDL_FILE), create_schema_sql(destination, Some(&comment)))?;
            tracing::info!("Created schema {}", destination.qualified_schema());
        }

        let table_path = self.table_path(destination)?;
        if table_path.exists() {
            tracing::debug!("Table {} already exists", destination.qualified());
            return Ok(());
        }

        fs::write(
            self.ddl_path(destination)?,
            create_table_sql(destination, columns, Some(description), false),
        )?;
        let mut writer = csv::Writer::from_path(&table_path)?;
        writer.write_record(columns.names())?;
        writer.flush()?;

        tracing::info!("Created table {}", destination.qualified());
        Ok(())
    }

    fn upload(&mut self, destination: &Destination, table: &Table, replace: bool) -> bool {
        match self.try_upload(destination, table, replace) {
            Ok(rows) => {
                tracing::info!("Uploaded {} rows to {}", rows, destination.qualified());
                true
            }
            Err(e) => {
                tracing::error!("Data ingestion into {} failed with error: {}", destination.qualified(), e);
                false
            }
        }
    }

    fn current_user(&self) -> String {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 2]]) -> Table {
        let mut table = Table::new(["A", "B"]);
        for row in rows {
            table.push_row(row.iter().map(|c| c.to_string()).collect()).unwrap();
        }
        table
    }

    #[test]
    fn ensure_then_append_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let mut wh = CsvWarehouse::open(dir.path(), "analyst").unwrap();
        let dest = Destination::new("db", "sch", "t1");
        let data = table(&[["1", "2"]]);

        wh.ensure_destination(&dest, &ColumnInfo::from_table(&data), "desc").unwrap();
        // idempotent
        wh.ensure_destination(&dest, &ColumnInfo::from_table(&data), "other").unwrap();

        assert!(wh.upload(&dest, &data, false));
        assert!(wh.upload(&dest, &data, false));
        let path = wh.table_path(&dest).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A,B\n1,2\n1,2\n");

        assert!(wh.upload(&dest, &table(&[["3", "4"]]), true));
        assert_eq!(fs::read_to_string(&path).unwrap(), "A,B\n3,4\n");

        let ddl = fs::read_to_string(dir.path().join("DB/SCH/T1.sql")).unwrap();
        assert!(ddl.contains("comment = 'desc'"));
        assert!(dir.path().join("DB/SCH/_schema.sql").exists());
    }

    #[test]
    fn upload_failures_return_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut wh = CsvWarehouse::open(dir.path(), "analyst").unwrap();
        let dest = Destination::new("db", "sch", "t1");

        // table never created
        assert!(!wh.upload(&dest, &table(&[]), false));

        wh.ensure_destination(&dest, &ColumnInfo::Names(vec!["X".into()]), "d").unwrap();
        assert!(!wh.upload(&dest, &table(&[["1", "2"]]), false));
    }

    #[test]
    fn identifiers_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut wh = CsvWarehouse::open(dir.path(), "analyst").unwrap();
        let dest = Destination::new("db", "../sch", "t");
        let result = wh.ensure_destination(&dest, &ColumnInfo::Names(vec![]), "d");
        assert!(matches!(result, Err(WarehouseError::InvalidIdentifier(_))));
    }
}
