// src/warehouse/mod.rs
pub mod local;

use crate::table::Table;
use crate::utils::error::WarehouseError;

pub use local::CsvWarehouse;

// Columns without an explicit type are created as plain strings.
const DEFAULT_DATA_TYPE: &str = "string";

/// A fully qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl Destination {
    pub fn new(database: &str, schema: &str, table: &str) -> Self {
        Self {
            database: database.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    pub fn qualified_schema(&self) -> String {
        format!("{}.{}", self.database, self.schema)
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// Column layout used when a destination table has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnInfo {
    /// Bare names; every column gets the default type.
    Names(Vec<String>),
    /// Names with optional data type and comment.
    Described(Vec<ColumnSpec>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: Option<String>,
    pub comment: Option<String>,
}

impl ColumnInfo {
    pub fn from_table(table: &Table) -> Self {
        ColumnInfo::Names(table.columns().to_vec())
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            ColumnInfo::Names(names) => names.iter().map(String::as_str).collect(),
            ColumnInfo::Described(specs) => specs.iter().map(|spec| spec.name.as_str()).collect(),
        }
    }
}

/// What the pipeline needs from a warehouse.
pub trait UploadGateway {
    /// Creates the schema and table if they are missing. Never alters an existing table.
    fn ensure_destination(
        &mut self,
        destination: &Destination,
        columns: &ColumnInfo,
        description: &str,
    ) -> Result<(), WarehouseError>;

    /// Appends (or replaces with) the table's rows. Failures are logged here
    /// and reported as `false`.
    fn upload(&mut self, destination: &Destination, table: &Table, replace: bool) -> bool;

    /// Identity recorded in table and schema comments.
    fn current_user(&self) -> String;
}

fn quote_comment(comment: &str) -> String {
    comment.replace('\'', "''")
}

pub fn create_schema_sql(destination: &Destination, comment: Option<&str>) -> String {
    let mut sql = format!("create schema {}", destination.qualified_schema());
    if let Some(comment) = comment {
        sql.push_str(&format!("\ncomment='{}'", quote_comment(comment)));
    }
    sql
}

pub fn create_table_sql(
    destination: &Destination,
    columns: &ColumnInfo,
    description: Option<&str>,
    replace: bool,
) -> String {
    let prefix = if replace { "create or replace" } else { "create" };

    let lines: Vec<String> = match columns {
        ColumnInfo::Names(names) => names
            .iter()
            .map(|name| format!("{}\t{}", name, DEFAULT_DATA_TYPE))
            .collect(),
        ColumnInfo::Described(specs) => specs
            .iter()
            .map(|spec| {
                let mut line = format!(
                    "{}\t{}",
                    spec.name,
                    spec.data_type.as_deref().unwrap_or(DEFAULT_DATA_TYPE)
                );
                if let Some(comment) = &spec.comment {
                    line.push_str(&format!("\tcomment '{}'", quote_comment(comment)));
                }
                line
            })
            .collect(),
    };

    let mut sql = format!("{} table {} (\n{}\n)\n", prefix, destination.qualified(), lines.join(",\n"));
    if let Some(description) = description {
        sql.push_str(&format!("comment = '{}'\n", quote_comment(description)));
    }
    sql
}

/// Standard table comment for a COSD dataset.
pub fn table_description(dataset_id: &str, user: &str) -> String {
    format!("Table containing {} data from the COSD HTML files. Contact: {}", dataset_id, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> Destination {
        Destination::new("data_lake__ncl", "cancer__cosd_html", "stage_tab")
    }

    #[test]
    fn bare_names_default_to_string() {
        let sql = create_table_sql(
            &dest(),
            &ColumnInfo::Names(vec!["A".into(), "B".into()]),
            Some("Owner's table"),
            false,
        );
        assert_eq!(
            sql,
            "create table data_lake__ncl.cancer__cosd_html.stage_tab (\nA\tstring,\nB\tstring\n)\ncomment = 'Owner''s table'\n"
        );
    }

    #[test]
    fn described_columns_keep_type_and_comment() {
        let columns = ColumnInfo::Described(vec![
            ColumnSpec { name: "RANK".into(), data_type: Some("number".into()), comment: Some("1 is best".into()) },
            ColumnSpec { name: "ORG".into(), data_type: None, comment: None },
        ]);
        let sql = create_table_sql(&dest(), &columns, None, true);
        assert!(sql.starts_with("create or replace table "));
        assert!(sql.contains("RANK\tnumber\tcomment '1 is best',\nORG\tstring\n)"));
        assert_eq!(columns.names(), ["RANK", "ORG"]);
    }

    #[test]
    fn schema_comment_is_optional() {
        assert_eq!(create_schema_sql(&dest(), None), "create schema data_lake__ncl.cancer__cosd_html");
        assert!(create_schema_sql(&dest(), Some("Contact: me")).ends_with("comment='Contact: me'"));
    }
}
