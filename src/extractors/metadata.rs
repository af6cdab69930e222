// src/extractors/metadata.rs

use chrono::NaiveDate;
use std::path::Path;

use crate::table::Table;
use crate::utils::error::ExtractError;

// Re-issued reports carry this marker; it never changes the identity.
const FIX_MARKER: &str = "_FIX";

pub const METADATA_COLUMNS: [&str; 3] = ["DATE_DATA", "ORG_CODE", "ORG_NAME"];

/// Report identity taken from a file named `YEAR_MONTH_ORGCODE_ORGNAME[_FIX].html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetadata {
    pub date: NaiveDate, // always the first of the month
    pub org_code: String,
    pub org_name: String,
}

impl ReportMetadata {
    /// Resolves the metadata from a file name. Any directory part is ignored.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractError> {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name)
            .replace(FIX_MARKER, "");
        let stem = match base.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => base.as_str(),
        };

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 2 {
            return Err(ExtractError::DateFormat(file_name.to_string()));
        }

        let year: i32 = parts[0]
            .parse()
            .map_err(|_| ExtractError::DateFormat(format!("{}: year {:?} is not numeric", file_name, parts[0])))?;
        let month: u32 = parts[1]
            .parse()
            .map_err(|_| ExtractError::DateFormat(format!("{}: month {:?} is not numeric", file_name, parts[1])))?;
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| ExtractError::DateFormat(format!("{}: {}-{} is not a valid month", file_name, year, month)))?;

        let org_code = parts
            .get(2)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ExtractError::FileName(file_name.to_string()))?
            .to_string();
        let org_name = parts[3..].join(" ");

        Ok(Self { date, org_code, org_name })
    }

    /// Sets DATE_DATA, ORG_CODE and ORG_NAME on every row of a tab table.
    pub fn stamp(&self, table: &mut Table) {
        self.stamp_date(table);
        table.set_column(METADATA_COLUMNS[1], &self.org_code);
        table.set_column(METADATA_COLUMNS[2], &self.org_name);
    }

    /// Sets DATE_DATA only. The ranking table lists other organisations,
    /// so its own org columns are left alone.
    pub fn stamp_date(&self, table: &mut Table) {
        table.set_column(METADATA_COLUMNS[0], &self.date.format("%Y-%m-%d").to_string());
    }
}
