// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};
use crate::table::Table;
use crate::utils::error::StorageError;

/// Result of moving a source report into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Moved(PathBuf),
    /// The archive already held a file of that name; nothing was touched.
    AlreadyArchived(PathBuf),
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified archive directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Moves a processed report to `<base>/html/<org_code>/<file_name>`.
    /// An existing archived copy is never overwritten.
    pub fn archive_html(&self, data_dir: &Path, file_name: &str, org_code: &str) -> Result<ArchiveOutcome, StorageError> {
        // Create a directory structure like: /base_dir/html/org_code/
        let target_dir = self.base_dir.join("html").join(org_code);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)
                .map_err(StorageError::IoError)?;
        }

        let source = data_dir.join(file_name);
        let destination = target_dir.join(file_name);

        if destination.exists() {
            tracing::warn!("The HTML file {} already exists in the archive directory", destination.display());
            return Ok(ArchiveOutcome::AlreadyArchived(destination));
        }

        if fs::rename(&source, &destination).is_err() {
            // rename fails across filesystems
            fs::copy(&source, &destination)
                .map_err(StorageError::IoError)?;
            fs::remove_file(&source)
                .map_err(StorageError::IoError)?;
        }

        tracing::info!("Archived {} to {}", source.display(), destination.display());
        Ok(ArchiveOutcome::Moved(destination))
    }

    /// Saves a dataset as `<base>/csv/<org_code>/<file_stem>/<dataset_id>.csv`.
    pub fn mirror_csv(&self, file_stem: &str, org_code: &str, dataset_id: &str, table: &Table) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir
            .join("csv")
            .join(org_code)
            .join(file_stem);

        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)
                .map_err(StorageError::IoError)?;
        }

        let file_path = target_dir.join(format!("{}.csv", dataset_id));
        let file = fs::File::create(&file_path)
            .map_err(StorageError::IoError)?;
        table.write_csv(file)?;

        tracing::debug!("Saved {} rows to {}", table.len(), file_path.display());

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archives_once_and_never_overwrites() {
        let data = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(archive.path()).unwrap();
        let name = "2023_04_ABC_Trust.html";

        fs::write(data.path().join(name), "first").unwrap();
        let outcome = storage.archive_html(data.path(), name, "ABC").unwrap();
        let archived = archive.path().join("html/ABC").join(name);
        assert_eq!(outcome, ArchiveOutcome::Moved(archived.clone()));
        assert!(!data.path().join(name).exists());

        fs::write(data.path().join(name), "second").unwrap();
        let outcome = storage.archive_html(data.path(), name, "ABC").unwrap();
        assert_eq!(outcome, ArchiveOutcome::AlreadyArchived(archived.clone()));
        assert_eq!(fs::read_to_string(&archived).unwrap(), "first");
        assert!(data.path().join(name).exists());
    }

    #[test]
    fn mirrors_tables_by_org_and_dataset() {
        let archive = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(archive.path()).unwrap();
        let mut table = Table::new(["A"]);
        table.push_row(vec!["1".into()]).unwrap();

        let path = storage.mirror_csv("2023_04_ABC_Trust", "ABC", "lung_tab", &table).unwrap();
        assert_eq!(path, archive.path().join("csv/ABC/2023_04_ABC_Trust/lung_tab.csv"));
        assert_eq!(fs::read_to_string(path).unwrap(), "A\n1\n");
    }
}
