use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ProjectRecord, ScheduleStore};
use crate::error::ScheduleError;
use crate::ScheduleResult;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    projects: BTreeMap<String, ProjectRecord>,
}

/// Store backed by a single JSON document on disk.
///
/// Every write rewrites the whole document through a temporary file and a
/// rename, so a failed write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> ScheduleResult<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let file = File::open(&self.path).map_err(|e| {
            ScheduleError::Storage(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ScheduleError::Storage(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write_document(&self, document: &StoreDocument) -> ScheduleResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ScheduleError::Storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let written = write_temp(&temp_path, document).and_then(|()| {
            fs::rename(&temp_path, &self.path).map_err(|e| {
                ScheduleError::Storage(format!(
                    "Failed to move {} into place: {}",
                    temp_path.display(),
                    e
                ))
            })
        });
        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written?;

        debug!(path = %self.path.display(), projects = document.projects.len(), "store written");
        Ok(())
    }
}

fn write_temp(temp_path: &Path, document: &StoreDocument) -> ScheduleResult<()> {
    let file = File::create(temp_path).map_err(|e| {
        ScheduleError::Storage(format!("Failed to create {}: {}", temp_path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer
        .flush()
        .map_err(|e| ScheduleError::Storage(format!("Failed to flush: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ScheduleError::Storage(format!("Failed to sync: {}", e)))
}

impl ScheduleStore for JsonFileStore {
    fn load_project(&self, name: &str) -> ScheduleResult<Option<ProjectRecord>> {
        Ok(self.read_document()?.projects.remove(name))
    }

    fn put_project(&mut self, record: ProjectRecord) -> ScheduleResult<()> {
        let mut document = self.read_document()?;
        document.projects.insert(record.name.clone(), record);
        self.write_document(&document)
    }

    fn project_names(&self) -> ScheduleResult<Vec<String>> {
        Ok(self.read_document()?.projects.into_keys().collect())
    }
}
