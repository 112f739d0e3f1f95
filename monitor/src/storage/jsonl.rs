use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use trafficcore::record::AnalysisRecord;
use trafficcore::sink::{RecordStore, SinkError};

/// Append-only JSON-lines document store.
///
/// Ids are `<camera_id>-<n>` where `n` is the line the document was written to.
pub struct JsonlStore {
    path: PathBuf,
    file: File,
    written: u64,
}

impl JsonlStore {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let written = match File::open(&path) {
            Ok(existing) => BufReader::new(existing).lines().count() as u64,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn documents(&self) -> u64 {
        self.written
    }
}

impl RecordStore for JsonlStore {
    fn store(&mut self, record: &AnalysisRecord) -> Result<String, SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.written += 1;
        Ok(format!("{}-{}", record.camera_id(), self.written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trafficcore::detection::VehicleTally;
    use trafficcore::record::{DensityClass, TrafficSnapshot, Trend};

    fn record() -> AnalysisRecord {
        let snapshot = TrafficSnapshot::new(
            Utc::now(),
            0,
            0.0,
            DensityClass::Low,
            0.0,
            Trend::Stable,
        );
        AnalysisRecord::assemble(snapshot, VehicleTally::new(), "cam_9", "Harbour Rd").unwrap()
    }

    #[test]
    fn store_appends_documents_and_numbers_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/records.jsonl");

        let mut store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.store(&record()).unwrap(), "cam_9-1");
        assert_eq!(store.store(&record()).unwrap(), "cam_9-2");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let doc: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(doc["location"], "Harbour Rd");
    }

    #[test]
    fn reopening_continues_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        JsonlStore::open(&path).unwrap().store(&record()).unwrap();

        let mut store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.documents(), 1);
        assert_eq!(store.store(&record()).unwrap(), "cam_9-2");
    }
}
